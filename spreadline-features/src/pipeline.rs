//! A full refresh: normalise the game log, sweep every partition, fan the states back in through
//! the population baselines and assemble the output tables.
//!
//! Partitions are independent and are processed in parallel. Every merge is keyed by a `BTreeMap`
//! or an order-preserving collect, so the output is identical from run to run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use tracing::{debug, info, warn};

use spreadline::timed::Timed;

use crate::config::EngineConfig;
use crate::domain::{
    Epoch, Event, Fixture, GameRecord, OccurrenceId, OccurrenceKey, ParticipantId, PartitionKey, Quantity, Side,
    Status,
};
use crate::error::PipelineError;
use crate::matchup::{MatchupProfile, Pairing, SideSummary};
use crate::normalise::{normalise_all, Skipped};
use crate::partition::{partition, Partition};
use crate::profile::DistributionProfile;
use crate::shrinkage::{Baseline, PopulationIndex, ShrunkStat};
use crate::state::{PregameState, StateIndex};

/// Features of one participant entering one occurrence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub participant: ParticipantId,
    pub opponent: ParticipantId,
    pub epoch: Epoch,
    pub occurrence: OccurrenceId,
    pub timestamp: DateTime<Utc>,
    pub status: Status,
    pub side: Side,
    pub neutral: bool,
    pub spread: f64,
    pub total: Option<f64>,
    /// Realized margins; absent for scheduled fixtures.
    pub margin: Option<f64>,
    pub total_margin: Option<f64>,
    pub state: PregameState,
    /// Indexed by [`Quantity`] ordinal.
    pub shrunk: Vec<ShrunkStat>,
}
impl FeatureRow {
    pub fn partition(&self) -> PartitionKey {
        PartitionKey::new(self.participant, self.epoch)
    }

    pub fn key(&self) -> OccurrenceKey {
        OccurrenceKey::new(self.timestamp, self.occurrence)
    }

    pub fn covered(&self) -> Option<bool> {
        self.margin.map(|margin| margin > 0.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub features: Vec<FeatureRow>,
    pub profiles: Vec<DistributionProfile>,
    pub shrinkage: Vec<ShrunkStat>,
    pub matchups: Vec<MatchupProfile>,
    pub skipped: Vec<Skipped>,
}

struct Context<'a> {
    config: &'a EngineConfig,
    indices: BTreeMap<PartitionKey, StateIndex>,
    populations: BTreeMap<Epoch, PopulationIndex>,
}
impl Context<'_> {
    fn state(&self, partition: PartitionKey, key: &OccurrenceKey) -> PregameState {
        self.indices
            .get(&partition)
            .map(|index| index.as_of(key).clone())
            .unwrap_or_else(|| PregameState::empty(self.config))
    }

    fn baselines(&self, epoch: Epoch, key: Option<&OccurrenceKey>) -> Vec<Baseline> {
        match self.populations.get(&epoch) {
            None => vec![Baseline::default(); Quantity::COUNT],
            Some(index) => match key {
                None => index.latest().to_vec(),
                Some(key) => index.as_of(key).to_vec(),
            },
        }
    }

    fn shrunk(&self, partition: PartitionKey, state: &PregameState, baselines: &[Baseline]) -> Vec<ShrunkStat> {
        Quantity::iter()
            .map(|quantity| {
                ShrunkStat::compute(
                    partition,
                    quantity,
                    &state.quantity(quantity).season,
                    baselines[usize::from(quantity)],
                    &self.config.shrinkage,
                )
            })
            .collect()
    }

    fn completed_rows(&self, partition: &Partition) -> Vec<FeatureRow> {
        let Some(index) = self.indices.get(&partition.key()) else {
            return vec![];
        };
        partition
            .events()
            .iter()
            .enumerate()
            .map(|(position, event)| {
                let state = index.before(position).clone();
                let baselines = self.baselines(event.epoch, Some(&event.key));
                let shrunk = self.shrunk(partition.key(), &state, &baselines);
                FeatureRow {
                    participant: event.participant,
                    opponent: event.opponent,
                    epoch: event.epoch,
                    occurrence: event.key.occurrence,
                    timestamp: event.key.timestamp,
                    status: Status::Completed,
                    side: event.side,
                    neutral: event.neutral,
                    spread: event.spread,
                    total: event.total,
                    margin: Some(event.margin),
                    total_margin: event.total_margin,
                    state,
                    shrunk,
                }
            })
            .collect()
    }

    fn fixture_rows(&self, fixture: &Fixture) -> [FeatureRow; 2] {
        let baselines = self.baselines(fixture.epoch, Some(&fixture.key));
        [Side::Home, Side::Away].map(|side| {
            let participant = fixture.participant(side);
            let partition = PartitionKey::new(participant, fixture.epoch);
            let state = self.state(partition, &fixture.key);
            let shrunk = self.shrunk(partition, &state, &baselines);
            FeatureRow {
                participant,
                opponent: fixture.participant(opposite(side)),
                epoch: fixture.epoch,
                occurrence: fixture.key.occurrence,
                timestamp: fixture.key.timestamp,
                status: Status::Scheduled,
                side,
                neutral: fixture.neutral,
                spread: fixture.spread(side),
                total: fixture.total,
                margin: None,
                total_margin: None,
                state,
                shrunk,
            }
        })
    }

    fn matchup(&self, pairing: &Pairing) -> MatchupProfile {
        let baselines = self.baselines(pairing.epoch, Some(&pairing.key));
        let [home, away] = [Side::Home, Side::Away].map(|side| {
            let participant = pairing.participant(side);
            let partition = PartitionKey::new(participant, pairing.epoch);
            let state = self.state(partition, &pairing.key);
            let shrunk = self.shrunk(partition, &state, &baselines);
            SideSummary::new(participant, &state, &shrunk[usize::from(Quantity::Spread)], self.config)
        });
        MatchupProfile::combine(pairing, home, away, self.config)
    }
}

fn opposite(side: Side) -> Side {
    match side {
        Side::Home => Side::Away,
        Side::Away => Side::Home,
    }
}

/// Drops fixtures of occurrences that have already completed, and repeated fixtures.
fn dedupe_fixtures(fixtures: Vec<Fixture>, completed: &[[Event; 2]]) -> Vec<Fixture> {
    let mut seen: FxHashSet<OccurrenceId> = completed.iter().map(|[home, _]| home.key.occurrence).collect();
    fixtures
        .into_iter()
        .filter(|fixture| {
            let fresh = seen.insert(fixture.key.occurrence);
            if !fresh {
                debug!("dropping superseded fixture {}", fixture.key);
            }
            fresh
        })
        .collect()
}

/// Runs a refresh over `records`, ignoring any record timestamped after `until`.
pub fn refresh(
    records: &[GameRecord],
    until: Option<DateTime<Utc>>,
    config: &EngineConfig,
) -> Result<Output, PipelineError> {
    config.validate()?;

    let records: Vec<_> = match until {
        None => records.to_vec(),
        Some(until) => records
            .iter()
            .filter(|record| record.timestamp <= until)
            .cloned()
            .collect(),
    };

    let Timed {
        value: normalisation,
        elapsed,
    } = Timed::value(|| normalise_all(&records));
    debug!(
        "normalised {} records into {} completed and {} scheduled occurrences in {elapsed:?}",
        records.len(),
        normalisation.completed.len(),
        normalisation.fixtures.len()
    );
    if !normalisation.skipped.is_empty() {
        warn!("skipped {} malformed records", normalisation.skipped.len());
    }

    let Timed {
        value: partitions,
        elapsed,
    } = Timed::result(|| partition(normalisation.events().copied()))?;
    debug!("formed {} partitions in {elapsed:?}", partitions.len());

    let Timed {
        value: indices,
        elapsed,
    } = Timed::value(|| {
        partitions
            .par_iter()
            .map(|(key, partition)| (*key, StateIndex::build(partition, config)))
            .collect::<BTreeMap<_, _>>()
    });
    debug!("swept {} partitions in {elapsed:?}", indices.len());

    let Timed {
        value: populations,
        elapsed,
    } = Timed::value(|| {
        let mut by_epoch: BTreeMap<Epoch, Vec<&Event>> = BTreeMap::new();
        for partition in partitions.values() {
            by_epoch
                .entry(partition.key().epoch)
                .or_default()
                .extend(partition.events());
        }
        by_epoch
            .into_par_iter()
            .map(|(epoch, mut events)| {
                events.sort_by_key(|event| (event.key, event.participant));
                (epoch, PopulationIndex::build(epoch, events, &config.shrinkage))
            })
            .collect::<BTreeMap<_, _>>()
    });
    debug!("computed population baselines for {} epochs in {elapsed:?}", populations.len());

    let context = Context {
        config,
        indices,
        populations,
    };
    let fixtures = dedupe_fixtures(normalisation.fixtures, &normalisation.completed);

    let Timed {
        value: features,
        elapsed,
    } = Timed::value(|| {
        let mut features: Vec<FeatureRow> = partitions
            .par_iter()
            .flat_map_iter(|(_, partition)| context.completed_rows(partition))
            .collect();
        features.extend(fixtures.iter().flat_map(|fixture| context.fixture_rows(fixture)));
        features.sort_by_key(|row| (row.partition(), row.key()));
        features
    });
    debug!("assembled {} feature rows in {elapsed:?}", features.len());

    let profiles: Vec<_> = partitions
        .par_iter()
        .flat_map_iter(|(key, partition)| {
            Quantity::iter().map(|quantity| {
                let sequence = partition
                    .events()
                    .iter()
                    .filter_map(|event| event.value(quantity))
                    .collect();
                DistributionProfile::compute(*key, quantity, sequence, config)
            })
        })
        .collect();

    let shrinkage: Vec<_> = context
        .indices
        .iter()
        .flat_map(|(key, index)| {
            let baselines = context.baselines(key.epoch, None);
            context.shrunk(*key, index.latest(), &baselines)
        })
        .collect();

    let Timed {
        value: matchups,
        elapsed,
    } = Timed::value(|| {
        let mut pairings: Vec<_> = normalisation.completed.iter().map(Pairing::completed).collect();
        pairings.extend(fixtures.iter().map(Pairing::scheduled));
        pairings.sort_by_key(|pairing| (pairing.key, pairing.home));
        pairings
            .par_iter()
            .map(|pairing| context.matchup(pairing))
            .collect::<Vec<_>>()
    });
    debug!("combined {} matchups in {elapsed:?}", matchups.len());

    info!(
        "refreshed {} partitions: {} feature rows, {} profiles, {} matchups, {} skipped",
        partitions.len(),
        features.len(),
        profiles.len(),
        matchups.len(),
        normalisation.skipped.len()
    );
    Ok(Output {
        features,
        profiles,
        shrinkage,
        matchups,
        skipped: normalisation.skipped,
    })
}
