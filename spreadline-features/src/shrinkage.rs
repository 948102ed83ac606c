//! Stabilisation of season-to-date error statistics by credibility-weighted shrinkage toward the
//! population of established participants.
//!
//! The population baseline is evaluated as of an occurrence key, over events strictly before it,
//! so that rows computed for earlier occurrences never change as the epoch unfolds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};

use spreadline::shrink::{blend, population_mean, weight, ErrorAggregate};

use crate::config::ShrinkageConfig;
use crate::domain::{Epoch, Event, OccurrenceKey, ParticipantId, PartitionKey, Quantity};

/// Average error statistics over the participants that qualify for the population.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub participants: usize,
    pub mad: Option<f64>,
    pub rmse: Option<f64>,
}
impl Baseline {
    fn of<'a>(aggregates: impl Iterator<Item = &'a ErrorAggregate> + Clone, min_samples: usize) -> Self {
        let qualifying = aggregates.filter(|aggregate| aggregate.samples > 0 && aggregate.samples >= min_samples);
        Self {
            participants: qualifying.clone().count(),
            mad: population_mean(qualifying.clone().filter_map(ErrorAggregate::mad)),
            rmse: population_mean(qualifying.filter_map(ErrorAggregate::rmse)),
        }
    }
}

/// Population baselines of one epoch at every occurrence key, for each quantity.
#[derive(Clone, Debug, PartialEq)]
pub struct PopulationIndex {
    epoch: Epoch,
    initial: Vec<Baseline>,
    checkpoints: Vec<(OccurrenceKey, Vec<Baseline>)>,
}
impl PopulationIndex {
    /// Sweeps the events of one epoch, which must be sorted by occurrence key.
    pub fn build<'a>(
        epoch: Epoch,
        events: impl IntoIterator<Item = &'a Event>,
        config: &ShrinkageConfig,
    ) -> Self {
        let mut aggregates: BTreeMap<ParticipantId, Vec<ErrorAggregate>> = BTreeMap::new();
        let baselines = |aggregates: &BTreeMap<ParticipantId, Vec<ErrorAggregate>>| {
            Quantity::iter()
                .map(|quantity| {
                    Baseline::of(
                        aggregates.values().map(|per_quantity| &per_quantity[usize::from(quantity)]),
                        config.population_min_samples,
                    )
                })
                .collect::<Vec<_>>()
        };
        let initial = baselines(&aggregates);

        let mut checkpoints: Vec<(OccurrenceKey, Vec<Baseline>)> = vec![];
        let mut current: Option<OccurrenceKey> = None;
        for event in events {
            debug_assert_eq!(epoch, event.epoch);
            debug_assert!(current.map_or(true, |current| current <= event.key), "events must be sorted");
            if let Some(key) = current {
                if key != event.key {
                    checkpoints.push((key, baselines(&aggregates)));
                }
            }
            current = Some(event.key);
            let per_quantity = aggregates
                .entry(event.participant)
                .or_insert_with(|| vec![ErrorAggregate::default(); Quantity::COUNT]);
            for quantity in Quantity::iter() {
                if let Some(value) = event.value(quantity) {
                    per_quantity[usize::from(quantity)].push(value);
                }
            }
        }
        if let Some(key) = current {
            checkpoints.push((key, baselines(&aggregates)));
        }
        Self {
            epoch,
            initial,
            checkpoints,
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Baselines over the events strictly before `key`.
    pub fn as_of(&self, key: &OccurrenceKey) -> &[Baseline] {
        let index = self.checkpoints.partition_point(|(checkpoint, _)| checkpoint < key);
        match index {
            0 => &self.initial,
            _ => &self.checkpoints[index - 1].1,
        }
    }

    /// Baselines over the entire epoch.
    pub fn latest(&self) -> &[Baseline] {
        self.checkpoints
            .last()
            .map(|(_, baselines)| &baselines[..])
            .unwrap_or(&self.initial[..])
    }
}

/// A participant's raw and stabilised error statistics for one quantity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShrunkStat {
    pub participant: ParticipantId,
    pub epoch: Epoch,
    pub quantity: Quantity,
    pub samples: usize,
    pub raw_mad: Option<f64>,
    pub raw_rmse: Option<f64>,
    pub weight: f64,
    pub population: Baseline,
    pub mad: Option<f64>,
    pub rmse: Option<f64>,
}
impl ShrunkStat {
    pub fn compute(
        partition: PartitionKey,
        quantity: Quantity,
        aggregate: &ErrorAggregate,
        population: Baseline,
        config: &ShrinkageConfig,
    ) -> Self {
        let weight = weight(aggregate.samples, config.saturation);
        Self {
            participant: partition.participant,
            epoch: partition.epoch,
            quantity,
            samples: aggregate.samples,
            raw_mad: aggregate.mad(),
            raw_rmse: aggregate.rmse(),
            weight,
            population,
            mad: blend(aggregate.mad(), weight, population.mad),
            rmse: blend(aggregate.rmse(), weight, population.rmse),
        }
    }
}
