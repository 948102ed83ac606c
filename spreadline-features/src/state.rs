//! The latest known state of a participant as of any point in time.
//!
//! A partition is swept once, in occurrence order, producing the state before each of its events
//! plus a trailing state after its last. Any later reader (the event's own feature row, a
//! scheduled fixture, a matchup) finds its state by binary search on the occurrence key.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use spreadline::shrink::ErrorAggregate;

use crate::config::EngineConfig;
use crate::domain::{OccurrenceKey, PartitionKey, Quantity};
use crate::partition::Partition;
use crate::profile::{ProfileBuilder, ProfileSummary};
use crate::trend::{Streak, Trend};
use crate::window::{WindowStat, WindowTracker};

/// Pre-event state for one quantity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantityState {
    pub quantity: Quantity,
    /// One entry per configured window size, in configuration order.
    pub windows: Vec<WindowStat>,
    pub season: ErrorAggregate,
    pub profile: ProfileSummary,
}
impl QuantityState {
    pub fn window(&self, size: usize) -> Option<&WindowStat> {
        self.windows.iter().find(|stat| stat.window == size)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PregameState {
    /// Completed events before this point in the partition.
    pub games: usize,
    pub last: Option<OccurrenceKey>,
    pub trend: Trend,
    /// Indexed by [`Quantity`] ordinal.
    pub quantities: Vec<QuantityState>,
}
impl PregameState {
    /// The state of a participant with no history in the epoch.
    pub fn empty(config: &EngineConfig) -> Self {
        Tracker::new(config).read(0, None, config)
    }

    pub fn quantity(&self, quantity: Quantity) -> &QuantityState {
        &self.quantities[usize::from(quantity)]
    }
}

struct QuantityTracker {
    quantity: Quantity,
    windows: WindowTracker,
    season: ErrorAggregate,
    profile: ProfileBuilder,
}

struct Tracker {
    quantities: Vec<QuantityTracker>,
    streak: Streak,
}
impl Tracker {
    fn new(config: &EngineConfig) -> Self {
        let quantities = Quantity::iter()
            .map(|quantity| QuantityTracker {
                quantity,
                windows: WindowTracker::new(
                    &config.windows,
                    config.thresholds(quantity),
                    config.min_samples,
                ),
                season: ErrorAggregate::default(),
                profile: ProfileBuilder::new(config.scoring.within_threshold),
            })
            .collect();
        Self {
            quantities,
            streak: Streak::default(),
        }
    }

    fn read(&self, games: usize, last: Option<OccurrenceKey>, config: &EngineConfig) -> PregameState {
        let quantities: Vec<_> = self
            .quantities
            .iter()
            .map(|tracker| QuantityState {
                quantity: tracker.quantity,
                windows: tracker.windows.read(),
                season: tracker.season,
                profile: tracker.profile.summary(config),
            })
            .collect();
        let trend = Trend::assess(
            self.streak,
            &quantities[usize::from(Quantity::Spread)].windows,
            &config.trend,
        );
        PregameState {
            games,
            last,
            trend,
            quantities,
        }
    }

    fn push(&mut self, values: impl Fn(Quantity) -> Option<f64>, covered: bool) {
        for tracker in &mut self.quantities {
            let value = values(tracker.quantity);
            tracker.windows.push(value);
            if let Some(value) = value {
                tracker.season.push(value);
                tracker.profile.push(value);
            }
        }
        self.streak.push(covered);
    }
}

/// States of one partition: `states[i]` precedes the `i`-th event and the final entry follows
/// the last.
#[derive(Clone, Debug, PartialEq)]
pub struct StateIndex {
    key: PartitionKey,
    keys: Vec<OccurrenceKey>,
    states: Vec<PregameState>,
}
impl StateIndex {
    pub fn build(partition: &Partition, config: &EngineConfig) -> Self {
        let mut tracker = Tracker::new(config);
        let mut states = Vec::with_capacity(partition.len() + 1);
        let mut last = None;
        for (games, event) in partition.events().iter().enumerate() {
            states.push(tracker.read(games, last, config));
            tracker.push(|quantity| event.value(quantity), event.covered());
            last = Some(event.key);
        }
        states.push(tracker.read(partition.len(), last, config));
        Self {
            key: partition.key(),
            keys: partition.events().iter().map(|event| event.key).collect(),
            states,
        }
    }

    pub fn key(&self) -> PartitionKey {
        self.key
    }

    /// State of the participant before the `i`-th event.
    pub fn before(&self, index: usize) -> &PregameState {
        &self.states[index]
    }

    /// The latest state formed from events strictly before `key`.
    pub fn as_of(&self, key: &OccurrenceKey) -> &PregameState {
        &self.states[self.keys.partition_point(|existing| existing < key)]
    }

    pub fn latest(&self) -> &PregameState {
        &self.states[self.keys.len()]
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use spreadline_testing::assert_some_f64_absolute;

    use super::*;
    use crate::domain::{Event, Side};
    use crate::trend::Form;

    fn event(day: i64, margin: f64, total_margin: Option<f64>) -> Event {
        let timestamp = Utc.with_ymd_and_hms(2023, 9, 1, 18, 0, 0).unwrap() + Duration::days(day);
        Event {
            participant: 4,
            opponent: 8,
            key: OccurrenceKey::new(timestamp, 1000 + day as u64),
            epoch: 2023,
            side: Side::Away,
            neutral: false,
            spread: 3.0,
            points_for: 0,
            points_against: 0,
            margin,
            total: total_margin.map(|_| 45.0),
            total_margin,
        }
    }

    fn index(events: Vec<Event>) -> StateIndex {
        let partition = Partition::new(PartitionKey::new(4, 2023), events).unwrap();
        StateIndex::build(&partition, &EngineConfig::default())
    }

    #[test]
    fn states_precede_events() {
        let events = vec![
            event(0, 5.0, Some(-3.0)),
            event(7, 3.0, None),
            event(14, 7.0, Some(10.0)),
            event(21, 4.0, Some(1.0)),
            event(28, 6.0, Some(2.0)),
        ];
        let index = index(events.clone());
        assert_eq!(PartitionKey::new(4, 2023), index.key());

        let first = index.before(0);
        assert_eq!(0, first.games);
        assert_eq!(None, first.last);
        assert_eq!(0, first.trend.streak);
        assert!(first.quantity(Quantity::Spread).windows.iter().all(|stat| !stat.is_defined()));

        let fifth = index.before(4);
        assert_eq!(4, fifth.games);
        assert_eq!(Some(events[3].key), fifth.last);
        assert_eq!(4, fifth.trend.streak);
        let spread = fifth.quantity(Quantity::Spread);
        assert_some_f64_absolute(4.75, spread.window(10).unwrap().mean, 1e-12);
        assert_eq!(4, spread.season.samples);
        assert_eq!(4, spread.profile.count);

        let total = fifth.quantity(Quantity::Total);
        assert_eq!(3, total.window(10).unwrap().samples);
        assert_eq!(3, total.season.samples);
        assert_eq!(3, total.profile.count);

        assert_eq!(5, index.latest().games);
        assert_eq!(5, index.latest().trend.streak);
    }

    #[test]
    fn as_of_binary_search() {
        let events = vec![event(0, 5.0, None), event(7, -3.0, None), event(14, 7.0, None)];
        let index = index(events.clone());
        assert_eq!(0, index.as_of(&events[0].key).games);
        assert_eq!(1, index.as_of(&events[1].key).games);
        let between = OccurrenceKey::new(events[1].key.timestamp + Duration::days(3), 1);
        assert_eq!(2, index.as_of(&between).games);
        let later = OccurrenceKey::new(events[2].key.timestamp + Duration::days(3), 1);
        assert_eq!(index.latest(), index.as_of(&later));
        let earlier = OccurrenceKey::new(events[0].key.timestamp - Duration::days(3), 1);
        assert_eq!(index.before(0), index.as_of(&earlier));
    }

    #[test]
    fn trend_in_state() {
        let margins = [-6.0, -3.0, -1.0, -8.0, -2.0, -4.0, -5.0, 2.0, 6.0, 3.0];
        let events = margins
            .iter()
            .enumerate()
            .map(|(day, &margin)| event(day as i64 * 7, margin, None))
            .collect();
        let index = index(events);
        let latest = index.latest();
        assert_eq!(3, latest.trend.streak);
        // three of three covers recently against three of ten overall
        assert_eq!(Some(Form::Hot), latest.trend.form);
    }

    #[test]
    fn empty_state() {
        let config = EngineConfig::default();
        let state = PregameState::empty(&config);
        assert_eq!(0, state.games);
        assert_eq!(2, state.quantities.len());
        assert_eq!(config.windows.len(), state.quantity(Quantity::Total).windows.len());
        assert_eq!(None, state.trend.form);
        assert_eq!(None, state.trend.stabilizing);
    }
}
