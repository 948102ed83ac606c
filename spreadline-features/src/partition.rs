//! Grouping of events into (participant, epoch) partitions, and enforcement of the temporal
//! ordering within and across them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashSet;

use crate::domain::{Event, OccurrenceKey, ParticipantId, PartitionKey};
use crate::error::OrderingViolation;

/// The events of one participant within one epoch, strictly ascending by occurrence key.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    key: PartitionKey,
    events: Vec<Event>,
}
impl Partition {
    /// Admits `events` in the order given, rejecting foreign, duplicate or out-of-order events.
    pub fn new(key: PartitionKey, events: Vec<Event>) -> Result<Self, OrderingViolation> {
        let mut seen = FxHashSet::with_capacity_and_hasher(events.len(), Default::default());
        let mut previous: Option<OccurrenceKey> = None;
        for event in &events {
            if event.partition() != key {
                return Err(OrderingViolation::ForeignEvent {
                    partition: key,
                    actual: event.partition(),
                    occurrence: event.key.occurrence,
                });
            }
            if !seen.insert(event.key.occurrence) {
                return Err(OrderingViolation::DuplicateOccurrence {
                    partition: key,
                    occurrence: event.key.occurrence,
                });
            }
            if let Some(previous) = previous {
                if event.key <= previous {
                    return Err(OrderingViolation::OutOfOrder {
                        partition: key,
                        previous,
                        current: event.key,
                    });
                }
            }
            previous = Some(event.key);
        }
        Ok(Self { key, events })
    }

    pub fn key(&self) -> PartitionKey {
        self.key
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events strictly before `key`.
    pub fn preceding(&self, key: &OccurrenceKey) -> usize {
        self.events.partition_point(|event| event.key < *key)
    }

    fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.events.first()?.key.timestamp, self.events.last()?.key.timestamp))
    }
}

/// Groups `events` into partitions, each sorted by occurrence key, and checks that no
/// participant's epochs overlap in time.
pub fn partition(
    events: impl IntoIterator<Item = Event>,
) -> Result<BTreeMap<PartitionKey, Partition>, OrderingViolation> {
    let mut grouped: BTreeMap<PartitionKey, Vec<Event>> = BTreeMap::new();
    for event in events {
        grouped.entry(event.partition()).or_default().push(event);
    }

    let mut partitions = BTreeMap::new();
    for (key, mut events) in grouped {
        events.sort_by_key(|event| event.key);
        partitions.insert(key, Partition::new(key, events)?);
    }
    check_epoch_spans(&partitions)?;
    Ok(partitions)
}

fn check_epoch_spans(partitions: &BTreeMap<PartitionKey, Partition>) -> Result<(), OrderingViolation> {
    // keys are ordered by participant, then epoch
    let mut previous: Option<(PartitionKey, DateTime<Utc>)> = None;
    for (key, partition) in partitions {
        let Some((start, end)) = partition.span() else {
            continue;
        };
        if let Some((previous_key, previous_end)) = previous {
            if previous_key.participant == key.participant && start <= previous_end {
                return Err(OrderingViolation::OverlappingEpochs {
                    participant: key.participant,
                    earlier: previous_key.epoch,
                    earlier_end: previous_end,
                    later: key.epoch,
                    later_start: start,
                });
            }
        }
        previous = Some((*key, end));
    }
    Ok(())
}

/// Participants appearing in the partitions, in ascending order.
pub fn participants(partitions: &BTreeMap<PartitionKey, Partition>) -> Vec<ParticipantId> {
    let mut participants: Vec<_> = partitions.keys().map(|key| key.participant).collect();
    participants.dedup();
    participants
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::domain::{Epoch, OccurrenceId, Side};

    fn event(participant: ParticipantId, epoch: Epoch, day: i64, occurrence: OccurrenceId) -> Event {
        let timestamp = Utc.with_ymd_and_hms(epoch as i32, 9, 1, 18, 0, 0).unwrap() + Duration::days(day);
        Event {
            participant,
            opponent: participant + 100,
            key: OccurrenceKey::new(timestamp, occurrence),
            epoch,
            side: Side::Home,
            neutral: false,
            spread: -3.0,
            points_for: 20,
            points_against: 17,
            margin: 0.0,
            total: None,
            total_margin: None,
        }
    }

    #[test]
    fn groups_and_sorts() {
        let partitions = partition(vec![
            event(2, 2023, 14, 3),
            event(1, 2023, 7, 2),
            event(1, 2023, 0, 1),
            event(1, 2022, 0, 9),
        ])
        .unwrap();
        assert_eq!(
            vec![
                PartitionKey::new(1, 2022),
                PartitionKey::new(1, 2023),
                PartitionKey::new(2, 2023)
            ],
            partitions.keys().copied().collect::<Vec<_>>()
        );
        let partition = &partitions[&PartitionKey::new(1, 2023)];
        assert_eq!(
            vec![1, 2],
            partition.events().iter().map(|event| event.key.occurrence).collect::<Vec<_>>()
        );
        assert_eq!(vec![1, 2], participants(&partitions));
    }

    #[test]
    fn same_timestamp_breaks_ties_by_occurrence() {
        let partitions = partition(vec![event(1, 2023, 0, 8), event(1, 2023, 0, 5)]).unwrap();
        let partition = &partitions[&PartitionKey::new(1, 2023)];
        assert_eq!(5, partition.events()[0].key.occurrence);
        assert_eq!(8, partition.events()[1].key.occurrence);
    }

    #[test]
    fn rejects_duplicates() {
        let err = partition(vec![event(1, 2023, 0, 5), event(1, 2023, 7, 5)]).unwrap_err();
        assert_eq!(
            OrderingViolation::DuplicateOccurrence {
                partition: PartitionKey::new(1, 2023),
                occurrence: 5
            },
            err
        );
    }

    #[test]
    fn rejects_foreign_event() {
        let err = Partition::new(PartitionKey::new(1, 2023), vec![event(2, 2023, 0, 5)]).unwrap_err();
        assert!(matches!(err, OrderingViolation::ForeignEvent { occurrence: 5, .. }));
    }

    #[test]
    fn rejects_out_of_order() {
        let err = Partition::new(
            PartitionKey::new(1, 2023),
            vec![event(1, 2023, 7, 2), event(1, 2023, 0, 1)],
        )
        .unwrap_err();
        assert!(matches!(err, OrderingViolation::OutOfOrder { .. }));
    }

    #[test]
    fn rejects_overlapping_epochs() {
        let mut late = event(1, 2022, 0, 9);
        late.key.timestamp = Utc.with_ymd_and_hms(2023, 9, 3, 18, 0, 0).unwrap();
        let err = partition(vec![late, event(1, 2023, 0, 1)]).unwrap_err();
        assert!(matches!(
            err,
            OrderingViolation::OverlappingEpochs {
                participant: 1,
                earlier: 2022,
                later: 2023,
                ..
            }
        ));
    }

    #[test]
    fn preceding_excludes_the_key_itself() {
        let partitions = partition(vec![event(1, 2023, 0, 1), event(1, 2023, 7, 2)]).unwrap();
        let partition = &partitions[&PartitionKey::new(1, 2023)];
        let second = partition.events()[1].key;
        assert_eq!(1, partition.preceding(&second));
        assert_eq!(0, partition.preceding(&partition.events()[0].key));
        let later = OccurrenceKey::new(second.timestamp + Duration::days(1), 0);
        assert_eq!(2, partition.preceding(&later));
    }
}
