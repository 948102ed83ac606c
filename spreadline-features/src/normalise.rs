//! Conversion of game-centric records into participant-centric events.

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::warn;

use crate::domain::{Event, Fixture, GameRecord, OccurrenceId, OccurrenceKey, Side, Status};

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum SkipReason {
    #[strum(serialize = "missing participant")]
    MissingParticipant,
    #[strum(serialize = "identical participants")]
    IdenticalParticipants,
    #[strum(serialize = "missing score")]
    MissingScore,
    #[strum(serialize = "missing spread")]
    MissingSpread,
    #[strum(serialize = "invalid line")]
    InvalidLine,
}

/// A record that could not be normalised.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skipped {
    pub occurrence: OccurrenceId,
    pub reason: SkipReason,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Normalised {
    /// Both sides of a completed occurrence, home first.
    Completed([Event; 2]),
    Scheduled(Fixture),
}

pub fn normalise(record: &GameRecord) -> Result<Normalised, Skipped> {
    let skip = |reason| Skipped {
        occurrence: record.occurrence,
        reason,
    };
    let (Some(home), Some(away)) = (record.home, record.away) else {
        return Err(skip(SkipReason::MissingParticipant));
    };
    if home == away {
        return Err(skip(SkipReason::IdenticalParticipants));
    }
    let spread = record.spread.ok_or(skip(SkipReason::MissingSpread))?;
    // a non-finite line would poison every running sum it passes through
    if !spread.is_finite() || record.total.is_some_and(|total| !total.is_finite()) {
        return Err(skip(SkipReason::InvalidLine));
    }
    let key = OccurrenceKey::new(record.timestamp, record.occurrence);

    match record.status {
        Status::Scheduled => Ok(Normalised::Scheduled(Fixture {
            key,
            epoch: record.epoch,
            home,
            away,
            neutral: record.neutral,
            spread,
            total: record.total,
        })),
        Status::Completed => {
            let (Some(home_points), Some(away_points)) = (record.home_points, record.away_points) else {
                return Err(skip(SkipReason::MissingScore));
            };
            let total_margin = record
                .total
                .map(|total| (home_points as f64 + away_points as f64) - total);
            let event = |side, participant, opponent, spread: f64, points_for: u16, points_against: u16| Event {
                participant,
                opponent,
                key,
                epoch: record.epoch,
                side,
                neutral: record.neutral,
                spread,
                points_for,
                points_against,
                margin: (points_for as f64 - points_against as f64) + spread,
                total: record.total,
                total_margin,
            };
            Ok(Normalised::Completed([
                event(Side::Home, home, away, spread, home_points, away_points),
                event(Side::Away, away, home, -spread, away_points, home_points),
            ]))
        }
    }
}

/// The normalised game log.
#[derive(Debug, Default)]
pub struct Normalisation {
    pub completed: Vec<[Event; 2]>,
    pub fixtures: Vec<Fixture>,
    pub skipped: Vec<Skipped>,
}
impl Normalisation {
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.completed.iter().flatten()
    }
}

pub fn normalise_all(records: &[GameRecord]) -> Normalisation {
    let mut normalisation = Normalisation::default();
    for record in records {
        match normalise(record) {
            Ok(Normalised::Completed(events)) => normalisation.completed.push(events),
            Ok(Normalised::Scheduled(fixture)) => normalisation.fixtures.push(fixture),
            Err(skipped) => {
                warn!("skipping occurrence {}: {}", skipped.occurrence, skipped.reason);
                normalisation.skipped.push(skipped);
            }
        }
    }
    normalisation
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn record(status: Status) -> GameRecord {
        GameRecord {
            occurrence: 401,
            timestamp: Utc.with_ymd_and_hms(2023, 9, 2, 19, 30, 0).unwrap(),
            epoch: 2023,
            status,
            home: Some(10),
            away: Some(20),
            neutral: false,
            home_points: Some(27),
            away_points: Some(24),
            spread: Some(-7.0),
            total: Some(48.5),
        }
    }

    #[test]
    fn completed_yields_both_perspectives() {
        let Normalised::Completed([home, away]) = normalise(&record(Status::Completed)).unwrap() else {
            panic!("expected a completed occurrence");
        };
        assert_eq!(10, home.participant);
        assert_eq!(20, home.opponent);
        assert_eq!(Side::Home, home.side);
        assert_eq!(-7.0, home.spread);
        assert_eq!(3, home.outcome());
        assert_eq!(-4.0, home.margin);
        assert!(!home.covered());

        assert_eq!(20, away.participant);
        assert_eq!(Side::Away, away.side);
        assert_eq!(7.0, away.spread);
        assert_eq!(-3, away.outcome());
        assert_eq!(4.0, away.margin);
        assert!(away.covered());

        assert_eq!(Some(2.5), home.total_margin);
        assert_eq!(home.total_margin, away.total_margin);
        assert_eq!(home.key, away.key);
    }

    #[test]
    fn margins_are_mirrored() {
        let Normalised::Completed([home, away]) = normalise(&record(Status::Completed)).unwrap() else {
            panic!("expected a completed occurrence");
        };
        assert_eq!(0.0, home.margin + away.margin);
    }

    #[test]
    fn missing_total_leaves_total_margin_undefined() {
        let mut record = record(Status::Completed);
        record.total = None;
        let Normalised::Completed([home, away]) = normalise(&record).unwrap() else {
            panic!("expected a completed occurrence");
        };
        assert_eq!(None, home.total_margin);
        assert_eq!(None, away.total_margin);
    }

    #[test]
    fn scheduled_yields_fixture() {
        let mut record = record(Status::Scheduled);
        record.home_points = None;
        record.away_points = None;
        let Normalised::Scheduled(fixture) = normalise(&record).unwrap() else {
            panic!("expected a fixture");
        };
        assert_eq!(10, fixture.home);
        assert_eq!(20, fixture.away);
        assert_eq!(-7.0, fixture.spread);
        assert_eq!(Some(48.5), fixture.total);
    }

    #[test]
    fn malformed_records_are_skipped() {
        let mut missing_score = record(Status::Completed);
        missing_score.away_points = None;
        let mut missing_spread = record(Status::Scheduled);
        missing_spread.spread = None;
        let mut missing_participant = record(Status::Completed);
        missing_participant.home = None;
        let mut identical = record(Status::Completed);
        identical.away = Some(10);

        let normalisation = normalise_all(&[
            missing_score,
            record(Status::Completed),
            missing_spread,
            missing_participant,
            identical,
        ]);
        assert_eq!(1, normalisation.completed.len());
        assert_eq!(2, normalisation.events().count());
        assert!(normalisation.fixtures.is_empty());
        assert_eq!(
            vec![
                SkipReason::MissingScore,
                SkipReason::MissingSpread,
                SkipReason::MissingParticipant,
                SkipReason::IdenticalParticipants
            ],
            normalisation
                .skipped
                .iter()
                .map(|skipped| skipped.reason)
                .collect::<Vec<_>>()
        );
        assert_eq!("missing spread", SkipReason::MissingSpread.to_string());
    }

    #[test]
    fn non_finite_lines_are_skipped() {
        for spread in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut record = record(Status::Completed);
            record.spread = Some(spread);
            assert_eq!(
                Err(Skipped {
                    occurrence: 401,
                    reason: SkipReason::InvalidLine
                }),
                normalise(&record)
            );
        }
        let mut bad_total = record(Status::Scheduled);
        bad_total.total = Some(f64::NAN);
        assert_eq!(
            SkipReason::InvalidLine,
            normalise(&bad_total).unwrap_err().reason
        );
        assert_eq!("invalid line", SkipReason::InvalidLine.to_string());
    }
}
