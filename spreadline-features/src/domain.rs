use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use ordinalizer::Ordinal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumCount, EnumIter, EnumString};

pub type ParticipantId = u32;
pub type OccurrenceId = u64;
pub type Epoch = u16;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Status {
    Completed,
    Scheduled,
}

/// One row of the game log, as published by the upstream feed. The spread is quoted from the
/// home side's perspective using the bookmaker convention: negative when the home side is
/// favoured.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub occurrence: OccurrenceId,
    pub timestamp: DateTime<Utc>,
    pub epoch: Epoch,
    pub status: Status,
    pub home: Option<ParticipantId>,
    pub away: Option<ParticipantId>,
    #[serde(default)]
    pub neutral: bool,
    pub home_points: Option<u16>,
    pub away_points: Option<u16>,
    pub spread: Option<f64>,
    pub total: Option<f64>,
}

/// Total order of occurrences in time. Ties on the timestamp are broken by the occurrence id.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OccurrenceKey {
    pub timestamp: DateTime<Utc>,
    pub occurrence: OccurrenceId,
}
impl OccurrenceKey {
    pub fn new(timestamp: DateTime<Utc>, occurrence: OccurrenceId) -> Self {
        Self {
            timestamp,
            occurrence,
        }
    }
}

impl Display for OccurrenceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.occurrence, self.timestamp.to_rfc3339())
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
pub enum Side {
    Home,
    Away,
}

/// The unit of every causal computation: one participant within one epoch.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionKey {
    pub participant: ParticipantId,
    pub epoch: Epoch,
}
impl PartitionKey {
    pub fn new(participant: ParticipantId, epoch: Epoch) -> Self {
        Self { participant, epoch }
    }
}

impl Display for PartitionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.participant, self.epoch)
    }
}

/// A completed occurrence seen from one participant's perspective.
///
/// `spread` is the line this participant faced and `margin` the realized point differential
/// measured against it: `(points_for − points_against) + spread`. A positive margin beat the line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub participant: ParticipantId,
    pub opponent: ParticipantId,
    pub key: OccurrenceKey,
    pub epoch: Epoch,
    pub side: Side,
    pub neutral: bool,
    pub spread: f64,
    pub points_for: u16,
    pub points_against: u16,
    pub margin: f64,
    pub total: Option<f64>,
    pub total_margin: Option<f64>,
}
impl Event {
    pub fn partition(&self) -> PartitionKey {
        PartitionKey::new(self.participant, self.epoch)
    }

    pub fn outcome(&self) -> i32 {
        self.points_for as i32 - self.points_against as i32
    }

    pub fn is_home(&self) -> bool {
        self.side == Side::Home
    }

    pub fn covered(&self) -> bool {
        self.margin > 0.0
    }

    pub fn value(&self, quantity: Quantity) -> Option<f64> {
        match quantity {
            Quantity::Spread => Some(self.margin),
            Quantity::Total => self.total_margin,
        }
    }
}

/// A scheduled occurrence with a known line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub key: OccurrenceKey,
    pub epoch: Epoch,
    pub home: ParticipantId,
    pub away: ParticipantId,
    pub neutral: bool,
    pub spread: f64,
    pub total: Option<f64>,
}
impl Fixture {
    pub fn participant(&self, side: Side) -> ParticipantId {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }

    /// The spread faced by the given side.
    pub fn spread(&self, side: Side) -> f64 {
        match side {
            Side::Home => self.spread,
            Side::Away => -self.spread,
        }
    }
}

/// The quantities whose margins are profiled.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Ordinal, EnumCount, EnumIter, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Quantity {
    /// Margin against the spread.
    Spread,
    /// Combined points against the total.
    Total,
}
impl Quantity {
    /// Describes the event of a margin landing strictly above the line.
    pub fn above_label(&self) -> &'static str {
        match self {
            Quantity::Spread => "cover",
            Quantity::Total => "over",
        }
    }
}

impl From<Quantity> for usize {
    fn from(quantity: Quantity) -> Self {
        quantity.ordinal()
    }
}
