use std::error::Error;
use std::io;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Epoch, OccurrenceId, OccurrenceKey, ParticipantId, PartitionKey};

/// A breach of the temporal ordering that every causal computation relies on. Always fatal to
/// a refresh.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderingViolation {
    #[error("duplicate occurrence {occurrence} in partition {partition}")]
    DuplicateOccurrence {
        partition: PartitionKey,
        occurrence: OccurrenceId,
    },

    #[error("occurrence {occurrence} of partition {actual} handed to partition {partition}")]
    ForeignEvent {
        partition: PartitionKey,
        actual: PartitionKey,
        occurrence: OccurrenceId,
    },

    #[error("occurrence {current} follows {previous} out of order in partition {partition}")]
    OutOfOrder {
        partition: PartitionKey,
        previous: OccurrenceKey,
        current: OccurrenceKey,
    },

    #[error("participant {participant} starts epoch {later} at {later_start} before epoch {earlier} ends at {earlier_end}")]
    OverlappingEpochs {
        participant: ParticipantId,
        earlier: Epoch,
        earlier_end: DateTime<Utc>,
        later: Epoch,
        later_start: DateTime<Utc>,
    },
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ConfigError(#[from] pub Box<dyn Error + Send + Sync>);

impl From<anyhow::Error> for ConfigError {
    fn from(value: anyhow::Error) -> Self {
        ConfigError(value.into())
    }
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("malformed CSV at line {line}: {message}")]
    Csv { line: usize, message: String },

    #[error("unsupported file type {0}")]
    UnsupportedFileType(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Ordering(#[from] OrderingViolation),

    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
}
