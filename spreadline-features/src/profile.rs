//! Distribution shaping of a participant's epoch-to-date margins.

use serde::{Deserialize, Serialize};

use spreadline::quantile::SortedSamples;
use spreadline::stats::SliceExt;

use crate::config::{EngineConfig, ThresholdConfig};
use crate::domain::{Epoch, ParticipantId, PartitionKey, Quantity};
use crate::score::{score, Dispersion, Score};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub threshold: f64,
    pub count: usize,
    pub rate: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p5: Option<f64>,
    pub p25: Option<f64>,
    pub median: Option<f64>,
    pub p75: Option<f64>,
    pub p95: Option<f64>,
}
impl Percentiles {
    fn of(samples: &SortedSamples) -> Self {
        Self {
            p5: samples.percentile(0.05),
            p25: samples.percentile(0.25),
            median: samples.median(),
            p75: samples.percentile(0.75),
            p95: samples.percentile(0.95),
        }
    }

    pub fn iqr(&self) -> Option<f64> {
        Some(self.p75? - self.p25?)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistributionProfile {
    pub participant: ParticipantId,
    pub epoch: Epoch,
    pub quantity: Quantity,
    /// The margins in epoch order, verbatim.
    pub sequence: Vec<f64>,
    pub count: usize,
    pub mean: Option<f64>,
    pub stdev: Option<f64>,
    pub percentiles: Percentiles,
    pub iqr: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub buckets: Vec<Bucket>,
    pub skew: Option<f64>,
    pub score: Option<Score>,
}
impl DistributionProfile {
    pub fn compute(
        partition: PartitionKey,
        quantity: Quantity,
        sequence: Vec<f64>,
        config: &EngineConfig,
    ) -> Self {
        let thresholds = config.thresholds(quantity);
        let count = sequence.len();
        let defined = count >= config.profile.min_samples;
        let sorted = SortedSamples::from(&sequence[..]);
        let percentiles = if defined {
            Percentiles::of(&sorted)
        } else {
            Percentiles::default()
        };
        let buckets = buckets(&sequence, thresholds, defined);
        let (mean, stdev, min, max) = if defined {
            (
                sequence.mean(),
                sequence.sample_stdev(),
                sequence.min_value(),
                sequence.max_value(),
            )
        } else {
            (None, None, None, None)
        };
        let iqr = percentiles.iqr();
        let within_rate = buckets
            .iter()
            .find(|bucket| bucket.threshold == config.scoring.within_threshold)
            .and_then(|bucket| bucket.rate);
        Self {
            participant: partition.participant,
            epoch: partition.epoch,
            quantity,
            count,
            mean,
            stdev,
            percentiles,
            iqr,
            min,
            max,
            buckets,
            skew: skew(mean, percentiles.median, stdev),
            score: score(
                &Dispersion {
                    stdev,
                    iqr,
                    within_rate,
                },
                &config.scoring,
            ),
            sequence,
        }
    }

    pub fn partition(&self) -> PartitionKey {
        PartitionKey::new(self.participant, self.epoch)
    }
}

fn buckets(sequence: &[f64], thresholds: &ThresholdConfig, defined: bool) -> Vec<Bucket> {
    thresholds
        .buckets
        .iter()
        .map(|&threshold| {
            let count = sequence.count(|value| value.abs() < threshold);
            Bucket {
                threshold,
                count,
                rate: if defined { sequence.rate(|value| value.abs() < threshold) } else { None },
            }
        })
        .collect()
}

/// Pearson's second skewness coefficient, `3 · (mean − median) / stdev`.
pub fn skew(mean: Option<f64>, median: Option<f64>, stdev: Option<f64>) -> Option<f64> {
    let stdev = stdev?;
    if stdev == 0.0 {
        Some(0.0)
    } else {
        Some(3.0 * (mean? - median?) / stdev)
    }
}

/// Shape of the margins preceding an event, summarised for the feature and matchup tables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub stdev: Option<f64>,
    pub percentiles: Percentiles,
    pub iqr: Option<f64>,
    pub skew: Option<f64>,
    pub within_rate: Option<f64>,
    pub score: Option<Score>,
}

/// Incrementally maintained epoch-to-date profile of a sample stream. Moments are accumulated
/// with Welford's update; order statistics by sorted insertion.
#[derive(Clone, Debug)]
pub struct ProfileBuilder {
    sorted: SortedSamples,
    mean: f64,
    m2: f64,
    within_threshold: f64,
    within: usize,
}
impl ProfileBuilder {
    pub fn new(within_threshold: f64) -> Self {
        Self {
            sorted: SortedSamples::default(),
            mean: 0.0,
            m2: 0.0,
            within_threshold,
            within: 0,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.sorted.insert(value);
        let count = self.sorted.len() as f64;
        let delta = value - self.mean;
        self.mean += delta / count;
        self.m2 += delta * (value - self.mean);
        if value.abs() < self.within_threshold {
            self.within += 1;
        }
    }

    pub fn count(&self) -> usize {
        self.sorted.len()
    }

    pub fn summary(&self, config: &EngineConfig) -> ProfileSummary {
        let count = self.count();
        if count < config.profile.min_samples || count == 0 {
            return ProfileSummary {
                count,
                ..ProfileSummary::default()
            };
        }
        let mean = Some(self.mean);
        let stdev = if count < 2 {
            None
        } else {
            Some((f64::max(0.0, self.m2) / (count - 1) as f64).sqrt())
        };
        let percentiles = Percentiles::of(&self.sorted);
        let iqr = percentiles.iqr();
        let within_rate = Some(self.within as f64 / count as f64);
        ProfileSummary {
            count,
            mean,
            stdev,
            percentiles,
            iqr,
            skew: skew(mean, percentiles.median, stdev),
            within_rate,
            score: score(
                &Dispersion {
                    stdev,
                    iqr,
                    within_rate,
                },
                &config.scoring,
            ),
        }
    }
}
