//! Shrinkage of small-sample estimates toward a population baseline.

use serde::{Deserialize, Serialize};

/// Cumulative error of a sample stream against zero: the basis of the mean absolute deviation
/// and root-mean-square error of margins against a line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorAggregate {
    pub samples: usize,
    pub sum_abs: f64,
    pub sum_sq: f64,
}
impl ErrorAggregate {
    pub fn push(&mut self, value: f64) {
        self.samples += 1;
        self.sum_abs += value.abs();
        self.sum_sq += value * value;
    }

    pub fn mad(&self) -> Option<f64> {
        if self.samples == 0 {
            None
        } else {
            Some(self.sum_abs / self.samples as f64)
        }
    }

    pub fn rmse(&self) -> Option<f64> {
        if self.samples == 0 {
            None
        } else {
            Some((self.sum_sq / self.samples as f64).sqrt())
        }
    }
}

impl FromIterator<f64> for ErrorAggregate {
    fn from_iter<T: IntoIterator<Item = f64>>(iter: T) -> Self {
        let mut aggregate = ErrorAggregate::default();
        for value in iter {
            aggregate.push(value);
        }
        aggregate
    }
}

/// Credibility weight `min(samples, saturation) / saturation`.
pub fn weight(samples: usize, saturation: usize) -> f64 {
    assert!(saturation > 0, "saturation must be positive");
    samples.min(saturation) as f64 / saturation as f64
}

/// Blends a `raw` estimate with a `population` baseline: `w · raw + (1 − w) · population`.
///
/// An absent population leaves the blend undefined. An absent raw estimate (no samples, hence
/// a zero weight) yields the population itself.
pub fn blend(raw: Option<f64>, weight: f64, population: Option<f64>) -> Option<f64> {
    debug_assert!((0.0..=1.0).contains(&weight), "weight {weight} outside [0, 1]");
    let population = population?;
    match raw {
        None => Some(population),
        Some(raw) => Some(weight * raw + (1.0 - weight) * population),
    }
}

/// Arithmetic mean of the defined values; `None` if there are none.
pub fn population_mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (count, sum) = values
        .into_iter()
        .fold((0usize, 0.0), |(count, sum), value| (count + 1, sum + value));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
