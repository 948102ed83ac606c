//! Order statistics.

use std::cmp::Ordering;

/// Linearly interpolated percentile of an ascending `sorted` slice, with `p` in `[0, 1]`. The rank
/// is `p · (n − 1)`, consistent with `percentile_cont` and the default method of most numeric
/// libraries.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    debug_assert!((0.0..=1.0).contains(&p), "percentile {p} outside [0, 1]");
    debug_assert!(is_sorted(sorted), "samples must be sorted");
    match sorted.len() {
        0 => None,
        1 => Some(sorted[0]),
        len => {
            let rank = p * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            if lower == upper {
                Some(sorted[lower])
            } else {
                let weight = rank - lower as f64;
                Some(sorted[lower] + weight * (sorted[upper] - sorted[lower]))
            }
        }
    }
}

fn is_sorted(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[0] <= pair[1])
}

/// Total order over floats for sorting samples. NaNs never enter the engine (margins are derived
/// from finite scores and lines), so a partial comparison failure is treated as equality.
#[inline]
pub fn compare(a: &f64, b: &f64) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// An ascending multiset of samples that accepts one insertion at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedSamples {
    values: Vec<f64>,
}
impl SortedSamples {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, value: f64) {
        let index = self.values.partition_point(|&existing| existing <= value);
        self.values.insert(index, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn percentile(&self, p: f64) -> Option<f64> {
        percentile(&self.values, p)
    }

    pub fn median(&self) -> Option<f64> {
        self.percentile(0.5)
    }
}

impl From<&[f64]> for SortedSamples {
    fn from(values: &[f64]) -> Self {
        let mut values = values.to_vec();
        values.sort_by(compare);
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_float_eq::*;

    #[test]
    fn percentile_of_empty() {
        assert_eq!(None, percentile(&[], 0.5));
    }

    #[test]
    fn percentile_of_singleton() {
        assert_eq!(Some(-8.0), percentile(&[-8.0], 0.05));
        assert_eq!(Some(-8.0), percentile(&[-8.0], 0.95));
    }

    #[test]
    fn percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(Some(1.0), percentile(&sorted, 0.0));
        assert_eq!(Some(4.0), percentile(&sorted, 1.0));
        assert_f64_near!(2.5, percentile(&sorted, 0.5).unwrap());
        assert_f64_near!(1.75, percentile(&sorted, 0.25).unwrap());
        assert_f64_near!(3.25, percentile(&sorted, 0.75).unwrap());
        assert_f64_near!(1.15, percentile(&sorted, 0.05).unwrap());
    }

    #[test]
    fn sorted_samples_insertion() {
        let mut samples = SortedSamples::with_capacity(4);
        assert!(samples.is_empty());
        for value in [5.0, 3.0, 7.0, 3.0] {
            samples.insert(value);
        }
        assert_eq!(&[3.0, 3.0, 5.0, 7.0], samples.as_slice());
        assert_eq!(4, samples.len());
        assert_eq!(Some(4.0), samples.median());
    }

    #[test]
    fn sorted_samples_from_slice() {
        let samples = SortedSamples::from(&[4.0, -1.0, 2.0][..]);
        assert_eq!(&[-1.0, 2.0, 4.0], samples.as_slice());
    }
}
