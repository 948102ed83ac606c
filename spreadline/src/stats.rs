//! Descriptive statistics over slices of samples.
//!
//! Functions that need at least one sample (or two, for the sample variance) return `None` rather
//! than a sentinel; an undefined statistic must never masquerade as zero.

pub trait SliceExt {
    fn sum(&self) -> f64;
    fn mean(&self) -> Option<f64>;
    fn mean_abs(&self) -> Option<f64>;
    fn sample_variance(&self) -> Option<f64>;
    fn sample_stdev(&self) -> Option<f64>;
    fn rate(&self, predicate: impl FnMut(f64) -> bool) -> Option<f64>;
    fn count(&self, predicate: impl FnMut(f64) -> bool) -> usize;
    fn min_value(&self) -> Option<f64>;
    fn max_value(&self) -> Option<f64>;
}
impl SliceExt for [f64] {
    fn sum(&self) -> f64 {
        self.iter().sum()
    }

    fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.sum() / self.len() as f64)
        }
    }

    fn mean_abs(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.iter().map(|value| value.abs()).sum::<f64>() / self.len() as f64)
        }
    }

    /// Two-pass sample variance with an `n − 1` denominator.
    fn sample_variance(&self) -> Option<f64> {
        if self.len() < 2 {
            return None;
        }
        let mean = self.sum() / self.len() as f64;
        let sum_sq_dev: f64 = self.iter().map(|value| (value - mean).powi(2)).sum();
        Some(sum_sq_dev / (self.len() - 1) as f64)
    }

    fn sample_stdev(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }

    fn rate(&self, predicate: impl FnMut(f64) -> bool) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.count(predicate) as f64 / self.len() as f64)
        }
    }

    fn count(&self, mut predicate: impl FnMut(f64) -> bool) -> usize {
        self.iter().filter(|&&value| predicate(value)).count()
    }

    fn min_value(&self) -> Option<f64> {
        self.iter().copied().reduce(f64::min)
    }

    fn max_value(&self) -> Option<f64> {
        self.iter().copied().reduce(f64::max)
    }
}

/// Root-sum-of-squares combination of independent standard deviations.
#[inline]
pub fn rss(a: f64, b: f64) -> f64 {
    a.hypot(b)
}

#[inline]
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    f64::min(f64::max(value, min), max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_float_eq::*;

    #[test]
    fn sum() {
        let data = [0.0, 0.1, 0.2];
        assert_f64_near!(0.3, data.sum(), 1);
    }

    #[test]
    fn mean_of_empty_is_undefined() {
        let data: [f64; 0] = [];
        assert_eq!(None, data.mean());
        assert_eq!(None, data.mean_abs());
        assert_eq!(None, data.rate(|_| true));
        assert_eq!(None, data.min_value());
    }

    #[test]
    fn mean_and_stdev() {
        let data = [5.0, 3.0, 7.0, 4.0];
        assert_eq!(Some(4.75), data.mean());
        assert_float_absolute_eq!(8.75 / 3.0, data.sample_variance().unwrap(), 1e-12);
        assert_float_absolute_eq!((8.75f64 / 3.0).sqrt(), data.sample_stdev().unwrap(), 1e-12);
    }

    #[test]
    fn stdev_of_one_sample_is_undefined() {
        assert_eq!(None, [3.0].sample_stdev());
    }

    #[test]
    fn mean_abs() {
        let data = [-3.0, 4.0];
        assert_eq!(Some(3.5), data.mean_abs());
    }

    #[test]
    fn rate_and_count() {
        let data = [-8.0, -2.0, 0.0, 9.5];
        assert_eq!(2, data.count(|value| value.abs() < 8.0));
        assert_eq!(Some(0.5), data.rate(|value| value.abs() < 8.0));
    }

    #[test]
    fn extrema() {
        let data = [2.0, -7.5, 4.0];
        assert_eq!(Some(-7.5), data.min_value());
        assert_eq!(Some(4.0), data.max_value());
    }

    #[test]
    fn rss_of_pythagorean_triple() {
        assert_f64_near!(10.0, rss(6.0, 8.0));
        assert_f64_near!(6.0, rss(6.0, 0.0));
    }

    #[test]
    fn clamp_bounds() {
        assert_eq!(0.0, clamp(-4.0, 0.0, 100.0));
        assert_eq!(100.0, clamp(140.0, 0.0, 100.0));
        assert_eq!(55.5, clamp(55.5, 0.0, 100.0));
    }
}
