//! A fixed-capacity sliding window over an optional-valued sample stream.
//!
//! Each [`push`](SlidingWindow::push) occupies one slot; once `capacity` slots are occupied the
//! oldest is evicted. A `None` occupies a slot but contributes no sample, so the window spans a
//! fixed number of positions irrespective of gaps. Moments are maintained as running sums of
//! values shifted by the first sample ever seen, which bounds cancellation when the samples sit
//! far from zero. Predicate counts are adjusted on entry and eviction, and the minimum is tracked
//! with a monotonic deque. Every statistic is therefore O(1) to read and amortised O(1) to
//! update.

use std::collections::VecDeque;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// A threshold test applied to each sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// `|x| < t`, strictly.
    AbsBelow(f64),
    /// `x < t`, strictly.
    Below(f64),
    /// `x > t`, strictly.
    Above(f64),
    /// `x >= t`, inclusive.
    AtLeast(f64),
    /// `x == t`.
    EqualTo(f64),
}
impl Predicate {
    #[inline]
    pub fn test(&self, value: f64) -> bool {
        match self {
            Predicate::AbsBelow(threshold) => value.abs() < *threshold,
            Predicate::Below(threshold) => value < *threshold,
            Predicate::Above(threshold) => value > *threshold,
            Predicate::AtLeast(threshold) => value >= *threshold,
            Predicate::EqualTo(threshold) => value == *threshold,
        }
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::AbsBelow(threshold) => write!(f, "|x| < {threshold}"),
            Predicate::Below(threshold) => write!(f, "x < {threshold}"),
            Predicate::Above(threshold) => write!(f, "x > {threshold}"),
            Predicate::AtLeast(threshold) => write!(f, "x >= {threshold}"),
            Predicate::EqualTo(threshold) => write!(f, "x = {threshold}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SlidingWindow {
    capacity: usize,
    slots: VecDeque<Option<f64>>,
    next_seq: u64,
    samples: usize,
    shift: Option<f64>,
    sum: f64,
    sum_sq: f64,
    sum_abs: f64,
    predicates: Vec<Predicate>,
    counts: Vec<usize>,
    minima: VecDeque<(u64, f64)>,
}
impl SlidingWindow {
    pub fn new(capacity: usize, predicates: Vec<Predicate>) -> Self {
        assert!(capacity > 0, "window capacity must be positive");
        let counts = vec![0; predicates.len()];
        Self {
            capacity,
            slots: VecDeque::with_capacity(capacity),
            next_seq: 0,
            samples: 0,
            shift: None,
            sum: 0.0,
            sum_sq: 0.0,
            sum_abs: 0.0,
            predicates,
            counts,
            minima: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: Option<f64>) {
        if self.slots.len() == self.capacity {
            let evicted_seq = self.next_seq - self.capacity as u64;
            if let Some(Some(evicted)) = self.slots.pop_front() {
                self.remove(evicted_seq, evicted);
            }
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.push_back(value);
        if let Some(value) = value {
            self.add(seq, value);
        }
    }

    fn add(&mut self, seq: u64, value: f64) {
        let shift = *self.shift.get_or_insert(value);
        let shifted = value - shift;
        self.samples += 1;
        self.sum += shifted;
        self.sum_sq += shifted * shifted;
        self.sum_abs += value.abs();
        for (predicate, count) in self.predicates.iter().zip(self.counts.iter_mut()) {
            if predicate.test(value) {
                *count += 1;
            }
        }
        while let Some(&(_, back)) = self.minima.back() {
            if back >= value {
                self.minima.pop_back();
            } else {
                break;
            }
        }
        self.minima.push_back((seq, value));
    }

    fn remove(&mut self, seq: u64, value: f64) {
        let shift = self.shift.unwrap_or(value);
        let shifted = value - shift;
        self.samples -= 1;
        self.sum -= shifted;
        self.sum_sq -= shifted * shifted;
        self.sum_abs -= value.abs();
        for (predicate, count) in self.predicates.iter().zip(self.counts.iter_mut()) {
            if predicate.test(value) {
                *count -= 1;
            }
        }
        if let Some(&(front_seq, _)) = self.minima.front() {
            if front_seq == seq {
                self.minima.pop_front();
            }
        }
        if self.samples == 0 {
            // an empty window carries no rounding residue forward
            self.sum = 0.0;
            self.sum_sq = 0.0;
            self.sum_abs = 0.0;
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn mean(&self) -> Option<f64> {
        let shift = self.shift?;
        if self.samples == 0 {
            None
        } else {
            Some(shift + self.sum / self.samples as f64)
        }
    }

    pub fn mean_abs(&self) -> Option<f64> {
        if self.samples == 0 {
            None
        } else {
            Some(f64::max(0.0, self.sum_abs) / self.samples as f64)
        }
    }

    /// Sample variance with an `n − 1` denominator; undefined below two samples.
    pub fn sample_variance(&self) -> Option<f64> {
        if self.samples < 2 {
            return None;
        }
        let n = self.samples as f64;
        let sum_sq_dev = self.sum_sq - self.sum * self.sum / n;
        Some(f64::max(0.0, sum_sq_dev) / (n - 1.0))
    }

    pub fn sample_stdev(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }

    /// Number of samples satisfying the predicate at `index`.
    pub fn count(&self, index: usize) -> usize {
        self.counts[index]
    }

    /// Fraction of samples satisfying the predicate at `index`.
    pub fn rate(&self, index: usize) -> Option<f64> {
        if self.samples == 0 {
            None
        } else {
            Some(self.counts[index] as f64 / self.samples as f64)
        }
    }

    pub fn min(&self) -> Option<f64> {
        self.minima.front().map(|&(_, value)| value)
    }
}
