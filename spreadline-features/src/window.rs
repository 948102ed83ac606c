//! Causal rolling statistics over fixed-size look-back windows.
//!
//! A [`WindowTracker`] holds one sliding accumulator per configured window size. Reading it
//! before the current event's value is pushed yields statistics over strictly preceding events
//! only.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use spreadline::sliding::{Predicate, SlidingWindow};

use crate::config::ThresholdConfig;

/// Statistics of the samples preceding an event within one look-back window. Every statistic is
/// undefined when fewer than the minimum number of samples are available; rates are aligned
/// with the configured thresholds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowStat {
    pub window: usize,
    pub samples: usize,
    pub mean: Option<f64>,
    pub stdev: Option<f64>,
    pub mean_abs: Option<f64>,
    pub within: Vec<Option<f64>>,
    pub tails: Vec<Option<f64>>,
    pub teasers: Vec<Option<f64>>,
    pub blowout: Option<f64>,
    /// Rate of margins strictly above the line.
    pub above: Option<f64>,
    pub push: Option<f64>,
    pub worst: Option<f64>,
}
impl WindowStat {
    pub fn is_defined(&self) -> bool {
        self.mean.is_some()
    }

    fn read(window: &SlidingWindow, layout: &Layout, min_samples: usize) -> Self {
        let defined = window.samples() >= min_samples.max(1);
        let rate = |index: usize| if defined { window.rate(index) } else { None };
        let rates = |range: Range<usize>| -> Vec<Option<f64>> { range.map(rate).collect() };
        let defined_or_none = |value: Option<f64>| if defined { value } else { None };
        Self {
            window: window.capacity(),
            samples: window.samples(),
            mean: defined_or_none(window.mean()),
            stdev: defined_or_none(window.sample_stdev()),
            mean_abs: defined_or_none(window.mean_abs()),
            within: rates(layout.within.clone()),
            tails: rates(layout.tails.clone()),
            teasers: rates(layout.teasers.clone()),
            blowout: layout.blowout.and_then(rate),
            above: rate(layout.above),
            push: rate(layout.push),
            worst: defined_or_none(window.min()),
        }
    }
}

/// Positions of each threshold family within a window's predicate list.
#[derive(Clone, Debug, PartialEq)]
struct Layout {
    within: Range<usize>,
    tails: Range<usize>,
    teasers: Range<usize>,
    blowout: Option<usize>,
    above: usize,
    push: usize,
}
impl Layout {
    fn predicates(thresholds: &ThresholdConfig) -> (Self, Vec<Predicate>) {
        let mut predicates = Vec::with_capacity(
            thresholds.within.len() + thresholds.tails.len() + thresholds.teasers.len() + 3,
        );
        let mut extend = |family: &mut dyn Iterator<Item = Predicate>| {
            let start = predicates.len();
            predicates.extend(family);
            start..predicates.len()
        };
        let within = extend(&mut thresholds.within.iter().map(|&t| Predicate::AbsBelow(t)));
        let tails = extend(&mut thresholds.tails.iter().map(|&t| Predicate::Below(-t)));
        let teasers = extend(&mut thresholds.teasers.iter().map(|&t| Predicate::AtLeast(-t)));
        let blowout = thresholds
            .blowout
            .map(|t| extend(&mut std::iter::once(Predicate::Below(-t))).start);
        let above = extend(&mut std::iter::once(Predicate::Above(0.0))).start;
        let push = extend(&mut std::iter::once(Predicate::EqualTo(0.0))).start;
        (
            Self {
                within,
                tails,
                teasers,
                blowout,
                above,
                push,
            },
            predicates,
        )
    }
}

/// Sliding accumulators for one quantity, one per window size.
#[derive(Clone, Debug)]
pub struct WindowTracker {
    layout: Layout,
    windows: Vec<SlidingWindow>,
    min_samples: usize,
}
impl WindowTracker {
    pub fn new(sizes: &[usize], thresholds: &ThresholdConfig, min_samples: usize) -> Self {
        let (layout, predicates) = Layout::predicates(thresholds);
        let windows = sizes
            .iter()
            .map(|&size| SlidingWindow::new(size, predicates.clone()))
            .collect();
        Self {
            layout,
            windows,
            min_samples,
        }
    }

    pub fn push(&mut self, value: Option<f64>) {
        for window in &mut self.windows {
            window.push(value);
        }
    }

    /// Statistics over the values pushed so far, one per window size.
    pub fn read(&self) -> Vec<WindowStat> {
        self.windows
            .iter()
            .map(|window| WindowStat::read(window, &self.layout, self.min_samples))
            .collect()
    }
}

/// Pre-event statistics for every position of an ordered value sequence: element `i` of the
/// result describes the values strictly before position `i`.
pub fn rolling(
    values: &[Option<f64>],
    sizes: &[usize],
    thresholds: &ThresholdConfig,
    min_samples: usize,
) -> Vec<Vec<WindowStat>> {
    let mut tracker = WindowTracker::new(sizes, thresholds, min_samples);
    values
        .iter()
        .map(|&value| {
            let stats = tracker.read();
            tracker.push(value);
            stats
        })
        .collect()
}
