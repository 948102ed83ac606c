//! Short-versus-long comparisons of a participant's recent record against the line.

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::config::TrendConfig;
use crate::window::WindowStat;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum Form {
    Hot,
    Cold,
    Steady,
}

/// Consecutive results against the line: `+n` after `n` straight covers, `−n` after `n` straight
/// failures to cover (pushes included), zero before the first event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak(pub i32);
impl Streak {
    pub fn push(&mut self, covered: bool) {
        self.0 = match (covered, self.0) {
            (true, run) if run > 0 => run + 1,
            (true, _) => 1,
            (false, run) if run < 0 => run - 1,
            (false, _) => -1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub streak: i32,
    /// Variance contraction ratio for each configured `(short, long)` pair.
    pub contraction: Vec<Option<f64>>,
    pub form: Option<Form>,
    pub stabilizing: Option<bool>,
}
impl Trend {
    /// Assesses the trend from the pre-event spread window statistics.
    pub fn assess(streak: Streak, windows: &[WindowStat], config: &TrendConfig) -> Self {
        let window = |size: usize| windows.iter().find(|stat| stat.window == size);
        let stdev = |size: usize| window(size).and_then(|stat| stat.stdev);
        let above = |size: usize| window(size).and_then(|stat| stat.above);

        Self {
            streak: streak.0,
            contraction: config
                .contraction
                .iter()
                .map(|&(short, long)| contraction(stdev(short), stdev(long)))
                .collect(),
            form: form(above(config.short), above(config.long), config.clash_threshold),
            stabilizing: contraction(stdev(config.short), stdev(config.long))
                .map(|ratio| ratio < 1.0),
        }
    }
}

/// Ratio of the short-window to the long-window standard deviation; below 1 when recent results
/// are tighter than the longer history.
pub fn contraction(short: Option<f64>, long: Option<f64>) -> Option<f64> {
    let long = long?;
    if long == 0.0 {
        None
    } else {
        Some(short? / long)
    }
}

pub fn form(short_rate: Option<f64>, long_rate: Option<f64>, threshold: f64) -> Option<Form> {
    let difference = short_rate? - long_rate?;
    Some(if difference > threshold {
        Form::Hot
    } else if difference < -threshold {
        Form::Cold
    } else {
        Form::Steady
    })
}

/// One side running hot against the line while the other runs cold.
pub fn clash(first: Option<Form>, second: Option<Form>) -> bool {
    matches!(
        (first, second),
        (Some(Form::Hot), Some(Form::Cold)) | (Some(Form::Cold), Some(Form::Hot))
    )
}
