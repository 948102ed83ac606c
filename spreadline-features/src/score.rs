//! Bounded composite predictability score.

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use spreadline::stats::clamp;

use crate::config::ScoringConfig;

const SCALE: f64 = 100.0;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
pub enum Verdict {
    Strong,
    Lean,
    Caution,
    Avoid,
}

/// Dispersion figures of a margin distribution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dispersion {
    pub stdev: Option<f64>,
    pub iqr: Option<f64>,
    pub within_rate: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub value: f64,
    pub verdict: Verdict,
}

fn term(value: f64) -> f64 {
    clamp(value, 0.0, SCALE)
}

/// Scores the dispersion in `[0, 100]`; undefined if any of its figures is undefined.
pub fn score(dispersion: &Dispersion, config: &ScoringConfig) -> Option<Score> {
    let stdev_term = term(SCALE * (1.0 - dispersion.stdev? / config.stdev_ceiling));
    let iqr_term = term(SCALE * (1.0 - dispersion.iqr? / config.iqr_ceiling));
    let within_term = term(SCALE * dispersion.within_rate?);
    let value = term(
        config.stdev_weight * stdev_term
            + config.iqr_weight * iqr_term
            + config.within_weight * within_term,
    );
    Some(Score {
        value,
        verdict: verdict(value, config),
    })
}

pub fn verdict(score: f64, config: &ScoringConfig) -> Verdict {
    if score >= config.strong {
        Verdict::Strong
    } else if score >= config.lean {
        Verdict::Lean
    } else if score >= config.caution {
        Verdict::Caution
    } else {
        Verdict::Avoid
    }
}
