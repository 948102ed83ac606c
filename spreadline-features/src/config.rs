//! Engine configuration, loaded from TOML. Every field has a default, so an empty document
//! yields the stock configuration.

use std::collections::BTreeSet;
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::domain::Quantity;
use crate::error::{ConfigError, ReadError};
use crate::matchup::Tier;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Look-back window sizes, strictly ascending.
    pub windows: Vec<usize>,
    /// Fewer preceding samples than this leave a window statistic undefined.
    pub min_samples: usize,
    pub spread: ThresholdConfig,
    pub total: ThresholdConfig,
    pub trend: TrendConfig,
    pub shrinkage: ShrinkageConfig,
    pub profile: ProfileConfig,
    pub matchup: MatchupConfig,
    pub scoring: ScoringConfig,
}
impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            windows: vec![3, 5, 10, 20],
            min_samples: 1,
            spread: ThresholdConfig::spread(),
            total: ThresholdConfig::total(),
            trend: TrendConfig::default(),
            shrinkage: ShrinkageConfig::default(),
            profile: ProfileConfig::default(),
            matchup: MatchupConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}
impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn thresholds(&self, quantity: Quantity) -> &ThresholdConfig {
        match quantity {
            Quantity::Spread => &self.spread,
            Quantity::Total => &self.total,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.windows.is_empty() {
            return Err(anyhow!("window set cannot be empty").into());
        }
        if self.windows.contains(&0) {
            return Err(anyhow!("window sizes must be positive").into());
        }
        if !self.windows.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(anyhow!("window sizes {:?} must be strictly ascending", self.windows).into());
        }
        if self.min_samples == 0 {
            return Err(anyhow!("min samples must be positive").into());
        }
        self.spread.validate("spread")?;
        self.total.validate("total")?;
        self.trend.validate(&self.windows)?;
        self.shrinkage.validate()?;
        self.profile.validate()?;
        self.matchup.validate(&self.windows, &self.spread)?;
        self.scoring.validate()?;

        let within = self.scoring.within_threshold;
        for quantity in [Quantity::Spread, Quantity::Total] {
            let thresholds = self.thresholds(quantity);
            if !thresholds.within.contains(&within) || !thresholds.buckets.contains(&within) {
                return Err(anyhow!(
                    "scoring threshold {within} must be among the {quantity} within thresholds and buckets"
                )
                .into());
            }
        }
        Ok(())
    }
}

/// Margin thresholds for one quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Rate of `|margin| < t` is reported for each `t`.
    #[serde(default)]
    pub within: Vec<f64>,
    /// Rate of `margin < −t` is reported for each `t`.
    #[serde(default)]
    pub tails: Vec<f64>,
    /// Rate of `margin > −t` (the line moved `t` points in the participant's favour survived).
    #[serde(default)]
    pub teasers: Vec<f64>,
    /// Rate of `margin < −t` for a single, heavy loss threshold.
    #[serde(default)]
    pub blowout: Option<f64>,
    /// Profile bucket thresholds on `|margin|`.
    #[serde(default)]
    pub buckets: Vec<f64>,
}
impl ThresholdConfig {
    pub fn spread() -> Self {
        Self {
            within: vec![7.0, 10.0],
            tails: vec![8.0, 10.0, 12.0, 15.0, 20.0],
            teasers: vec![8.0, 10.0],
            blowout: Some(15.0),
            buckets: vec![3.0, 5.0, 7.0, 8.0, 10.0],
        }
    }

    pub fn total() -> Self {
        Self {
            within: vec![8.0, 10.0],
            tails: vec![],
            teasers: vec![],
            blowout: None,
            buckets: vec![5.0, 8.0, 10.0, 15.0],
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        for (set, values) in [
            ("within", &self.within),
            ("tails", &self.tails),
            ("teasers", &self.teasers),
            ("buckets", &self.buckets),
        ] {
            if values.iter().any(|value| !value.is_finite() || *value <= 0.0) {
                return Err(anyhow!("{name}.{set} thresholds must be positive").into());
            }
            if !values.windows(2).all(|pair| pair[0] < pair[1]) {
                return Err(anyhow!("{name}.{set} thresholds must be strictly ascending").into());
            }
        }
        if let Some(blowout) = self.blowout {
            if !blowout.is_finite() || blowout <= 0.0 {
                return Err(anyhow!("{name}.blowout threshold must be positive").into());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub short: usize,
    pub long: usize,
    /// Minimum difference between the short and long cover rates for a side to be in form.
    pub clash_threshold: f64,
    /// `(short, long)` pairs for which the variance contraction ratio is reported.
    pub contraction: Vec<(usize, usize)>,
}
impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            short: 3,
            long: 10,
            clash_threshold: 0.10,
            contraction: vec![(3, 10), (5, 20)],
        }
    }
}
impl TrendConfig {
    fn validate(&self, windows: &[usize]) -> Result<(), ConfigError> {
        for (short, long) in [(self.short, self.long)].into_iter().chain(self.contraction.iter().copied()) {
            if !windows.contains(&short) || !windows.contains(&long) {
                return Err(anyhow!("trend windows {short}v{long} must be among {windows:?}").into());
            }
            if short >= long {
                return Err(anyhow!("trend window {short} must be shorter than {long}").into());
            }
        }
        const CLASH_THRESHOLD_RANGE: RangeInclusive<f64> = 0.0..=1.0;
        if !CLASH_THRESHOLD_RANGE.contains(&self.clash_threshold) {
            return Err(anyhow!(
                "clash threshold ({}) outside of allowable range {CLASH_THRESHOLD_RANGE:?}",
                self.clash_threshold
            )
            .into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShrinkageConfig {
    /// Sample count at which the raw estimate receives full weight.
    pub saturation: usize,
    /// Sample count a participant needs before contributing to the population baseline.
    pub population_min_samples: usize,
}
impl Default for ShrinkageConfig {
    fn default() -> Self {
        Self {
            saturation: 15,
            population_min_samples: 10,
        }
    }
}
impl ShrinkageConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.saturation == 0 {
            return Err(anyhow!("shrinkage saturation must be positive").into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub min_samples: usize,
}
impl Default for ProfileConfig {
    fn default() -> Self {
        Self { min_samples: 1 }
    }
}
impl ProfileConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_samples == 0 {
            return Err(anyhow!("profile min samples must be positive").into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierThreshold {
    pub tier: Tier,
    pub max_stdev: f64,
    pub max_blowout: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchupConfig {
    /// The window whose statistics are combined; must be one of the configured windows.
    pub window: usize,
    /// Samples each side needs in the matchup window for the history to be sufficient.
    pub min_history: usize,
    /// Spread tail threshold combined into the joint tail risk; must be a configured tail.
    pub tail: f64,
    /// Tiers in order of preference; the first whose limits are both met applies.
    pub tiers: Vec<TierThreshold>,
}
impl Default for MatchupConfig {
    fn default() -> Self {
        Self {
            window: 10,
            min_history: 5,
            tail: 10.0,
            tiers: vec![
                TierThreshold {
                    tier: Tier::Premium,
                    max_stdev: 14.0,
                    max_blowout: 0.10,
                },
                TierThreshold {
                    tier: Tier::Good,
                    max_stdev: 17.0,
                    max_blowout: 0.20,
                },
                TierThreshold {
                    tier: Tier::Fair,
                    max_stdev: 20.0,
                    max_blowout: 0.30,
                },
            ],
        }
    }
}
impl MatchupConfig {
    fn validate(&self, windows: &[usize], spread: &ThresholdConfig) -> Result<(), ConfigError> {
        if !windows.contains(&self.window) {
            return Err(anyhow!("matchup window {} must be among {windows:?}", self.window).into());
        }
        if !spread.tails.contains(&self.tail) {
            return Err(anyhow!("matchup tail {} must be among the spread tails", self.tail).into());
        }
        if spread.blowout.is_none() {
            return Err(anyhow!("matchups require a spread blowout threshold").into());
        }
        let mut seen = BTreeSet::new();
        for threshold in &self.tiers {
            if threshold.tier == Tier::Avoid {
                return Err(anyhow!("the avoid tier is implied and cannot be configured").into());
            }
            if !seen.insert(threshold.tier) {
                return Err(anyhow!("tier {} configured more than once", threshold.tier).into());
            }
        }
        if !self
            .tiers
            .windows(2)
            .all(|pair| pair[0].max_stdev <= pair[1].max_stdev && pair[0].max_blowout <= pair[1].max_blowout)
        {
            return Err(anyhow!("tier limits must loosen in order of preference").into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub stdev_ceiling: f64,
    pub iqr_ceiling: f64,
    pub within_threshold: f64,
    pub stdev_weight: f64,
    pub iqr_weight: f64,
    pub within_weight: f64,
    pub strong: f64,
    pub lean: f64,
    pub caution: f64,
}
impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            stdev_ceiling: 20.0,
            iqr_ceiling: 25.0,
            within_threshold: 10.0,
            stdev_weight: 0.3,
            iqr_weight: 0.2,
            within_weight: 0.5,
            strong: 70.0,
            lean: 60.0,
            caution: 50.0,
        }
    }
}
impl ScoringConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.stdev_ceiling <= 0.0 || self.iqr_ceiling <= 0.0 {
            return Err(anyhow!("scoring ceilings must be positive").into());
        }
        let weights = [self.stdev_weight, self.iqr_weight, self.within_weight];
        if weights.iter().any(|&weight| weight < 0.0) {
            return Err(anyhow!("scoring weights cannot be negative").into());
        }
        const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(anyhow!("scoring weights sum to {sum}, expected 1").into());
        }
        if !(self.strong >= self.lean && self.lean >= self.caution) {
            return Err(anyhow!("verdict cut points must be descending").into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(EngineConfig::default(), config);
        assert_eq!(vec![3, 5, 10, 20], config.windows);
        assert_eq!(15, config.shrinkage.saturation);
        assert_eq!(Some(15.0), config.spread.blowout);
        assert_eq!(None, config.total.blowout);
        config.validate().unwrap();
    }

    #[test]
    fn partial_sections() {
        let toml_str = r#"
windows = [4, 8, 16]

[trend]
short = 4
long = 16
contraction = [[4, 16]]

[matchup]
window = 8

[shrinkage]
saturation = 12
"#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(vec![4, 8, 16], config.windows);
        assert_eq!(vec![(4, 16)], config.trend.contraction);
        assert_eq!(0.10, config.trend.clash_threshold);
        assert_eq!(8, config.matchup.window);
        assert_eq!(5, config.matchup.min_history);
        assert_eq!(12, config.shrinkage.saturation);
        assert_eq!(10, config.shrinkage.population_min_samples);
        config.validate().unwrap();
    }

    #[test]
    fn thresholds_section_replaces_the_set() {
        let toml_str = r#"
[spread]
within = [10.0]
tails = [10.0]
blowout = 14.0
buckets = [10.0]
"#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert!(config.spread.teasers.is_empty());
        assert_eq!(Some(14.0), config.spread.blowout);
        config.validate().unwrap();
    }

    #[test]
    fn rejects_empty_windows() {
        let config = EngineConfig {
            windows: vec![],
            ..EngineConfig::default()
        };
        assert_eq!("window set cannot be empty", config.validate().unwrap_err().to_string());
    }

    #[test]
    fn rejects_unordered_windows() {
        let config = EngineConfig {
            windows: vec![3, 10, 5, 20],
            ..EngineConfig::default()
        };
        assert_eq!(
            "window sizes [3, 10, 5, 20] must be strictly ascending",
            config.validate().unwrap_err().to_string()
        );
    }

    #[test]
    fn rejects_trend_window_outside_set() {
        let config = EngineConfig {
            windows: vec![3, 5, 10],
            ..EngineConfig::default()
        };
        assert_eq!(
            "trend windows 5v20 must be among [3, 5, 10]",
            config.validate().unwrap_err().to_string()
        );
    }

    #[test]
    fn rejects_zero_saturation() {
        let mut config = EngineConfig::default();
        config.shrinkage.saturation = 0;
        assert_eq!(
            "shrinkage saturation must be positive",
            config.validate().unwrap_err().to_string()
        );
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let mut config = EngineConfig::default();
        config.scoring.within_weight = 0.6;
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .starts_with("scoring weights sum to 1."));
    }

    #[test]
    fn rejects_scoring_threshold_without_bucket() {
        let mut config = EngineConfig::default();
        config.total.buckets = vec![5.0, 8.0];
        assert_eq!(
            "scoring threshold 10 must be among the total within thresholds and buckets",
            config.validate().unwrap_err().to_string()
        );
    }

    #[test]
    fn rejects_configured_avoid_tier() {
        let mut config = EngineConfig::default();
        config.matchup.tiers.push(TierThreshold {
            tier: Tier::Avoid,
            max_stdev: 30.0,
            max_blowout: 0.5,
        });
        assert_eq!(
            "the avoid tier is implied and cannot be configured",
            config.validate().unwrap_err().to_string()
        );
    }
}
