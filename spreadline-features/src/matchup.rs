//! Joint risk and consistency assessment of a paired occurrence.
//!
//! The combined figures treat the two sides' margins against the line as independent: survival
//! rates multiply, failure risks combine as `1 − (1 − a)(1 − b)` and standard deviations add in
//! quadrature.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use spreadline::stats::rss;

use crate::config::{EngineConfig, TierThreshold};
use crate::domain::{Epoch, Event, Fixture, OccurrenceId, OccurrenceKey, ParticipantId, Quantity, Side, Status};
use crate::score::{score, Dispersion, Score};
use crate::shrinkage::ShrunkStat;
use crate::state::PregameState;
use crate::trend::{clash, Form};

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
pub enum Tier {
    Premium,
    Good,
    Fair,
    Avoid,
}

/// The first tier whose limits are both met, `Avoid` if none is. Undefined if either input is.
pub fn tier(combined_stdev: Option<f64>, blowout_risk: Option<f64>, tiers: &[TierThreshold]) -> Option<Tier> {
    let (stdev, blowout) = (combined_stdev?, blowout_risk?);
    Some(
        tiers
            .iter()
            .find(|threshold| stdev <= threshold.max_stdev && blowout <= threshold.max_blowout)
            .map_or(Tier::Avoid, |threshold| threshold.tier),
    )
}

/// Realized outcome of a completed pairing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Realized {
    pub home_points: u16,
    pub away_points: u16,
    pub home_margin: f64,
    pub away_margin: f64,
    pub total_margin: Option<f64>,
    /// Whether each side survived each configured teaser, and whether both did.
    pub home_teasers: Vec<bool>,
    pub away_teasers: Vec<bool>,
    pub both_teasers: Vec<bool>,
}

/// A paired occurrence: a scheduled fixture or a completed game.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pairing {
    pub key: OccurrenceKey,
    pub epoch: Epoch,
    pub home: ParticipantId,
    pub away: ParticipantId,
    pub neutral: bool,
    pub spread: f64,
    pub total: Option<f64>,
    pub result: Option<[Event; 2]>,
}
impl Pairing {
    pub fn scheduled(fixture: &Fixture) -> Self {
        Self {
            key: fixture.key,
            epoch: fixture.epoch,
            home: fixture.home,
            away: fixture.away,
            neutral: fixture.neutral,
            spread: fixture.spread,
            total: fixture.total,
            result: None,
        }
    }

    /// Pairs the two perspectives of a completed occurrence, home first.
    pub fn completed(events: &[Event; 2]) -> Self {
        let [home, away] = events;
        Self {
            key: home.key,
            epoch: home.epoch,
            home: home.participant,
            away: away.participant,
            neutral: home.neutral,
            spread: home.spread,
            total: home.total,
            result: Some(*events),
        }
    }

    pub fn participant(&self, side: Side) -> ParticipantId {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }

    pub fn status(&self) -> Status {
        match self.result {
            None => Status::Scheduled,
            Some(_) => Status::Completed,
        }
    }

    fn realized(&self, teasers: &[f64]) -> Option<Realized> {
        let [home, away] = self.result?;
        let survived = |margin: f64| teasers.iter().map(|&teaser| margin >= -teaser).collect::<Vec<_>>();
        let home_teasers = survived(home.margin);
        let away_teasers = survived(away.margin);
        let both_teasers = home_teasers
            .iter()
            .zip(&away_teasers)
            .map(|(&home, &away)| home && away)
            .collect();
        Some(Realized {
            home_points: home.points_for,
            away_points: away.points_for,
            home_margin: home.margin,
            away_margin: away.margin,
            total_margin: home.total_margin,
            home_teasers,
            away_teasers,
            both_teasers,
        })
    }
}

/// One side's pre-game figures entering the combination, drawn from its matchup window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SideSummary {
    pub participant: ParticipantId,
    pub games: usize,
    pub samples: usize,
    pub stdev: Option<f64>,
    pub within: Vec<Option<f64>>,
    pub teasers: Vec<Option<f64>>,
    pub blowout: Option<f64>,
    pub tail: Option<f64>,
    pub worst: Option<f64>,
    pub cover_rate: Option<f64>,
    pub streak: i32,
    pub form: Option<Form>,
    pub stabilizing: Option<bool>,
    pub iqr: Option<f64>,
    pub stabilized_mad: Option<f64>,
    pub profile_score: Option<f64>,
}
impl SideSummary {
    pub fn new(participant: ParticipantId, state: &PregameState, shrunk: &ShrunkStat, config: &EngineConfig) -> Self {
        let spread = state.quantity(Quantity::Spread);
        let window = spread.window(config.matchup.window);
        let tail_index = config
            .spread
            .tails
            .iter()
            .position(|&tail| tail == config.matchup.tail);
        Self {
            participant,
            games: state.games,
            samples: window.map_or(0, |window| window.samples),
            stdev: window.and_then(|window| window.stdev),
            within: window.map_or_else(
                || vec![None; config.spread.within.len()],
                |window| window.within.clone(),
            ),
            teasers: window.map_or_else(
                || vec![None; config.spread.teasers.len()],
                |window| window.teasers.clone(),
            ),
            blowout: window.and_then(|window| window.blowout),
            tail: window.zip(tail_index).and_then(|(window, index)| window.tails[index]),
            worst: window.and_then(|window| window.worst),
            cover_rate: window.and_then(|window| window.above),
            streak: state.trend.streak,
            form: state.trend.form,
            stabilizing: state.trend.stabilizing,
            iqr: spread.profile.iqr,
            stabilized_mad: shrunk.mad,
            profile_score: spread.profile.score.map(|score| score.value),
        }
    }
}

fn mean(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some((a? + b?) / 2.0)
}

fn product(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? * b?)
}

/// Probability that at least one of two independent failures occurs.
fn either(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(1.0 - (1.0 - a?) * (1.0 - b?))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchupProfile {
    pub occurrence: OccurrenceId,
    pub timestamp: DateTime<Utc>,
    pub epoch: Epoch,
    pub status: Status,
    pub neutral: bool,
    pub spread: f64,
    pub total: Option<f64>,
    pub home: SideSummary,
    pub away: SideSummary,
    pub combined_stdev: Option<f64>,
    pub avg_volatility: Option<f64>,
    pub max_volatility: Option<f64>,
    /// Mean of both sides' within-rates, per configured spread threshold.
    pub within: Vec<Option<f64>>,
    /// Probability of both sides surviving each configured teaser.
    pub teasers: Vec<Option<f64>>,
    pub blowout_risk: Option<f64>,
    pub tail_risk: Option<f64>,
    pub worst_case: Option<f64>,
    pub trend_clash: bool,
    pub both_stabilizing: bool,
    pub sufficient_history: bool,
    pub tier: Option<Tier>,
    pub score: Option<Score>,
    pub realized: Option<Realized>,
}
impl MatchupProfile {
    pub fn combine(pairing: &Pairing, home: SideSummary, away: SideSummary, config: &EngineConfig) -> Self {
        let combined_stdev = home.stdev.zip(away.stdev).map(|(home, away)| rss(home, away));
        let within: Vec<_> = home
            .within
            .iter()
            .zip(&away.within)
            .map(|(&home, &away)| mean(home, away))
            .collect();
        let teasers = home
            .teasers
            .iter()
            .zip(&away.teasers)
            .map(|(&home, &away)| product(home, away))
            .collect();
        let blowout_risk = either(home.blowout, away.blowout);
        let within_rate = config
            .spread
            .within
            .iter()
            .position(|&threshold| threshold == config.scoring.within_threshold)
            .and_then(|index| within[index]);
        let iqr = home.iqr.zip(away.iqr).map(|(home, away)| rss(home, away));
        Self {
            occurrence: pairing.key.occurrence,
            timestamp: pairing.key.timestamp,
            epoch: pairing.epoch,
            status: pairing.status(),
            neutral: pairing.neutral,
            spread: pairing.spread,
            total: pairing.total,
            combined_stdev,
            avg_volatility: mean(home.stdev, away.stdev),
            max_volatility: home.stdev.zip(away.stdev).map(|(home, away)| f64::max(home, away)),
            within,
            teasers,
            blowout_risk,
            tail_risk: either(home.tail, away.tail),
            worst_case: home.worst.zip(away.worst).map(|(home, away)| f64::min(home, away)),
            trend_clash: clash(home.form, away.form),
            both_stabilizing: home.stabilizing == Some(true) && away.stabilizing == Some(true),
            sufficient_history: home.samples >= config.matchup.min_history
                && away.samples >= config.matchup.min_history,
            tier: tier(combined_stdev, blowout_risk, &config.matchup.tiers),
            score: score(
                &Dispersion {
                    stdev: combined_stdev,
                    iqr,
                    within_rate,
                },
                &config.scoring,
            ),
            realized: pairing.realized(&config.spread.teasers),
            home,
            away,
        }
    }

    pub fn key(&self) -> OccurrenceKey {
        OccurrenceKey::new(self.timestamp, self.occurrence)
    }
}
