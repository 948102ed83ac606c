//! Flattening of the refresh output into tables with one scalar per cell.
//!
//! Columns that depend on the configuration are suffixed with their threshold and window, e.g.
//! `spread_within_7_l10` is the fraction of the last 10 spread margins strictly within 7 points.
//! A fractional threshold replaces its decimal point with an underscore (`7_5`). Undefined values
//! are empty cells.

use std::io;
use std::io::Write;
use std::path::Path;

use strum::IntoEnumIterator;
use tracing::debug;

use spreadline::csv::{CsvWriter, Record};
use spreadline::file::WriteJsonFile;
use spreadline::quantile::compare;

use crate::config::{EngineConfig, ThresholdConfig};
use crate::domain::Quantity;
use crate::matchup::{MatchupProfile, SideSummary};
use crate::normalise::Skipped;
use crate::pipeline::{FeatureRow, Output};
use crate::profile::{DistributionProfile, Percentiles, ProfileSummary};
use crate::score::Score;
use crate::shrinkage::ShrunkStat;
use crate::window::WindowStat;

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Record>,
}
impl Table {
    fn new(header: Vec<String>) -> Self {
        Self { header, rows: vec![] }
    }

    fn push(&mut self, record: Record) {
        debug_assert_eq!(self.header.len(), record.len(), "row width differs from the header");
        self.rows.push(record);
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|column| column == name)
    }

    pub fn write_csv<W: Write>(&self, writer: &mut CsvWriter<W>) -> Result<(), io::Error> {
        writer.append(&self.header)?;
        for row in &self.rows {
            writer.append(row.clone())?;
        }
        writer.flush()
    }
}

/// Renders a threshold for use in a column name.
pub fn label(threshold: f64) -> String {
    threshold.to_string().replace('.', "_")
}

fn names(header: &mut Vec<String>, prefix: &str, family: &str, thresholds: &[f64], suffix: &str) {
    header.extend(
        thresholds
            .iter()
            .map(|&threshold| format!("{prefix}{family}_{}{suffix}", label(threshold))),
    );
}

fn push_all(record: &mut Record, values: &[Option<f64>]) {
    for &value in values {
        record.push_opt(value);
    }
}

fn push_score(record: &mut Record, score: Option<Score>) {
    record.push_opt(score.map(|score| score.value));
    record.push_opt(score.map(|score| score.verdict));
}

fn window_header(header: &mut Vec<String>, quantity: Quantity, thresholds: &ThresholdConfig, window: usize) {
    let prefix = format!("{quantity}_");
    let suffix = format!("_l{window}");
    for stat in ["samples", "mean", "stdev", "mean_abs"] {
        header.push(format!("{prefix}{stat}{suffix}"));
    }
    names(header, &prefix, "within", &thresholds.within, &suffix);
    names(header, &prefix, "tail", &thresholds.tails, &suffix);
    names(header, &prefix, "teaser", &thresholds.teasers, &suffix);
    if let Some(blowout) = thresholds.blowout {
        names(header, &prefix, "blowout", &[blowout], &suffix);
    }
    header.push(format!("{prefix}{}_rate{suffix}", quantity.above_label()));
    header.push(format!("{prefix}push_rate{suffix}"));
    header.push(format!("{prefix}worst{suffix}"));
}

fn window_cells(record: &mut Record, stat: &WindowStat, thresholds: &ThresholdConfig) {
    record.push(stat.samples);
    record.push_opt(stat.mean);
    record.push_opt(stat.stdev);
    record.push_opt(stat.mean_abs);
    push_all(record, &stat.within);
    push_all(record, &stat.tails);
    push_all(record, &stat.teasers);
    if thresholds.blowout.is_some() {
        record.push_opt(stat.blowout);
    }
    record.push_opt(stat.above);
    record.push_opt(stat.push);
    record.push_opt(stat.worst);
}

const PERCENTILES: [&str; 5] = ["p5", "p25", "median", "p75", "p95"];

fn percentile_cells(record: &mut Record, percentiles: &Percentiles) {
    push_all(
        record,
        &[
            percentiles.p5,
            percentiles.p25,
            percentiles.median,
            percentiles.p75,
            percentiles.p95,
        ],
    );
}

fn summary_header(header: &mut Vec<String>, quantity: Quantity) {
    let prefix = format!("{quantity}_profile_");
    for stat in ["count", "mean", "stdev"]
        .into_iter()
        .chain(PERCENTILES)
        .chain(["iqr", "skew", "within_rate", "score", "verdict"])
    {
        header.push(format!("{prefix}{stat}"));
    }
}

fn summary_cells(record: &mut Record, summary: &ProfileSummary) {
    record.push(summary.count);
    record.push_opt(summary.mean);
    record.push_opt(summary.stdev);
    percentile_cells(record, &summary.percentiles);
    record.push_opt(summary.iqr);
    record.push_opt(summary.skew);
    record.push_opt(summary.within_rate);
    push_score(record, summary.score);
}

fn feature_header(config: &EngineConfig) -> Vec<String> {
    let mut header: Vec<String> = [
        "participant",
        "opponent",
        "epoch",
        "occurrence",
        "timestamp",
        "status",
        "side",
        "neutral",
        "spread",
        "total",
        "margin",
        "total_margin",
        "covered",
        "games",
        "streak",
        "form",
        "stabilizing",
    ]
    .map(String::from)
    .into();
    header.extend(
        config
            .trend
            .contraction
            .iter()
            .map(|(short, long)| format!("contraction_{short}v{long}")),
    );
    for quantity in Quantity::iter() {
        let thresholds = config.thresholds(quantity);
        for &window in &config.windows {
            window_header(&mut header, quantity, thresholds, window);
        }
        for stat in [
            "season_samples",
            "season_mad",
            "season_rmse",
            "weight",
            "population_participants",
            "population_mad",
            "population_rmse",
            "stabilized_mad",
            "stabilized_rmse",
        ] {
            header.push(format!("{quantity}_{stat}"));
        }
        summary_header(&mut header, quantity);
    }
    header
}

fn feature_record(row: &FeatureRow, config: &EngineConfig) -> Record {
    let mut record = Record::with_capacity(0);
    record.push(row.participant);
    record.push(row.opponent);
    record.push(row.epoch);
    record.push(row.occurrence);
    record.push(row.timestamp.to_rfc3339());
    record.push(row.status);
    record.push(row.side);
    record.push(row.neutral);
    record.push(row.spread);
    record.push_opt(row.total);
    record.push_opt(row.margin);
    record.push_opt(row.total_margin);
    record.push_opt(row.covered());
    record.push(row.state.games);
    record.push(row.state.trend.streak);
    record.push_opt(row.state.trend.form);
    record.push_opt(row.state.trend.stabilizing);
    push_all(&mut record, &row.state.trend.contraction);
    for quantity in Quantity::iter() {
        let thresholds = config.thresholds(quantity);
        let state = row.state.quantity(quantity);
        for stat in &state.windows {
            window_cells(&mut record, stat, thresholds);
        }
        let shrunk = &row.shrunk[usize::from(quantity)];
        record.push(state.season.samples);
        record.push_opt(shrunk.raw_mad);
        record.push_opt(shrunk.raw_rmse);
        record.push(shrunk.weight);
        record.push(shrunk.population.participants);
        record.push_opt(shrunk.population.mad);
        record.push_opt(shrunk.population.rmse);
        record.push_opt(shrunk.mad);
        record.push_opt(shrunk.rmse);
        summary_cells(&mut record, &state.profile);
    }
    record
}

/// One row per participant per occurrence, completed or scheduled.
pub fn feature_table(rows: &[FeatureRow], config: &EngineConfig) -> Table {
    let mut table = Table::new(feature_header(config));
    for row in rows {
        table.push(feature_record(row, config));
    }
    table
}

/// The bucket thresholds of every quantity, ascending and without repeats.
fn bucket_thresholds(config: &EngineConfig) -> Vec<f64> {
    let mut thresholds: Vec<_> = Quantity::iter()
        .flat_map(|quantity| config.thresholds(quantity).buckets.iter().copied())
        .collect();
    thresholds.sort_by(compare);
    thresholds.dedup();
    thresholds
}

fn sequence(values: &[f64]) -> String {
    let values: Vec<_> = values.iter().map(f64::to_string).collect();
    format!("[{}]", values.join(","))
}

/// One row per participant, epoch and quantity. Bucket columns span the thresholds of all
/// quantities; those a quantity does not configure are empty.
pub fn profile_table(profiles: &[DistributionProfile], config: &EngineConfig) -> Table {
    let buckets = bucket_thresholds(config);
    let mut header: Vec<String> = ["participant", "epoch", "quantity", "count", "mean", "stdev"]
        .into_iter()
        .chain(PERCENTILES)
        .chain(["iqr", "min", "max"])
        .map(String::from)
        .collect();
    for &threshold in &buckets {
        header.push(format!("within_{}_count", label(threshold)));
        header.push(format!("within_{}_rate", label(threshold)));
    }
    header.extend(["skew", "score", "verdict", "sequence"].map(String::from));

    let mut table = Table::new(header);
    for profile in profiles {
        let mut record = Record::with_capacity(0);
        record.push(profile.participant);
        record.push(profile.epoch);
        record.push(profile.quantity);
        record.push(profile.count);
        record.push_opt(profile.mean);
        record.push_opt(profile.stdev);
        percentile_cells(&mut record, &profile.percentiles);
        record.push_opt(profile.iqr);
        record.push_opt(profile.min);
        record.push_opt(profile.max);
        for &threshold in &buckets {
            let bucket = profile.buckets.iter().find(|bucket| bucket.threshold == threshold);
            record.push_opt(bucket.map(|bucket| bucket.count));
            record.push_opt(bucket.and_then(|bucket| bucket.rate));
        }
        record.push_opt(profile.skew);
        push_score(&mut record, profile.score);
        record.push(sequence(&profile.sequence));
        table.push(record);
    }
    table
}

pub fn shrinkage_table(stats: &[ShrunkStat]) -> Table {
    let header = [
        "participant",
        "epoch",
        "quantity",
        "samples",
        "raw_mad",
        "raw_rmse",
        "weight",
        "population_participants",
        "population_mad",
        "population_rmse",
        "stabilized_mad",
        "stabilized_rmse",
    ]
    .map(String::from)
    .into();
    let mut table = Table::new(header);
    for stat in stats {
        let mut record = Record::with_capacity(0);
        record.push(stat.participant);
        record.push(stat.epoch);
        record.push(stat.quantity);
        record.push(stat.samples);
        record.push_opt(stat.raw_mad);
        record.push_opt(stat.raw_rmse);
        record.push(stat.weight);
        record.push(stat.population.participants);
        record.push_opt(stat.population.mad);
        record.push_opt(stat.population.rmse);
        record.push_opt(stat.mad);
        record.push_opt(stat.rmse);
        table.push(record);
    }
    table
}

fn side_header(header: &mut Vec<String>, side: &str, config: &EngineConfig) {
    let prefix = format!("{side}_");
    for stat in ["participant", "games", "samples", "stdev"] {
        header.push(format!("{prefix}{stat}"));
    }
    names(header, &prefix, "within", &config.spread.within, "");
    names(header, &prefix, "teaser", &config.spread.teasers, "");
    for stat in [
        "blowout",
        "tail",
        "worst",
        "cover_rate",
        "streak",
        "form",
        "stabilizing",
        "iqr",
        "stabilized_mad",
        "profile_score",
    ] {
        header.push(format!("{prefix}{stat}"));
    }
}

fn side_cells(record: &mut Record, side: &SideSummary) {
    record.push(side.participant);
    record.push(side.games);
    record.push(side.samples);
    record.push_opt(side.stdev);
    push_all(record, &side.within);
    push_all(record, &side.teasers);
    record.push_opt(side.blowout);
    record.push_opt(side.tail);
    record.push_opt(side.worst);
    record.push_opt(side.cover_rate);
    record.push(side.streak);
    record.push_opt(side.form);
    record.push_opt(side.stabilizing);
    record.push_opt(side.iqr);
    record.push_opt(side.stabilized_mad);
    record.push_opt(side.profile_score);
}

/// One row per occurrence, with realized labels once the occurrence has completed.
pub fn matchup_table(matchups: &[MatchupProfile], config: &EngineConfig) -> Table {
    let teasers = &config.spread.teasers;
    let mut header: Vec<String> = [
        "occurrence",
        "timestamp",
        "epoch",
        "status",
        "neutral",
        "spread",
        "total",
    ]
    .map(String::from)
    .into();
    side_header(&mut header, "home", config);
    side_header(&mut header, "away", config);
    header.extend(["combined_stdev", "avg_volatility", "max_volatility"].map(String::from));
    names(&mut header, "", "within", &config.spread.within, "");
    names(&mut header, "", "teaser", teasers, "");
    header.extend(
        [
            "blowout_risk",
            "tail_risk",
            "worst_case",
            "trend_clash",
            "both_stabilizing",
            "sufficient_history",
            "tier",
            "score",
            "verdict",
            "home_points",
            "away_points",
            "home_margin",
            "away_margin",
            "total_margin",
        ]
        .map(String::from),
    );
    for side in ["home", "away", "both"] {
        names(&mut header, &format!("{side}_"), "teaser_survived", teasers, "");
    }

    let mut table = Table::new(header);
    for matchup in matchups {
        let mut record = Record::with_capacity(0);
        record.push(matchup.occurrence);
        record.push(matchup.timestamp.to_rfc3339());
        record.push(matchup.epoch);
        record.push(matchup.status);
        record.push(matchup.neutral);
        record.push(matchup.spread);
        record.push_opt(matchup.total);
        side_cells(&mut record, &matchup.home);
        side_cells(&mut record, &matchup.away);
        record.push_opt(matchup.combined_stdev);
        record.push_opt(matchup.avg_volatility);
        record.push_opt(matchup.max_volatility);
        push_all(&mut record, &matchup.within);
        push_all(&mut record, &matchup.teasers);
        record.push_opt(matchup.blowout_risk);
        record.push_opt(matchup.tail_risk);
        record.push_opt(matchup.worst_case);
        record.push(matchup.trend_clash);
        record.push(matchup.both_stabilizing);
        record.push(matchup.sufficient_history);
        record.push_opt(matchup.tier);
        push_score(&mut record, matchup.score);
        let realized = matchup.realized.as_ref();
        record.push_opt(realized.map(|realized| realized.home_points));
        record.push_opt(realized.map(|realized| realized.away_points));
        record.push_opt(realized.map(|realized| realized.home_margin));
        record.push_opt(realized.map(|realized| realized.away_margin));
        record.push_opt(realized.and_then(|realized| realized.total_margin));
        for survived in [
            realized.map(|realized| &realized.home_teasers),
            realized.map(|realized| &realized.away_teasers),
            realized.map(|realized| &realized.both_teasers),
        ] {
            for index in 0..teasers.len() {
                record.push_opt(survived.map(|survived| survived[index]));
            }
        }
        table.push(record);
    }
    table
}

pub fn skipped_table(skipped: &[Skipped]) -> Table {
    let mut table = Table::new(vec!["occurrence".into(), "reason".into()]);
    for skip in skipped {
        table.push(Record::with_values([skip.occurrence.to_string(), skip.reason.to_string()]));
    }
    table
}

/// Writes every table of the `output` into `dir`, each as `<name>.csv` alongside the unflattened
/// rows as `<name>.json`.
pub fn write_tables(output: &Output, config: &EngineConfig, dir: impl AsRef<Path>) -> Result<(), io::Error> {
    let dir = dir.as_ref();
    let tables = [
        ("features", feature_table(&output.features, config)),
        ("profiles", profile_table(&output.profiles, config)),
        ("shrinkage", shrinkage_table(&output.shrinkage)),
        ("matchups", matchup_table(&output.matchups, config)),
        ("skipped", skipped_table(&output.skipped)),
    ];
    for (name, table) in &tables {
        let path = dir.join(format!("{name}.csv"));
        table.write_csv(&mut CsvWriter::create(&path)?)?;
        debug!("wrote {} rows to {path:?}", table.rows.len());
    }
    output.features.write_json_file(dir.join("features.json"))?;
    output.profiles.write_json_file(dir.join("profiles.json"))?;
    output.shrinkage.write_json_file(dir.join("shrinkage.json"))?;
    output.matchups.write_json_file(dir.join("matchups.json"))?;
    output.skipped.write_json_file(dir.join("skipped.json"))?;
    Ok(())
}

#[cfg(test)]
mod tests;
