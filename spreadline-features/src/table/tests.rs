use std::fs;

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::*;
use crate::domain::{GameRecord, OccurrenceId, Status};
use crate::pipeline::refresh;

fn record(
    occurrence: OccurrenceId,
    week: i64,
    (home, away): (u32, u32),
    points: Option<(u16, u16)>,
    spread: Option<f64>,
    total: Option<f64>,
) -> GameRecord {
    let start: DateTime<Utc> = Utc.with_ymd_and_hms(2023, 9, 2, 17, 0, 0).unwrap();
    GameRecord {
        occurrence,
        timestamp: start + Duration::weeks(week),
        epoch: 2023,
        status: if points.is_some() {
            Status::Completed
        } else {
            Status::Scheduled
        },
        home: Some(home),
        away: Some(away),
        neutral: false,
        home_points: points.map(|(home, _)| home),
        away_points: points.map(|(_, away)| away),
        spread,
        total,
    }
}

fn log() -> Vec<GameRecord> {
    vec![
        record(1, 0, (1, 2), Some((24, 17)), Some(-3.0), Some(40.5)),
        record(2, 1, (2, 3), Some((10, 20)), Some(1.5), None),
        record(3, 2, (3, 1), Some((14, 14)), Some(1.0), Some(28.0)),
        record(4, 2, (2, 4), Some((3, 0)), None, None),
        record(5, 3, (1, 2), None, Some(-2.5), Some(44.0)),
    ]
}

fn output() -> Output {
    refresh(&log(), None, &EngineConfig::default()).unwrap()
}

fn cell<'a>(table: &'a Table, row: usize, column: &str) -> &'a str {
    let index = table.column(column).unwrap_or_else(|| panic!("no column {column}"));
    &table.rows[row][index]
}

fn to_csv(table: &Table) -> Vec<u8> {
    let mut writer = CsvWriter::wrap(Vec::new());
    table.write_csv(&mut writer).unwrap();
    writer.into_inner().unwrap()
}

#[test]
fn threshold_labels() {
    assert_eq!("7", label(7.0));
    assert_eq!("7_5", label(7.5));
}

#[test]
fn rows_match_header_width() {
    let config = EngineConfig::default();
    let output = output();
    for table in [
        feature_table(&output.features, &config),
        profile_table(&output.profiles, &config),
        shrinkage_table(&output.shrinkage),
        matchup_table(&output.matchups, &config),
        skipped_table(&output.skipped),
    ] {
        assert!(!table.rows.is_empty());
        for row in &table.rows {
            assert_eq!(table.header.len(), row.len());
        }
    }
}

#[test]
fn feature_columns_are_named_by_threshold_and_window() {
    let table = feature_table(&[], &EngineConfig::default());
    assert!(table.rows.is_empty());
    for column in [
        "spread_mean_l10",
        "spread_within_7_l10",
        "spread_tail_12_l5",
        "spread_teaser_8_l20",
        "spread_blowout_15_l3",
        "spread_cover_rate_l10",
        "total_over_rate_l10",
        "total_push_rate_l3",
        "contraction_3v10",
        "contraction_5v20",
        "spread_stabilized_rmse",
        "total_profile_verdict",
    ] {
        assert!(table.column(column).is_some(), "missing {column}");
    }
    assert_eq!(None, table.column("total_blowout_15_l3"));
    assert_eq!(None, table.column("total_tail_8_l3"));
}

#[test]
fn feature_cells() {
    let config = EngineConfig::default();
    let table = feature_table(&output().features, &config);
    // participant 1: occurrence 1, occurrence 3, then the fixture
    assert_eq!("1", cell(&table, 0, "participant"));
    assert_eq!("1", cell(&table, 0, "occurrence"));
    assert_eq!("0", cell(&table, 0, "spread_samples_l3"));
    assert_eq!("", cell(&table, 0, "spread_mean_l3"));
    assert_eq!("4", cell(&table, 0, "margin"));
    assert_eq!("true", cell(&table, 0, "covered"));

    assert_eq!("3", cell(&table, 1, "occurrence"));
    assert_eq!("Away", cell(&table, 1, "side"));
    assert_eq!("-1", cell(&table, 1, "spread"));
    assert_eq!("4", cell(&table, 1, "spread_mean_l3"));
    assert_eq!("", cell(&table, 1, "spread_stdev_l3"));
    assert_eq!("1", cell(&table, 1, "spread_within_7_l3"));
    assert_eq!("1", cell(&table, 1, "streak"));
    assert_eq!("false", cell(&table, 1, "covered"));

    assert_eq!("5", cell(&table, 2, "occurrence"));
    assert_eq!("Scheduled", cell(&table, 2, "status"));
    assert_eq!("", cell(&table, 2, "margin"));
    assert_eq!("", cell(&table, 2, "covered"));
    assert_eq!("2", cell(&table, 2, "spread_samples_l10"));
    assert_eq!("-1", cell(&table, 2, "streak"));
}

#[test]
fn profile_sequence_is_a_list() {
    let config = EngineConfig::default();
    let table = profile_table(&output().profiles, &config);
    // participant 1, spread then total
    assert_eq!("spread", cell(&table, 0, "quantity"));
    assert_eq!("[4,-1]", cell(&table, 0, "sequence"));
    assert_eq!("1", cell(&table, 0, "within_3_count"));
    assert_eq!("2", cell(&table, 0, "within_5_count"));
    assert_eq!("", cell(&table, 0, "within_15_count"));
    assert_eq!("total", cell(&table, 1, "quantity"));
    assert_eq!("[0.5,0]", cell(&table, 1, "sequence"));
    assert_eq!("", cell(&table, 1, "within_3_rate"));
    assert_eq!("2", cell(&table, 1, "within_15_count"));
}

#[test]
fn matchup_cells() {
    let config = EngineConfig::default();
    let table = matchup_table(&output().matchups, &config);
    assert_eq!(4, table.rows.len());
    assert_eq!("1", cell(&table, 0, "occurrence"));
    assert_eq!("Completed", cell(&table, 0, "status"));
    assert_eq!("24", cell(&table, 0, "home_points"));
    assert_eq!("true", cell(&table, 0, "home_teaser_survived_8"));
    assert_eq!("true", cell(&table, 0, "both_teaser_survived_8"));
    assert_eq!("5", cell(&table, 3, "occurrence"));
    assert_eq!("Scheduled", cell(&table, 3, "status"));
    assert_eq!("", cell(&table, 3, "home_points"));
    assert_eq!("", cell(&table, 3, "both_teaser_survived_10"));
}

#[test]
fn skipped_rows() {
    let table = skipped_table(&output().skipped);
    assert_eq!(
        "occurrence,reason\n4,missing spread\n",
        String::from_utf8(to_csv(&table)).unwrap()
    );
}

#[test]
fn tables_are_byte_identical_across_runs() {
    let config = EngineConfig::default();
    let (first, second) = (output(), output());
    assert_eq!(
        to_csv(&feature_table(&first.features, &config)),
        to_csv(&feature_table(&second.features, &config))
    );
    assert_eq!(
        to_csv(&matchup_table(&first.matchups, &config)),
        to_csv(&matchup_table(&second.matchups, &config))
    );
    assert_eq!(
        serde_json::to_vec_pretty(&first.profiles).unwrap(),
        serde_json::to_vec_pretty(&second.profiles).unwrap()
    );
}

#[test]
fn write_every_table() {
    let dir = std::env::temp_dir().join(format!("spreadline-tables-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    write_tables(&output(), &EngineConfig::default(), &dir).unwrap();
    for name in ["features", "profiles", "shrinkage", "matchups", "skipped"] {
        assert!(dir.join(format!("{name}.csv")).is_file(), "missing {name}.csv");
        assert!(dir.join(format!("{name}.json")).is_file(), "missing {name}.json");
    }
    let skipped = fs::read_to_string(dir.join("skipped.json")).unwrap();
    assert!(skipped.contains("MissingSpread"));
    fs::remove_dir_all(&dir).unwrap();
}
