//! Loading of game logs.
//!
//! A log is a JSON array of [`GameRecord`]s or a CSV file with a header row naming the record's
//! fields. Empty CSV cells are absent values.

use std::fmt::Display;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use tracing::debug;

use spreadline::csv::CsvReader;
use spreadline::file::{recurse_dir, ReadJsonFile};

use crate::domain::GameRecord;
use crate::error::ReadError;

const JSON: &str = "json";
const CSV: &str = "csv";

/// Reads the game log at `path`: a single JSON or CSV file, or a directory searched recursively
/// for such files, which are read in name order and concatenated.
pub fn read_game_log(path: impl AsRef<Path>) -> Result<Vec<GameRecord>, ReadError> {
    let mut files = vec![];
    recurse_dir(path.as_ref().to_path_buf(), &mut files, &mut |extension| {
        extension == JSON || extension == CSV
    })?;
    let mut records = vec![];
    for file in files {
        let mut from_file = read_file(&file)?;
        debug!("read {} records from {file:?}", from_file.len());
        records.append(&mut from_file);
    }
    Ok(records)
}

fn read_file(path: &Path) -> Result<Vec<GameRecord>, ReadError> {
    match path.extension().and_then(|extension| extension.to_str()) {
        Some(JSON) => Ok(Vec::<GameRecord>::read_json_file(path)?),
        Some(CSV) => parse_csv(CsvReader::open(path)?),
        other => Err(ReadError::UnsupportedFileType(other.unwrap_or_default().into())),
    }
}

struct Columns {
    indices: FxHashMap<String, usize>,
}
impl Columns {
    fn index(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    fn require(&self, name: &str) -> Result<usize, ReadError> {
        self.index(name).ok_or_else(|| ReadError::Csv {
            line: 1,
            message: format!("missing column '{name}'"),
        })
    }
}

struct Row<'a> {
    line: usize,
    cells: &'a [String],
}
impl Row<'_> {
    fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(|cell| cell.trim()).unwrap_or_default()
    }

    fn optional<T: FromStr>(&self, index: usize, name: &str) -> Result<Option<T>, ReadError>
    where
        T::Err: Display,
    {
        let cell = self.cell(index);
        if cell.is_empty() {
            return Ok(None);
        }
        cell.parse().map(Some).map_err(|err| ReadError::Csv {
            line: self.line,
            message: format!("invalid {name} '{cell}': {err}"),
        })
    }

    fn required<T: FromStr>(&self, index: usize, name: &str) -> Result<T, ReadError>
    where
        T::Err: Display,
    {
        self.optional(index, name)?.ok_or_else(|| ReadError::Csv {
            line: self.line,
            message: format!("missing {name}"),
        })
    }

    fn flag(&self, index: Option<usize>) -> Result<bool, ReadError> {
        match index.map(|index| self.cell(index).to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("false") | Some("0") => Ok(false),
            Some("true") | Some("1") => Ok(true),
            Some(other) => Err(ReadError::Csv {
                line: self.line,
                message: format!("invalid neutral flag '{other}'"),
            }),
        }
    }
}

pub fn parse_csv<R: Read>(reader: CsvReader<R>) -> Result<Vec<GameRecord>, ReadError> {
    let mut rows = reader.enumerate();
    let Some((_, header)) = rows.next() else {
        return Ok(vec![]);
    };
    let columns = Columns {
        indices: header?
            .into_iter()
            .enumerate()
            .map(|(index, name)| (name.trim().to_ascii_lowercase(), index))
            .collect(),
    };
    let occurrence = columns.require("occurrence")?;
    let timestamp = columns.require("timestamp")?;
    let epoch = columns.require("epoch")?;
    let status = columns.require("status")?;
    let home = columns.require("home")?;
    let away = columns.require("away")?;
    let neutral = columns.index("neutral");
    let home_points = columns.require("home_points")?;
    let away_points = columns.require("away_points")?;
    let spread = columns.require("spread")?;
    let total = columns.require("total")?;

    let mut records = vec![];
    for (index, cells) in rows {
        let cells = cells?;
        let row = Row {
            line: index + 1,
            cells: &cells,
        };
        records.push(GameRecord {
            occurrence: row.required(occurrence, "occurrence")?,
            timestamp: row.required(timestamp, "timestamp")?,
            epoch: row.required(epoch, "epoch")?,
            status: row.required(status, "status")?,
            home: row.optional(home, "home")?,
            away: row.optional(away, "away")?,
            neutral: row.flag(neutral)?,
            home_points: row.optional(home_points, "home points")?,
            away_points: row.optional(away_points, "away points")?,
            spread: row.optional(spread, "spread")?,
            total: row.optional(total, "total")?,
        });
    }
    Ok(records)
}
