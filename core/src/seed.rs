//! Bulk loading of seed files into an empty (or partially filled) store.
//!
//! RULE: each table loads in its own atomic unit. A table whose rows break
//! a constraint is skipped whole and the load moves on to the next one.

use crate::{
    clock::DATE_FORMAT,
    entity::Table,
    error::{BankError, BankResult},
    store::{json_to_cell, BankStore},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use rusqlite::types::Value;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Seed file for each table, in load order.
pub const SEED_FILES: [(&str, Table); 7] = [
    ("branches.csv", Table::Branches),
    ("customers.csv", Table::Customers),
    ("accounts.csv", Table::Accounts),
    ("loans.csv", Table::Loans),
    ("credit_cards.json", Table::CreditCards),
    ("transactions.csv", Table::Transactions),
    ("support_tickets.csv", Table::SupportTickets),
];

/// Parsed rows of one seed file: lower-cased headers and raw cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedFrame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SeedOutcome {
    Loaded { rows: usize, duplicates_dropped: usize },
    Skipped { reason: String },
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSeed {
    pub table: Table,
    pub file: String,
    #[serde(flatten)]
    pub outcome: SeedOutcome,
}

/// Per-table results of one seed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeedReport {
    pub tables: Vec<TableSeed>,
}

impl SeedReport {
    pub fn rows_loaded(&self, table: Table) -> usize {
        self.tables
            .iter()
            .filter(|t| t.table == table)
            .map(|t| match t.outcome {
                SeedOutcome::Loaded { rows, .. } => rows,
                _ => 0,
            })
            .sum()
    }
}

// ── Extraction ────────────────────────────────────────────────────────────

fn read_csv(path: &Path) -> BankResult<SeedFrame> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let columns = reader
        .headers()?
        .iter()
        .map(|h| h.to_lowercase())
        .collect::<Vec<_>>();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = (0..columns.len())
            .map(|i| match record.get(i) {
                Some(cell) if !cell.is_empty() => Value::Text(cell.to_string()),
                _ => Value::Null,
            })
            .collect();
        rows.push(row);
    }
    Ok(SeedFrame { columns, rows })
}

/// Rows from a list of JSON objects. Columns appear in first-seen order.
fn frame_from_records(records: &[serde_json::Map<String, serde_json::Value>]) -> SeedFrame {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            let key = key.to_lowercase();
            if !columns.contains(&key) {
                columns.push(key);
            }
        }
    }
    let rows = records
        .iter()
        .map(|record| {
            let lowered: Vec<(String, &serde_json::Value)> =
                record.iter().map(|(k, v)| (k.to_lowercase(), v)).collect();
            columns
                .iter()
                .map(|c| {
                    lowered
                        .iter()
                        .find(|(k, _)| k == c)
                        .map_or(Value::Null, |(_, v)| json_to_cell(v))
                })
                .collect()
        })
        .collect();
    SeedFrame { columns, rows }
}

/// Accepts an array of objects, a single object, an object of equal-length
/// column arrays, or newline-delimited objects.
pub fn parse_json(text: &str) -> BankResult<SeedFrame> {
    use serde_json::Value as J;

    match serde_json::from_str::<J>(text) {
        Ok(J::Array(items)) => {
            let records = items
                .into_iter()
                .map(|item| match item {
                    J::Object(map) => Ok(map),
                    other => Err(BankError::invalid(format!(
                        "expected an object per record, got {other}"
                    ))),
                })
                .collect::<BankResult<Vec<_>>>()?;
            Ok(frame_from_records(&records))
        }
        Ok(J::Object(map)) if !map.is_empty() && map.values().all(J::is_array) => {
            let len = map
                .values()
                .filter_map(J::as_array)
                .map(Vec::len)
                .max()
                .unwrap_or(0);
            let records = (0..len)
                .map(|i| {
                    map.iter()
                        .map(|(k, v)| {
                            let cell = v.as_array().and_then(|a| a.get(i)).cloned();
                            (k.clone(), cell.unwrap_or(J::Null))
                        })
                        .collect()
                })
                .collect::<Vec<serde_json::Map<String, J>>>();
            Ok(frame_from_records(&records))
        }
        Ok(J::Object(map)) => Ok(frame_from_records(&[map])),
        Ok(other) => Err(BankError::invalid(format!(
            "unsupported JSON seed structure: {other}"
        ))),
        Err(_) => {
            let records = text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|line| match serde_json::from_str::<J>(line)? {
                    J::Object(map) => Ok(map),
                    other => Err(BankError::invalid(format!(
                        "expected one object per line, got {other}"
                    ))),
                })
                .collect::<BankResult<Vec<_>>>()?;
            Ok(frame_from_records(&records))
        }
    }
}

pub fn read_frame(path: &Path) -> BankResult<SeedFrame> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    match ext.as_deref() {
        Some("csv") => read_csv(path),
        Some("json") => parse_json(&std::fs::read_to_string(path)?),
        _ => Err(BankError::invalid(format!(
            "unsupported seed file type: {}",
            path.display()
        ))),
    }
}

// ── Transformation ────────────────────────────────────────────────────────

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
];
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y", "%d.%m.%Y"];

/// Any recognised date or timestamp, reduced to `YYYY-MM-DD`.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let date = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        })?;
    Some(date.format(DATE_FORMAT).to_string())
}

fn is_temporal(column: &str) -> bool {
    column.contains("date") || column.contains("time")
}

/// Project a frame onto the table's known columns, normalise dates and
/// drop exact duplicate rows. Returns the static column list, the rows and
/// the number of duplicates dropped.
pub fn shape_for(table: Table, frame: &SeedFrame) -> (Vec<&'static str>, Vec<Vec<Value>>, usize) {
    let mut columns: Vec<&'static str> = Vec::new();
    let mut picks: Vec<usize> = Vec::new();
    for (i, name) in frame.columns.iter().enumerate() {
        match table.column(name) {
            Some(col) if !columns.contains(&col) => {
                columns.push(col);
                picks.push(i);
            }
            Some(col) => debug!("{table}: duplicate column '{name}' ({col}) ignored"),
            None => debug!("{table}: unknown column '{name}' ignored"),
        }
    }

    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    let mut duplicates = 0;
    for raw in &frame.rows {
        let row: Vec<Value> = picks
            .iter()
            .zip(&columns)
            .map(|(&i, col)| {
                let cell = raw.get(i).cloned().unwrap_or(Value::Null);
                if !is_temporal(col) {
                    return cell;
                }
                match &cell {
                    Value::Text(s) => normalize_date(s).map_or(Value::Null, Value::Text),
                    _ => Value::Null,
                }
            })
            .collect();
        if seen.insert(format!("{row:?}")) {
            rows.push(row);
        } else {
            duplicates += 1;
        }
    }
    (columns, rows, duplicates)
}

// ── Load ──────────────────────────────────────────────────────────────────

fn load_table(store: &BankStore, table: Table, path: &Path) -> BankResult<SeedOutcome> {
    let frame = read_frame(path)?;
    let (columns, rows, duplicates) = shape_for(table, &frame);
    if columns.is_empty() {
        return Err(BankError::invalid(format!(
            "{} has no columns matching {table}",
            path.display()
        )));
    }
    let count = rows.len();
    store.atomically(|s| {
        for row in rows {
            s.insert_values(table, &columns, row)?;
        }
        Ok(())
    })?;
    Ok(SeedOutcome::Loaded { rows: count, duplicates_dropped: duplicates })
}

/// Load every seed file found in `dir`. Foreign keys are off for the
/// duration so tables can arrive in file order; they are switched back on
/// before returning, including on error.
pub fn load_dir(store: &BankStore, dir: &Path) -> BankResult<SeedReport> {
    store.set_foreign_keys(false)?;
    let mut report = SeedReport::default();
    for (file, table) in SEED_FILES {
        let path: PathBuf = dir.join(file);
        let outcome = if !path.exists() {
            warn!("seed file {} not found, {table} left as is", path.display());
            SeedOutcome::Missing
        } else {
            match load_table(store, table, &path) {
                Ok(outcome) => {
                    if let SeedOutcome::Loaded { rows, duplicates_dropped } = &outcome {
                        info!("loaded {rows} records into {table} ({duplicates_dropped} duplicates dropped)");
                    }
                    outcome
                }
                Err(e) => {
                    warn!("skipping {table}: {e}");
                    SeedOutcome::Skipped { reason: e.to_string() }
                }
            }
        };
        report.tables.push(TableSeed {
            table,
            file: file.to_string(),
            outcome,
        });
    }
    store.set_foreign_keys(true)?;
    Ok(report)
}
