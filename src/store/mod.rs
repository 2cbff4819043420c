//! SQLite persistence for devices, sensor readings, and action history.
//!
//! # Schema
//! ```sql
//! CREATE TABLE device (
//!     id INTEGER PRIMARY KEY,
//!     name TEXT NOT NULL,
//!     device_uid TEXT NOT NULL UNIQUE,
//!     device_type TEXT NOT NULL,        -- LED | SENSOR | FAN
//!     state TEXT NOT NULL,              -- ON | OFF | UNKNOWN
//!     last_seen_at TEXT                 -- %Y-%m-%d %H:%M:%S
//! );
//! CREATE TABLE device_action_history (
//!     id INTEGER PRIMARY KEY,
//!     device_id INTEGER NOT NULL REFERENCES device(id),
//!     action TEXT NOT NULL,
//!     executed_at TEXT NOT NULL
//! );
//! CREATE TABLE sensor_reading (
//!     id INTEGER PRIMARY KEY,
//!     device_id INTEGER NOT NULL REFERENCES device(id),
//!     temperature REAL,
//!     humidity REAL,
//!     light REAL,
//!     recorded_at TEXT NOT NULL
//! );
//! ```
//!
//! Timestamps are TEXT in a sortable format, so range predicates compare
//! correctly without SQLite date functions.
//!
//! # Thread Safety
//! The connection is wrapped in a Mutex; SQLite itself runs in serialized
//! mode. Read-path searches and write-path ingestion contend only on that
//! lock, never on application state. Statements are short and indexed and
//! callers run them directly from async tasks; at higher ingestion volumes
//! they belong behind `spawn_blocking`.

mod devices;
mod history;
mod readings;

pub use history::HistoryFilter;
pub use readings::ReadingFilter;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::Connection;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

/// One page of rows plus the unpaged total, as the storage layer sees it.
#[derive(Debug)]
pub struct PageRows<T> {
    pub rows: Vec<T>,
    pub total: u64,
}

/// Compiled value predicate handed down by the search engine. Infinite
/// bounds are omitted from the generated SQL entirely.
#[derive(Clone, Debug)]
pub enum ValuePredicate {
    /// One metric column constrained to a range (ANDed with other clauses).
    Single { column: &'static str, range: crate::query::ValueRange },
    /// Any of several column/range pairs may match (ORed as one group).
    AnyOf(Vec<(&'static str, crate::query::ValueRange)>),
}

/// Device, reading, and history persistence behind one SQLite connection.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `path` and ensure the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open database")?;
        Self::with_connection(conn)
    }

    /// In-memory store, used by unit tests and fixtures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS device (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                device_uid TEXT NOT NULL UNIQUE,
                device_type TEXT NOT NULL,
                state TEXT NOT NULL,
                last_seen_at TEXT
            );
            CREATE TABLE IF NOT EXISTS device_action_history (
                id INTEGER PRIMARY KEY,
                device_id INTEGER NOT NULL REFERENCES device(id),
                action TEXT NOT NULL,
                executed_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sensor_reading (
                id INTEGER PRIMARY KEY,
                device_id INTEGER NOT NULL REFERENCES device(id),
                temperature REAL,
                humidity REAL,
                light REAL,
                recorded_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_reading_recorded_at
                ON sensor_reading(recorded_at);
            CREATE INDEX IF NOT EXISTS idx_history_executed_at
                ON device_action_history(executed_at);
            "#,
        )
        .context("Failed to create schema")?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    pub(crate) fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // Poisoning only happens if a holder panicked mid-statement; there is
        // no partial state to salvage, so propagate the panic.
        self.conn.lock().unwrap()
    }
}

/// Map a stored timestamp column back to a NaiveDateTime.
pub(crate) fn column_timestamp(idx: usize, raw: String) -> rusqlite::Result<NaiveDateTime> {
    crate::model::parse_storage(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("bad timestamp '{}'", raw).into(),
        )
    })
}

/// Map a stored enum column back through its FromStr impl.
pub(crate) fn column_enum<T>(idx: usize, raw: String) -> rusqlite::Result<T>
where
    T: FromStr<Err = crate::model::UnknownVariant>,
{
    raw.parse().map_err(|e: crate::model::UnknownVariant| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })
}

/// Append a value-range group to `where_clauses`/`params`.
///
/// NULL metric columns fall out naturally: any comparison with NULL is not
/// true, so unreported metrics never match a value filter.
pub(crate) fn push_value_predicate(
    predicate: &ValuePredicate,
    where_clauses: &mut Vec<String>,
    params: &mut Vec<rusqlite::types::Value>,
) {
    match predicate {
        ValuePredicate::Single { column, range } => {
            if let Some(clause) = range_clause(column, range, params) {
                where_clauses.push(clause);
            }
        }
        ValuePredicate::AnyOf(pairs) => {
            let alternatives: Vec<String> = pairs
                .iter()
                .filter_map(|(column, range)| range_clause(column, range, params))
                .collect();
            if !alternatives.is_empty() {
                where_clauses.push(format!("({})", alternatives.join(" OR ")));
            }
        }
    }
}

fn range_clause(
    column: &str,
    range: &crate::query::ValueRange,
    params: &mut Vec<rusqlite::types::Value>,
) -> Option<String> {
    let mut parts = Vec::new();
    if range.from.is_finite() {
        parts.push(format!("{} {} ?", column, if range.include_from { ">=" } else { ">" }));
        params.push(rusqlite::types::Value::Real(range.from));
    }
    if range.to.is_finite() {
        parts.push(format!("{} {} ?", column, if range.include_to { "<=" } else { "<" }));
        params.push(rusqlite::types::Value::Real(range.to));
    }
    if parts.is_empty() {
        None
    } else {
        Some(format!("({})", parts.join(" AND ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ValueRange;

    #[test]
    fn open_creates_schema() {
        let store = Store::open_in_memory().unwrap();
        // Schema exists — a query against each table succeeds
        let conn = store.lock();
        for table in ["device", "device_action_history", "sensor_reading"] {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
                .unwrap();
            assert_eq!(count, 0);
        }
    }

    #[test]
    fn open_is_idempotent_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse.db");
        Store::open(&path).unwrap();
        // Reopening an existing database must not fail on CREATE TABLE
        Store::open(&path).unwrap();
    }

    #[test]
    fn infinite_bounds_are_omitted_from_sql() {
        let mut clauses = Vec::new();
        let mut params = Vec::new();
        let range =
            ValueRange { from: 5.0, to: f64::INFINITY, include_from: false, include_to: false };
        push_value_predicate(
            &ValuePredicate::Single { column: "temperature", range },
            &mut clauses,
            &mut params,
        );
        assert_eq!(clauses, vec!["(temperature > ?)".to_string()]);
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn any_of_predicate_builds_or_group() {
        let mut clauses = Vec::new();
        let mut params = Vec::new();
        let range = ValueRange { from: 1.0, to: 2.0, include_from: true, include_to: true };
        push_value_predicate(
            &ValuePredicate::AnyOf(vec![("temperature", range), ("humidity", range)]),
            &mut clauses,
            &mut params,
        );
        assert_eq!(clauses.len(), 1);
        assert!(clauses[0].contains(" OR "));
        assert_eq!(params.len(), 4);
    }
}
