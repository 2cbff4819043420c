use super::{column_timestamp, push_value_predicate, PageRows, Store, ValuePredicate};
use crate::model::{format_storage, SensorReading};
use crate::query::TimeRange;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Row};

/// Predicates + paging for one reading search, fully compiled by the
/// search engine before it reaches storage.
#[derive(Clone, Debug, Default)]
pub struct ReadingFilter {
    pub time: Option<TimeRange>,
    pub value: Option<ValuePredicate>,
    pub ascending: bool,
    pub page: u64,
    pub size: u64,
}

fn reading_from_row(row: &Row<'_>) -> rusqlite::Result<SensorReading> {
    Ok(SensorReading {
        id: row.get(0)?,
        device_id: row.get(1)?,
        temperature: row.get(2)?,
        humidity: row.get(3)?,
        light: row.get(4)?,
        recorded_at: column_timestamp(5, row.get::<_, String>(5)?)?,
    })
}

impl Store {
    /// Persist one reading. Metric normalization (the `-1` sentinel) happens
    /// upstream in the telemetry recorder; storage writes what it is given.
    pub fn insert_reading(
        &self,
        device_id: i64,
        temperature: Option<f64>,
        humidity: Option<f64>,
        light: Option<f64>,
        recorded_at: NaiveDateTime,
    ) -> Result<SensorReading> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO sensor_reading (device_id, temperature, humidity, light, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![device_id, temperature, humidity, light, format_storage(recorded_at)],
        )
        .context("Failed to insert sensor reading")?;
        Ok(SensorReading {
            id: conn.last_insert_rowid(),
            device_id,
            temperature,
            humidity,
            light,
            recorded_at,
        })
    }

    /// Execute one compiled reading search: WHERE clauses from the filter,
    /// ORDER BY recorded_at, offset paging, plus the unpaged COUNT.
    pub fn search_readings(&self, filter: &ReadingFilter) -> Result<PageRows<SensorReading>> {
        let mut where_clauses: Vec<String> = Vec::new();
        let mut params: Vec<rusqlite::types::Value> = Vec::new();

        if let Some(range) = &filter.time {
            where_clauses.push("recorded_at >= ?".to_string());
            params.push(format_storage(range.start).into());
            where_clauses.push("recorded_at < ?".to_string());
            params.push(format_storage(range.end).into());
        }
        if let Some(predicate) = &filter.value {
            push_value_predicate(predicate, &mut where_clauses, &mut params);
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_clauses.join(" AND "))
        };
        let direction = if filter.ascending { "ASC" } else { "DESC" };

        let conn = self.lock();

        let total: u64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM sensor_reading{}", where_sql),
                params_from_iter(params.iter()),
                |r| r.get::<_, i64>(0),
            )
            .context("Failed to count sensor readings")? as u64;

        let sql = format!(
            "SELECT id, device_id, temperature, humidity, light, recorded_at
             FROM sensor_reading{}
             ORDER BY recorded_at {dir}, id {dir}
             LIMIT ? OFFSET ?",
            where_sql,
            dir = direction,
        );
        // LIMIT/OFFSET bind as i64; saturate so extreme paging never wraps
        // into a negative (unbounded) LIMIT or a panic
        let limit = filter.size.min(i64::MAX as u64) as i64;
        let offset = filter.page.saturating_mul(filter.size).min(i64::MAX as u64) as i64;
        params.push(rusqlite::types::Value::Integer(limit));
        params.push(rusqlite::types::Value::Integer(offset));

        let mut stmt = conn.prepare(&sql).context("Failed to prepare reading search")?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), reading_from_row)
            .context("Failed to execute reading search")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read result rows")?;

        Ok(PageRows { rows, total })
    }
}
