use super::{column_enum, column_timestamp, PageRows, Store};
use crate::model::{format_storage, ActionRecord, DeviceState};
use anyhow::{Context, Result};
use rusqlite::{params_from_iter, Row};

/// Predicates + paging for one action-history search.
#[derive(Clone, Debug, Default)]
pub struct HistoryFilter {
    pub time: Option<crate::query::TimeRange>,
    pub device_name: Option<String>,
    pub action: Option<DeviceState>,
    pub ascending: bool,
    pub page: u64,
    pub size: u64,
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ActionRecord> {
    Ok(ActionRecord {
        id: row.get(0)?,
        device_id: row.get(1)?,
        device_name: row.get(2)?,
        action: column_enum(3, row.get::<_, String>(3)?)?,
        executed_at: column_timestamp(4, row.get::<_, String>(4)?)?,
    })
}

impl Store {
    /// Execute one compiled history search. History rows join their device
    /// for the name filter and the response payload.
    pub fn search_history(&self, filter: &HistoryFilter) -> Result<PageRows<ActionRecord>> {
        let mut where_clauses: Vec<String> = Vec::new();
        let mut params: Vec<rusqlite::types::Value> = Vec::new();

        if let Some(range) = &filter.time {
            where_clauses.push("h.executed_at >= ?".to_string());
            params.push(format_storage(range.start).into());
            where_clauses.push("h.executed_at < ?".to_string());
            params.push(format_storage(range.end).into());
        }
        if let Some(name) = &filter.device_name {
            where_clauses.push("d.name = ?".to_string());
            params.push(name.clone().into());
        }
        if let Some(action) = filter.action {
            where_clauses.push("h.action = ?".to_string());
            params.push(action.to_string().into());
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
                &format!(
                    "SELECT COUNT(*) FROM device_action_history h
                     JOIN device d ON d.id = h.device_id{}",
                    where_sql
                ),
                params_from_iter(params.iter()),
                |r| r.get::<_, i64>(0),
            )
            .context("Failed to count action history")? as u64;

        let sql = format!(
            "SELECT h.id, h.device_id, d.name, h.action, h.executed_at
             FROM device_action_history h
             JOIN device d ON d.id = h.device_id{}
             ORDER BY h.executed_at {dir}, h.id {dir}
             LIMIT ? OFFSET ?",
            where_sql,
            dir = direction,
        );
        // LIMIT/OFFSET bind as i64; saturate so extreme paging never wraps
        let limit = filter.size.min(i64::MAX as u64) as i64;
        let offset = filter.page.saturating_mul(filter.size).min(i64::MAX as u64) as i64;
        params.push(rusqlite::types::Value::Integer(limit));
        params.push(rusqlite::types::Value::Integer(offset));

        let mut stmt = conn.prepare(&sql).context("Failed to prepare history search")?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), record_from_row)
            .context("Failed to execute history search")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read history rows")?;

        Ok(PageRows { rows, total })
    }
}
