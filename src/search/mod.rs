//! Paginated search over sensor readings and action history.
//!
//! Compiles the raw query surface (`date`/`fromDate`/`toDate`, `metric`,
//! `valueOp`/`value`/`valueTo`/`tolerance`, `page`/`size`/`sort`) into store
//! predicates, executes it, and wraps the page in a `PagedResponse` whose
//! items are renumbered 1-based over the *full* result set.

use crate::model::{format_display, ActionRecord, DeviceState, SensorMetric, SensorReading};
use crate::query::{
    compile_value_filter, parse_date_time, DateParseError, FilterError, TimeRange,
};
use crate::store::{HistoryFilter, PageRows, ReadingFilter, Store, ValuePredicate};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Raw query surface shared by the reading and history searches.
#[derive(Clone, Debug, Default)]
pub struct SearchParams {
    pub date: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub metric: SensorMetric,
    pub value_op: Option<String>,
    pub value: Option<f64>,
    pub value_to: Option<f64>,
    pub tolerance: Option<f64>,
    pub page: u64,
    pub size: u64,
    pub sort: Option<String>,
}

/// Additional history-only filters.
#[derive(Clone, Debug, Default)]
pub struct HistoryParams {
    pub base: SearchParams,
    pub device_name: Option<String>,
    pub action: Option<DeviceState>,
}

/// Search failures, all surfaced synchronously to the caller. An empty
/// result set is never one of these.
#[derive(Debug)]
pub enum SearchError {
    InvalidDate(DateParseError),
    InvalidFilter(FilterError),
    Storage(anyhow::Error),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::InvalidDate(e) => write!(f, "{}", e),
            SearchError::InvalidFilter(e) => write!(f, "{}", e),
            SearchError::Storage(e) => write!(f, "storage failure: {}", e),
        }
    }
}

impl std::error::Error for SearchError {}

impl From<DateParseError> for SearchError {
    fn from(e: DateParseError) -> Self {
        SearchError::InvalidDate(e)
    }
}

impl From<FilterError> for SearchError {
    fn from(e: FilterError) -> Self {
        SearchError::InvalidFilter(e)
    }
}

/// Paging envelope. Field wording and casing are part of the API contract —
/// downstream UIs key off `message` content.
#[derive(Clone, Debug, Serialize)]
pub struct PagedResponse<T> {
    pub message: String,
    pub data: Vec<T>,
    #[serde(rename = "currentPage")]
    pub current_page: u64,
    #[serde(rename = "pageSize")]
    pub page_size: u64,
    #[serde(rename = "totalElements")]
    pub total_elements: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

/// One reading as served: `seq` is its 1-based position in the full result
/// set, not within the page.
#[derive(Clone, Debug, Serialize)]
pub struct ReadingItem {
    pub seq: u64,
    #[serde(rename = "deviceId")]
    pub device_id: i64,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light: Option<f64>,
    #[serde(rename = "recordedAt")]
    pub recorded_at: String,
}

/// One action-history row as served.
#[derive(Clone, Debug, Serialize)]
pub struct ActionItem {
    pub seq: u64,
    #[serde(rename = "deviceId")]
    pub device_id: i64,
    #[serde(rename = "deviceName")]
    pub device_name: String,
    pub action: DeviceState,
    #[serde(rename = "executedAt")]
    pub executed_at: String,
}

/// How the time filter resolved, for message wording.
#[derive(Clone, Debug, PartialEq)]
enum TimeMatch {
    None,
    Exact(String),
    Range(String),
}

pub struct SearchEngine {
    store: Arc<Store>,
}

impl SearchEngine {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Search sensor readings. Empty results are success with a "no data"
    /// message; only malformed filters are errors.
    pub fn search_readings(
        &self,
        params: &SearchParams,
    ) -> Result<PagedResponse<ReadingItem>, SearchError> {
        let (time, time_match) = resolve_time(params)?;
        let value = compile_value_predicate(params)?;
        let has_value_filter = value.is_some();
        let (page, size) = paging(params);

        let filter = ReadingFilter {
            time,
            value,
            ascending: is_ascending(params),
            page,
            size,
        };
        let rows = self.store.search_readings(&filter).map_err(SearchError::Storage)?;

        Ok(envelope(
            rows,
            page,
            size,
            &time_match,
            has_value_filter,
            "No sensor data found.",
            |reading: SensorReading, seq| ReadingItem {
                seq,
                device_id: reading.device_id,
                temperature: reading.temperature,
                humidity: reading.humidity,
                light: reading.light,
                recorded_at: format_display(reading.recorded_at),
            },
        ))
    }

    /// Search action history. Value filters do not apply here; the shared
    /// params carry only the time/sort/paging surface.
    pub fn search_history(
        &self,
        params: &HistoryParams,
    ) -> Result<PagedResponse<ActionItem>, SearchError> {
        let (time, time_match) = resolve_time(&params.base)?;
        let (page, size) = paging(&params.base);

        let filter = HistoryFilter {
            time,
            device_name: params.device_name.clone(),
            action: params.action,
            ascending: is_ascending(&params.base),
            page,
            size,
        };
        let rows = self.store.search_history(&filter).map_err(SearchError::Storage)?;

        Ok(envelope(
            rows,
            page,
            size,
            &time_match,
            false,
            "No action history found.",
            |record: ActionRecord, seq| ActionItem {
                seq,
                device_id: record.device_id,
                device_name: record.device_name,
                action: record.action,
                executed_at: format_display(record.executed_at),
            },
        ))
    }
}

/// Resolve the time filter: `date` wins over `fromDate`/`toDate`; a range
/// needs both sides. Blank strings mean "no filter", which is distinct from
/// an unparseable one.
fn resolve_time(params: &SearchParams) -> Result<(Option<TimeRange>, TimeMatch), SearchError> {
    if let Some(date) = non_blank(&params.date) {
        let range = parse_date_time(date)?;
        let label = date.to_string();
        let matched =
            if range.exact { TimeMatch::Exact(label) } else { TimeMatch::Range(label) };
        return Ok((Some(range), matched));
    }

    if let (Some(from), Some(to)) = (non_blank(&params.from_date), non_blank(&params.to_date)) {
        let from_range = parse_date_time(from)?;
        let to_range = parse_date_time(to)?;
        let combined = TimeRange {
            start: from_range.start,
            end: to_range.end,
            exact: false,
        };
        return Ok((Some(combined), TimeMatch::Range(format!("{} - {}", from, to))));
    }

    Ok((None, TimeMatch::None))
}

/// Compile the value filter, if any. A named metric constrains its own
/// column; ALL compiles one range per concrete metric (each with its own
/// default tolerance) and matches when any of them is in range.
fn compile_value_predicate(params: &SearchParams) -> Result<Option<ValuePredicate>, SearchError> {
    let op = match non_blank(&params.value_op) {
        Some(op) => op,
        None => return Ok(None),
    };

    match params.metric {
        SensorMetric::All => {
            let mut pairs = Vec::with_capacity(SensorMetric::CONCRETE.len());
            for metric in SensorMetric::CONCRETE {
                let range = compile_value_filter(
                    op,
                    params.value,
                    params.value_to,
                    params.tolerance,
                    metric,
                )?;
                // column() is Some for every concrete metric
                if let Some(column) = metric.column() {
                    pairs.push((column, range));
                }
            }
            Ok(Some(ValuePredicate::AnyOf(pairs)))
        }
        metric => {
            let range =
                compile_value_filter(op, params.value, params.value_to, params.tolerance, metric)?;
            let column = metric.column().ok_or(FilterError::MetricRequired)?;
            Ok(Some(ValuePredicate::Single { column, range }))
        }
    }
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn is_ascending(params: &SearchParams) -> bool {
    // anything other than "asc" keeps the legacy most-recent-first order
    params.sort.as_deref().is_some_and(|s| s.eq_ignore_ascii_case("asc"))
}

/// Upper bound on requested page size. Larger values are clamped, never
/// rejected, so an oversized `size` cannot turn into an unbounded query.
pub const MAX_PAGE_SIZE: u64 = 500;

fn paging(params: &SearchParams) -> (u64, u64) {
    (params.page, params.size.clamp(1, MAX_PAGE_SIZE))
}

fn envelope<T, R>(
    rows: PageRows<T>,
    page: u64,
    size: u64,
    time_match: &TimeMatch,
    has_value_filter: bool,
    empty_message: &str,
    map: impl Fn(T, u64) -> R,
) -> PagedResponse<R> {
    let total_pages = rows.total.div_ceil(size);
    let count = rows.rows.len();
    // page and size come from the query string; the offset must not wrap
    let start = page.saturating_mul(size);

    let data: Vec<R> = rows
        .rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| map(row, start.saturating_add(i as u64 + 1)))
        .collect();

    let message = if data.is_empty() {
        empty_message.to_string()
    } else if has_value_filter {
        // value wording wins when both filters are present
        format!("Found {} results matching value filter.", count)
    } else {
        match time_match {
            TimeMatch::Exact(label) => format!("Exact match for {} ({} results)", label, count),
            TimeMatch::Range(label) => format!("Results within {} ({} results)", label, count),
            TimeMatch::None => format!("Found {} results.", count),
        }
    };

    PagedResponse {
        message,
        data,
        current_page: page,
        page_size: size,
        total_elements: rows.total,
        total_pages,
    }
}
