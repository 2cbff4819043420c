use crate::api::error_response;
use crate::model::SensorMetric;
use crate::search::{PagedResponse, ReadingItem, SearchEngine, SearchParams};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Shared state for the sensor-data API
pub struct ReadingsAppState {
    pub engine: Arc<SearchEngine>,
    pub default_page_size: u64,
}

/// Query parameters for reading search
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingsQuery {
    pub date: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    /// TEMP | HUMIDITY | LIGHT | ALL (default)
    pub metric: Option<String>,
    pub value_op: Option<String>,
    pub value: Option<f64>,
    pub value_to: Option<f64>,
    pub tolerance: Option<f64>,
    pub page: Option<u64>,
    pub size: Option<u64>,
    pub sort: Option<String>,
}

/// Create sensor-data API router
pub fn create_readings_router(state: Arc<ReadingsAppState>) -> Router {
    Router::new()
        .route("/api/sensor-data", get(search_readings))
        .route("/api/sensor-data/search", get(search_readings))
        .with_state(state)
}

/// GET /api/sensor-data[/search]?date=..&fromDate=..&toDate=..&metric=..&valueOp=..
///
/// Paginated reading search. Empty result sets are 200 with a "no data"
/// message; malformed dates and filters are 400.
async fn search_readings(
    State(state): State<Arc<ReadingsAppState>>,
    Query(query): Query<ReadingsQuery>,
) -> Response {
    let metric = match &query.metric {
        Some(raw) => match raw.parse::<SensorMetric>() {
            Ok(metric) => metric,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        },
        None => SensorMetric::All,
    };

    let params = SearchParams {
        date: query.date,
        from_date: query.from_date,
        to_date: query.to_date,
        metric,
        value_op: query.value_op,
        value: query.value,
        value_to: query.value_to,
        tolerance: query.tolerance,
        page: query.page.unwrap_or(0),
        size: query.size.unwrap_or(state.default_page_size),
        sort: query.sort,
    };

    match state.engine.search_readings(&params) {
        Ok(page) => Json::<PagedResponse<ReadingItem>>(page).into_response(),
        Err(e) => e.into_response(),
    }
}
