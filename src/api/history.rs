use crate::api::error_response;
use crate::model::DeviceState;
use crate::search::{ActionItem, HistoryParams, PagedResponse, SearchEngine, SearchParams};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Shared state for the action-history API
pub struct HistoryAppState {
    pub engine: Arc<SearchEngine>,
    pub default_page_size: u64,
}

/// Query parameters for history search
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub date: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub device_name: Option<String>,
    /// ON | OFF | UNKNOWN
    pub action: Option<String>,
    pub page: Option<u64>,
    pub size: Option<u64>,
    pub sort: Option<String>,
}

/// Create action-history API router
pub fn create_history_router(state: Arc<HistoryAppState>) -> Router {
    Router::new()
        .route("/api/device-actions", get(search_history))
        .route("/api/device-actions/search", get(search_history))
        .with_state(state)
}

/// GET /api/device-actions[/search]?date=..&deviceName=..&action=..
async fn search_history(
    State(state): State<Arc<HistoryAppState>>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let action = match &query.action {
        Some(raw) => match raw.parse::<DeviceState>() {
            Ok(action) => Some(action),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        },
        None => None,
    };

    let params = HistoryParams {
        base: SearchParams {
            date: query.date,
            from_date: query.from_date,
            to_date: query.to_date,
            page: query.page.unwrap_or(0),
            size: query.size.unwrap_or(state.default_page_size),
            sort: query.sort,
            ..Default::default()
        },
        device_name: query.device_name,
        action,
    };

    match state.engine.search_history(&params) {
        Ok(page) => Json::<PagedResponse<ActionItem>>(page).into_response(),
        Err(e) => e.into_response(),
    }
}
