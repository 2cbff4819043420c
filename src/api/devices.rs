use crate::api::error_response;
use crate::dispatch::{CommandDispatcher, DispatchError};
use crate::ledger::DeviceLedger;
use crate::model::{format_display, Device, DeviceState, DeviceType};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Shared state for the devices API
pub struct DevicesAppState {
    pub ledger: Arc<DeviceLedger>,
    pub dispatcher: Arc<CommandDispatcher>,
}

/// One device as served: timestamps in the uniform display format.
#[derive(Serialize)]
pub struct DeviceView {
    pub id: i64,
    pub name: String,
    #[serde(rename = "deviceUid")]
    pub device_uid: String,
    #[serde(rename = "deviceType")]
    pub device_type: DeviceType,
    pub state: DeviceState,
    #[serde(rename = "lastSeenAt")]
    pub last_seen_at: Option<String>,
}

impl From<Device> for DeviceView {
    fn from(device: Device) -> Self {
        Self {
            id: device.id,
            name: device.name,
            device_uid: device.device_uid,
            device_type: device.device_type,
            state: device.state,
            last_seen_at: device.last_seen_at.map(format_display),
        }
    }
}

/// POST /api/devices/command request body
#[derive(Deserialize)]
pub struct CommandRequest {
    #[serde(rename = "deviceId")]
    pub device_id: i64,
    pub action: String,
}

#[derive(Serialize)]
struct CommandResponse {
    #[serde(rename = "correlationId")]
    correlation_id: String,
}

/// Create devices API router
pub fn create_devices_router(state: Arc<DevicesAppState>) -> Router {
    Router::new()
        .route("/api/devices", get(list_devices))
        .route("/api/devices/command", post(send_command))
        .with_state(state)
}

/// GET /api/devices — current snapshot of every device.
async fn list_devices(State(state): State<Arc<DevicesAppState>>) -> Response {
    match state.ledger.snapshot() {
        Ok(devices) => {
            let views: Vec<DeviceView> = devices.into_iter().map(DeviceView::from).collect();
            Json(views).into_response()
        }
        Err(e) => {
            error!(error = %e, "Device snapshot failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage failure")
        }
    }
}

/// POST /api/devices/command — dispatch a control intent, returning the
/// correlation id for matching the eventual ack on the fan-out.
async fn send_command(
    State(state): State<Arc<DevicesAppState>>,
    Json(request): Json<CommandRequest>,
) -> Response {
    let action = match request.action.parse::<DeviceState>() {
        Ok(action) => action,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match state.dispatcher.dispatch(request.device_id, action).await {
        Ok(correlation_id) => Json(CommandResponse {
            correlation_id: correlation_id.to_string(),
        })
        .into_response(),
        Err(DispatchError::DeviceNotFound(id)) => {
            error_response(StatusCode::NOT_FOUND, format!("device not found: {}", id))
        }
        Err(e) => {
            error!(error = %e, "Command dispatch failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "dispatch failure")
        }
    }
}
