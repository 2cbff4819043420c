// Integration tests for GET /api/devices and POST /api/devices/command

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use pulse::api::devices::{create_devices_router, DevicesAppState};
use pulse::dispatch::{CommandDispatcher, OutboundPublisher};
use pulse::ledger::DeviceLedger;
use pulse::model::{DeviceState, DeviceType};
use pulse::store::Store;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Records published messages instead of touching a broker.
struct RecordingPublisher {
    sent: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingPublisher {
    fn new() -> Self {
        Self { sent: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl OutboundPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.sent.lock().unwrap().push((topic.to_string(), payload));
        Ok(())
    }
}

fn create_test_app() -> (Router, Arc<Store>, Arc<RecordingPublisher>) {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let publisher = Arc::new(RecordingPublisher::new());
    let state = DevicesAppState {
        ledger: Arc::new(DeviceLedger::new(Arc::clone(&store))),
        dispatcher: Arc::new(CommandDispatcher::new(
            Arc::clone(&store),
            publisher.clone(),
            "device_actions",
        )),
    };
    (create_devices_router(Arc::new(state)), store, publisher)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_device_snapshot() {
    let (app, store, _) = create_test_app();
    let lamp = store
        .insert_device("lamp", "esp32-lamp-01", DeviceType::LED, DeviceState::OFF)
        .unwrap();
    let seen = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
    store.record_ack(lamp.id, DeviceState::ON, seen).unwrap();

    let response = app
        .oneshot(
            Request::builder().method("GET").uri("/api/devices").body(Body::empty()).unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "lamp");
    assert_eq!(body[0]["deviceUid"], "esp32-lamp-01");
    assert_eq!(body[0]["deviceType"], "LED");
    assert_eq!(body[0]["state"], "ON");
    assert_eq!(body[0]["lastSeenAt"], "01-03-2024 09:00:00");
}

#[tokio::test]
async fn test_command_dispatch_returns_correlation_id() {
    let (app, store, publisher) = create_test_app();
    let lamp = store
        .insert_device("lamp", "esp32-lamp-01", DeviceType::LED, DeviceState::OFF)
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/devices/command")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({"deviceId": lamp.id, "action": "ON"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let correlation_id = body["correlationId"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(correlation_id).is_ok());

    // exactly one command message on the command topic, carrying the same id
    let sent = publisher.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "device_actions");
    let payload: serde_json::Value = serde_json::from_slice(&sent[0].1).unwrap();
    assert_eq!(payload["deviceId"], lamp.id);
    assert_eq!(payload["action"], "ON");
    assert_eq!(payload["correlationId"], correlation_id);
}

#[tokio::test]
async fn test_command_unknown_device_is_not_found() {
    let (app, _, publisher) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/devices/command")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({"deviceId": 999, "action": "ON"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(publisher.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_command_unknown_action_is_bad_request() {
    let (app, store, publisher) = create_test_app();
    let lamp = store
        .insert_device("lamp", "esp32-lamp-01", DeviceType::LED, DeviceState::OFF)
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/devices/command")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({"deviceId": lamp.id, "action": "DIMMED"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(publisher.sent.lock().unwrap().is_empty());
}
