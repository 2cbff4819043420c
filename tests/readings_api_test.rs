// Integration tests for GET /api/sensor-data[/search]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{NaiveDate, NaiveDateTime};
use pulse::api::readings::{create_readings_router, ReadingsAppState};
use pulse::model::{DeviceState, DeviceType};
use pulse::search::SearchEngine;
use pulse::store::Store;
use std::sync::Arc;
use tower::ServiceExt;

fn ts(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap().and_hms_opt(h, m, s).unwrap()
}

fn create_test_app(readings: u32) -> Router {
    let store = Store::open_in_memory().unwrap();
    let device = store
        .insert_device("sensor", "esp32-sensor-01", DeviceType::SENSOR, DeviceState::ON)
        .unwrap();
    for i in 0..readings {
        store
            .insert_reading(
                device.id,
                Some(20.0 + i as f64),
                Some(40.0),
                None,
                ts(1, 10, 0, i),
            )
            .unwrap();
    }
    let state = ReadingsAppState {
        engine: Arc::new(SearchEngine::new(Arc::new(store))),
        default_page_size: 15,
    };
    create_readings_router(Arc::new(state))
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

/// Items are numbered over the full result set, not within the page.
#[tokio::test]
async fn test_pagination_numbering_is_global() {
    let app = create_test_app(25);
    let (status, body) =
        get_json(app, "/api/sensor-data/search?page=1&size=10&sort=asc").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currentPage"], 1);
    assert_eq!(body["pageSize"], 10);
    assert_eq!(body["totalElements"], 25);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["data"][0]["seq"], 11);
    assert_eq!(body["data"][9]["seq"], 20);
}

/// Empty result sets are 200 with a "no data" message, never an error.
#[tokio::test]
async fn test_empty_result_is_success() {
    let app = create_test_app(0);
    let (status, body) = get_json(app, "/api/sensor-data").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No sensor data found.");
    assert_eq!(body["totalElements"], 0);
}

/// An unparseable date is 400 with corrective detail, not an empty page.
#[tokio::test]
async fn test_invalid_date_is_bad_request() {
    let app = create_test_app(3);
    let (status, body) = get_json(app, "/api/sensor-data/search?date=31-02-2024").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("31-02-2024"));
}

/// Exact-second dates match a single reading with exact-match wording.
#[tokio::test]
async fn test_exact_second_date_match() {
    let app = create_test_app(5);
    let (status, body) =
        get_json(app, "/api/sensor-data/search?date=01-03-2024%2010:00:02").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalElements"], 1);
    assert!(body["message"].as_str().unwrap().starts_with("Exact match"));
    assert_eq!(body["data"][0]["recordedAt"], "01-03-2024 10:00:02");
}

/// Value filter on a named metric narrows results and drives wording.
#[tokio::test]
async fn test_value_filter_on_named_metric() {
    let app = create_test_app(5);
    let (status, body) = get_json(
        app,
        "/api/sensor-data/search?metric=TEMP&valueOp=gte&value=22.0",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    // readings 22, 23, 24
    assert_eq!(body["totalElements"], 3);
    assert!(body["message"].as_str().unwrap().contains("value filter"));
}

/// ALL metric plus a value filter matches when any field is in range.
#[tokio::test]
async fn test_all_metric_with_value_filter() {
    let app = create_test_app(5);
    let (status, body) =
        get_json(app, "/api/sensor-data/search?metric=ALL&valueOp=eq&value=40.0").await;

    assert_eq!(status, StatusCode::OK);
    // every reading has humidity 40.0
    assert_eq!(body["totalElements"], 5);
}

/// between with inverted bounds is rejected.
#[tokio::test]
async fn test_inverted_between_is_bad_request() {
    let app = create_test_app(5);
    let (status, _) = get_json(
        app,
        "/api/sensor-data/search?metric=TEMP&valueOp=between&value=30&valueTo=20",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Unknown metric names are rejected before the engine runs.
#[tokio::test]
async fn test_unknown_metric_is_bad_request() {
    let app = create_test_app(1);
    let (status, _) = get_json(app, "/api/sensor-data/search?metric=PRESSURE").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Extreme page/size query values are served, not a panic or a full scan:
/// an out-of-range page is an empty 200 and an oversized size is clamped.
#[tokio::test]
async fn test_extreme_paging_params_are_handled() {
    let app = create_test_app(3);
    let (status, body) = get_json(
        app,
        "/api/sensor-data/search?page=18446744073709551615&size=10",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
    assert_eq!(body["totalElements"], 3);

    let app = create_test_app(3);
    let (status, body) =
        get_json(app, "/api/sensor-data/search?size=18446744073709551615").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pageSize"], 500);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

/// Default sort is most recent first.
#[tokio::test]
async fn test_default_sort_descending() {
    let app = create_test_app(3);
    let (status, body) = get_json(app, "/api/sensor-data").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["recordedAt"], "01-03-2024 10:00:02");
    assert_eq!(body["data"][2]["recordedAt"], "01-03-2024 10:00:00");
}
