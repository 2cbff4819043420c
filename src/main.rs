use anyhow::{Context, Result};
use pulse::api::devices::{create_devices_router, DevicesAppState};
use pulse::api::history::{create_history_router, HistoryAppState};
use pulse::api::readings::{create_readings_router, ReadingsAppState};
use pulse::api::websocket::{create_ws_router, WsAppState};
use pulse::config::{load_config, PulseConfig};
use pulse::dispatch::CommandDispatcher;
use pulse::fanout::FanOut;
use pulse::ledger::DeviceLedger;
use pulse::mqtt::{MqttPublisher, MqttTransport};
use pulse::router::EventRouter;
use pulse::search::SearchEngine;
use pulse::store::Store;
use pulse::telemetry::TelemetryRecorder;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse=info".into()),
        )
        .init();

    info!("Pulse starting...");

    // Load configuration: PULSE_CONFIG path, or pulse.toml, or defaults
    let config_path =
        std::env::var("PULSE_CONFIG").unwrap_or_else(|_| "pulse.toml".to_string());
    let config = if std::path::Path::new(&config_path).exists() {
        load_config(&config_path)?
    } else {
        warn!(path = %config_path, "Config file not found, using defaults");
        PulseConfig::default()
    };
    info!(
        mqtt_host = %config.mqtt.host,
        storage = %config.storage.path,
        bind = %config.api.bind,
        "Configuration loaded"
    );

    // Storage
    let store =
        Arc::new(Store::open(&config.storage.path).context("Failed to open store")?);
    info!("Store opened");

    // Core components
    let fanout = Arc::new(FanOut::new());
    let ledger = Arc::new(DeviceLedger::new(Arc::clone(&store)));
    let recorder = Arc::new(TelemetryRecorder::new(Arc::clone(&store)));
    let engine = Arc::new(SearchEngine::new(Arc::clone(&store)));

    // Event router: per-topic channels + worker pool
    let router = Arc::new(EventRouter::new(
        Arc::clone(&ledger),
        Arc::clone(&recorder),
        Arc::clone(&fanout),
    ));
    let (router_handle, _workers) =
        router.start(config.router.channel_capacity, config.router.workers);

    // MQTT transport feeding the router
    let transport = MqttTransport::start(&config.mqtt, router_handle)
        .await
        .context("Failed to start MQTT transport")?;

    // Command dispatcher publishing on the same connection
    let publisher = Arc::new(MqttPublisher::new(transport.client()));
    let dispatcher = Arc::new(CommandDispatcher::new(
        Arc::clone(&store),
        publisher,
        config.mqtt.command_topic.clone(),
    ));

    // HTTP surface
    let app = create_devices_router(Arc::new(DevicesAppState {
        ledger: Arc::clone(&ledger),
        dispatcher,
    }))
    .merge(create_readings_router(Arc::new(ReadingsAppState {
        engine: Arc::clone(&engine),
        default_page_size: config.api.default_page_size,
    })))
    .merge(create_history_router(Arc::new(HistoryAppState {
        engine,
        default_page_size: config.api.default_page_size,
    })))
    .merge(create_ws_router(Arc::new(WsAppState { fanout })))
    .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.api.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.api.bind))?;
    info!(bind = %config.api.bind, "API listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "API server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    // Graceful shutdown
    server_handle.abort();
    transport.stop().await;
    info!("Pulse stopped");

    Ok(())
}
