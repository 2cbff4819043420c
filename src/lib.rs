// Configuration loading
pub mod config;

// Domain types and timestamp formats
pub mod model;

// Temporal query parser and value-range filter compiler
pub mod query;

// Paginated search over readings and history
pub mod search;

// SQLite persistence
pub mod store;

// Device state and action history
pub mod ledger;

// Sensor reading ingestion
pub mod telemetry;

// Outbound command dispatch
pub mod dispatch;

// Inbound message routing: channels, workers, decode/classify
pub mod router;

// Real-time broadcast to WebSocket subscribers
pub mod fanout;

// MQTT transport
pub mod mqtt;

// HTTP and WebSocket APIs
pub mod api;

// WebSocket subscription management
pub mod subscription;
