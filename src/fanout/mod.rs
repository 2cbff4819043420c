use crate::model::DeviceState;
use serde::Serialize;
use tokio::sync::broadcast;

/// Normalized device-state update, broadcast after an ack is applied.
///
/// `recorded_at` is always the uniform `dd-MM-yyyy HH:mm:ss` string,
/// whatever the inbound wire payload carried.
#[derive(Clone, Debug, Serialize)]
pub struct DeviceUpdate {
    #[serde(rename = "deviceId")]
    pub device_id: i64,
    pub state: DeviceState,
    #[serde(rename = "correlationId")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(rename = "recordedAt")]
    pub recorded_at: String,
}

/// Normalized sensor-reading update, broadcast after telemetry persists.
#[derive(Clone, Debug, Serialize)]
pub struct SensorUpdate {
    #[serde(rename = "deviceUid")]
    pub device_uid: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light: Option<f64>,
    #[serde(rename = "recordedAt")]
    pub recorded_at: String,
}

/// Best-effort fan-out to live subscribers. No persistence, no delivery
/// guarantee; zero subscribers is the normal idle state.
pub struct FanOut {
    device_tx: broadcast::Sender<DeviceUpdate>,
    sensor_tx: broadcast::Sender<SensorUpdate>,
}

impl FanOut {
    pub fn new() -> Self {
        let (device_tx, _) = broadcast::channel(256);
        let (sensor_tx, _) = broadcast::channel(256);
        Self { device_tx, sensor_tx }
    }

    /// Broadcast a device-state update. Send errors (no receivers) are
    /// swallowed — a delivery failure is never the caller's problem.
    pub fn broadcast_device(&self, update: DeviceUpdate) {
        let _ = self.device_tx.send(update);
    }

    /// Broadcast a sensor-reading update.
    pub fn broadcast_sensor(&self, update: SensorUpdate) {
        let _ = self.sensor_tx.send(update);
    }

    pub fn subscribe_devices(&self) -> broadcast::Receiver<DeviceUpdate> {
        self.device_tx.subscribe()
    }

    pub fn subscribe_sensors(&self) -> broadcast::Receiver<SensorUpdate> {
        self.sensor_tx.subscribe()
    }
}

impl Default for FanOut {
    fn default() -> Self {
        Self::new()
    }
}
