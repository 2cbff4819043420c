use crate::model::{normalize_metric, SensorReading};
use crate::store::Store;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;

/// Telemetry Recorder: persists one sensor reading per inbound telemetry
/// event for a known device.
pub struct TelemetryRecorder {
    store: Arc<Store>,
}

#[derive(Debug)]
pub enum RecorderError {
    DeviceNotFound(String),
    Storage(anyhow::Error),
}

impl fmt::Display for RecorderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecorderError::DeviceNotFound(uid) => write!(f, "device not found: {}", uid),
            RecorderError::Storage(e) => write!(f, "storage failure: {}", e),
        }
    }
}

impl std::error::Error for RecorderError {}

impl TelemetryRecorder {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Persist one reading. The `-1` sentinel on any metric means "not
    /// measured" and is normalized to absent before persistence.
    /// `recorded_at` is server-assigned — devices are not trusted clocks.
    pub fn record(
        &self,
        device_uid: &str,
        temperature: Option<f64>,
        humidity: Option<f64>,
        light: Option<f64>,
    ) -> Result<SensorReading, RecorderError> {
        let device = self
            .store
            .find_device_by_uid(device_uid)
            .map_err(RecorderError::Storage)?
            .ok_or_else(|| RecorderError::DeviceNotFound(device_uid.to_string()))?;

        self.store
            .insert_reading(
                device.id,
                normalize_metric(temperature),
                normalize_metric(humidity),
                normalize_metric(light),
                Utc::now().naive_utc(),
            )
            .map_err(RecorderError::Storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DeviceState, DeviceType};

    fn recorder() -> (TelemetryRecorder, Arc<Store>) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        store
            .insert_device("sensor", "esp32-sensor-01", DeviceType::SENSOR, DeviceState::ON)
            .unwrap();
        (TelemetryRecorder::new(store.clone()), store)
    }

    #[test]
    fn sentinel_metric_persists_as_absent() {
        let (recorder, _) = recorder();
        let reading = recorder
            .record("esp32-sensor-01", Some(-1.0), Some(40.5), None)
            .unwrap();
        assert_eq!(reading.temperature, None);
        assert_eq!(reading.humidity, Some(40.5));
        assert_eq!(reading.light, None);
    }

    #[test]
    fn unknown_uid_is_rejected() {
        let (recorder, _) = recorder();
        assert!(matches!(
            recorder.record("ghost", Some(1.0), None, None),
            Err(RecorderError::DeviceNotFound(_))
        ));
    }

    #[test]
    fn recorded_at_is_server_assigned() {
        let (recorder, _) = recorder();
        let before = Utc::now().naive_utc();
        let reading = recorder.record("esp32-sensor-01", Some(20.0), None, None).unwrap();
        let after = Utc::now().naive_utc();
        assert!(reading.recorded_at >= before - chrono::Duration::seconds(1));
        assert!(reading.recorded_at <= after + chrono::Duration::seconds(1));
    }
}
