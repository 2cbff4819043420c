use crate::fanout::{DeviceUpdate, SensorUpdate};
use serde::{Deserialize, Serialize};

/// The two live streams a client can subscribe to.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StreamChannel {
    Devices,
    Sensors,
}

/// Client → Server message types
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "subscribe")]
    Subscribe { channel: StreamChannel },
    #[serde(rename = "unsubscribe")]
    Unsubscribe { channel: StreamChannel },
}

/// Server → Client: device state changed
#[derive(Debug, Clone, Serialize)]
pub struct DeviceUpdateMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(flatten)]
    pub update: DeviceUpdate,
}

impl From<DeviceUpdate> for DeviceUpdateMessage {
    fn from(update: DeviceUpdate) -> Self {
        Self {
            msg_type: "device_update".to_string(),
            update,
        }
    }
}

/// Server → Client: new sensor reading
#[derive(Debug, Clone, Serialize)]
pub struct SensorUpdateMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(flatten)]
    pub update: SensorUpdate,
}

impl From<SensorUpdate> for SensorUpdateMessage {
    fn from(update: SensorUpdate) -> Self {
        Self {
            msg_type: "sensor_update".to_string(),
            update,
        }
    }
}

/// Server → Client: Error message
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub error: String,
}

impl ErrorMessage {
    pub fn new(error: String) -> Self {
        Self {
            msg_type: "error".to_string(),
            error,
        }
    }
}
