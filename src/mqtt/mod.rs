//! MQTT transport: the broker-facing edge of the system.
//!
//! The transport owns the broker connection and nothing else. Inbound
//! publishes are classified by topic and handed to the router's bounded
//! channels; outbound commands go through [`MqttPublisher`], which is the
//! only implementor of `OutboundPublisher` in production.

mod client;
mod publisher;

pub use client::MqttTransport;
pub use publisher::MqttPublisher;

use serde::Deserialize;

/// Broker connection settings, the `[mqtt]` section of the config file.
#[derive(Clone, Debug, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Outbound command topic.
    #[serde(default = "default_command_topic")]
    pub command_topic: String,
    /// Inbound acknowledgement topic.
    #[serde(default = "default_ack_topic")]
    pub ack_topic: String,
    /// Inbound telemetry topic.
    #[serde(default = "default_telemetry_topic")]
    pub telemetry_topic: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    1883
}

fn default_command_topic() -> String {
    "device_actions".to_string()
}

fn default_ack_topic() -> String {
    "device_actions_ack".to_string()
}

fn default_telemetry_topic() -> String {
    "sensor/data".to_string()
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
            command_topic: default_command_topic(),
            ack_topic: default_ack_topic(),
            telemetry_topic: default_telemetry_topic(),
        }
    }
}
