use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display/broadcast timestamp format shared by every outward-facing payload.
///
/// Inbound wire formats vary; everything leaving this core (fan-out payloads,
/// API responses) uses this one format.
pub const DISPLAY_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Storage timestamp format. Lexicographically sortable, so SQLite range
/// predicates on TEXT columns compare correctly.
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a timestamp for broadcast/API payloads (dd-MM-yyyy HH:mm:ss).
pub fn format_display(ts: NaiveDateTime) -> String {
    ts.format(DISPLAY_FORMAT).to_string()
}

/// Format a timestamp for storage (sortable).
pub fn format_storage(ts: NaiveDateTime) -> String {
    ts.format(STORAGE_FORMAT).to_string()
}

/// Parse a storage-format timestamp back into a NaiveDateTime.
pub fn parse_storage(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, STORAGE_FORMAT).ok()
}

/// Device on/off state. Also the action recorded in history rows — an ack
/// always reports the state the device switched to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceState {
    ON,
    OFF,
    UNKNOWN,
}

impl FromStr for DeviceState {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ON" => Ok(DeviceState::ON),
            "OFF" => Ok(DeviceState::OFF),
            "UNKNOWN" => Ok(DeviceState::UNKNOWN),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceState::ON => write!(f, "ON"),
            DeviceState::OFF => write!(f, "OFF"),
            DeviceState::UNKNOWN => write!(f, "UNKNOWN"),
        }
    }
}

/// Device classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    LED,
    SENSOR,
    FAN,
}

impl FromStr for DeviceType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LED" => Ok(DeviceType::LED),
            "SENSOR" => Ok(DeviceType::SENSOR),
            "FAN" => Ok(DeviceType::FAN),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::LED => write!(f, "LED"),
            DeviceType::SENSOR => write!(f, "SENSOR"),
            DeviceType::FAN => write!(f, "FAN"),
        }
    }
}

/// Raised when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// Sensor metric selector for searches and value filters.
///
/// `All` means "no field restriction" for plain searches; a value filter
/// combined with `All` matches when *any* metric falls in range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorMetric {
    #[serde(rename = "TEMP")]
    Temperature,
    #[serde(rename = "HUMIDITY")]
    Humidity,
    #[serde(rename = "LIGHT")]
    Light,
    #[serde(rename = "ALL")]
    #[default]
    All,
}

impl SensorMetric {
    /// Storage column backing this metric. `All` has no single column.
    pub fn column(self) -> Option<&'static str> {
        match self {
            SensorMetric::Temperature => Some("temperature"),
            SensorMetric::Humidity => Some("humidity"),
            SensorMetric::Light => Some("light"),
            SensorMetric::All => None,
        }
    }

    /// The three concrete metrics, in column order.
    pub const CONCRETE: [SensorMetric; 3] = [
        SensorMetric::Temperature,
        SensorMetric::Humidity,
        SensorMetric::Light,
    ];
}

impl FromStr for SensorMetric {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TEMP" | "TEMPERATURE" => Ok(SensorMetric::Temperature),
            "HUMIDITY" => Ok(SensorMetric::Humidity),
            "LIGHT" => Ok(SensorMetric::Light),
            "ALL" => Ok(SensorMetric::All),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Device row: identity, classification, and the mutable state the ledger
/// owns. Provisioned out-of-band; never deleted by this core.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    #[serde(rename = "deviceUid")]
    pub device_uid: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub state: DeviceState,
    #[serde(rename = "lastSeenAt")]
    pub last_seen_at: Option<NaiveDateTime>,
}

/// Append-only action history fact: one row per applied acknowledgement.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionRecord {
    pub id: i64,
    pub device_id: i64,
    pub device_name: String,
    pub action: DeviceState,
    pub executed_at: NaiveDateTime,
}

/// One persisted sensor reading. All metrics are independently optional —
/// a device may report any subset.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorReading {
    pub id: i64,
    pub device_id: i64,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light: Option<f64>,
    pub recorded_at: NaiveDateTime,
}

/// Sentinel meaning "not measured" on inbound telemetry.
pub const NOT_MEASURED: f64 = -1.0;

/// Normalize a wire metric value: the `-1` sentinel becomes absent.
pub fn normalize_metric(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != NOT_MEASURED)
}

/// Transient control intent. Never persisted; the correlation id only lets
/// downstream consumers match a later ack to the request that caused it.
#[derive(Clone, Debug, Serialize)]
pub struct CommandIntent {
    #[serde(rename = "deviceId")]
    pub device_id: i64,
    pub action: DeviceState,
    #[serde(rename = "correlationId")]
    pub correlation_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn display_format_matches_broadcast_contract() {
        let ts = NaiveDate::from_ymd_opt(2024, 2, 5)
            .unwrap()
            .and_hms_opt(9, 30, 7)
            .unwrap();
        assert_eq!(format_display(ts), "05-02-2024 09:30:07");
    }

    #[test]
    fn storage_format_round_trips() {
        let ts = NaiveDate::from_ymd_opt(2024, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert_eq!(parse_storage(&format_storage(ts)), Some(ts));
    }

    #[test]
    fn sentinel_becomes_absent() {
        assert_eq!(normalize_metric(Some(-1.0)), None);
        assert_eq!(normalize_metric(Some(40.5)), Some(40.5));
        assert_eq!(normalize_metric(None), None);
    }

    #[test]
    fn metric_parses_case_insensitive() {
        assert_eq!("temp".parse::<SensorMetric>(), Ok(SensorMetric::Temperature));
        assert_eq!("LIGHT".parse::<SensorMetric>(), Ok(SensorMetric::Light));
        assert_eq!("all".parse::<SensorMetric>(), Ok(SensorMetric::All));
        assert!("voltage".parse::<SensorMetric>().is_err());
    }

    #[test]
    fn state_rejects_unknown_variant() {
        assert_eq!("ON".parse::<DeviceState>(), Ok(DeviceState::ON));
        assert!("DIMMED".parse::<DeviceState>().is_err());
    }
}
