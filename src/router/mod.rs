//! Event Router: the bridge between inbound transport messages and the
//! ledger/recorder/fan-out.
//!
//! Each message walks Received → Decoded → Classified → Dispatched; any
//! failure lands in the terminal Rejected state: logged, dropped, never
//! retried. A malformed message must never block the channel or crash a
//! worker.
//!
//! One bounded channel per logical topic (acks, telemetry) feeds a small
//! worker pool, so transport callback latency is decoupled from
//! persistence latency and the two channels never block each other.

use crate::fanout::{DeviceUpdate, FanOut, SensorUpdate};
use crate::ledger::{DeviceLedger, LedgerError};
use crate::model::{format_display, DeviceState};
use crate::telemetry::{RecorderError, TelemetryRecorder};
use chrono::Utc;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Logical inbound topic. Classification is by topic identity alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Ack,
    Telemetry,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Ack => write!(f, "ack"),
            Channel::Telemetry => write!(f, "telemetry"),
        }
    }
}

/// Why a message was rejected. Terminal for that one message only.
#[derive(Debug)]
enum Rejection {
    Decode(serde_json::Error),
    MissingDeviceId,
    UnknownState(String),
    UnknownDevice(String),
    Storage(anyhow::Error),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Decode(e) => write!(f, "payload decode failed: {}", e),
            Rejection::MissingDeviceId => write!(f, "payload missing device identifier"),
            Rejection::UnknownState(s) => write!(f, "unknown device state '{}'", s),
            Rejection::UnknownDevice(d) => write!(f, "unknown device '{}'", d),
            Rejection::Storage(e) => write!(f, "storage failure: {}", e),
        }
    }
}

/// Ack wire payload: `{deviceId, state, correlationId?}`.
#[derive(Deserialize)]
struct AckPayload {
    #[serde(rename = "deviceId")]
    device_id: i64,
    state: String,
    #[serde(rename = "correlationId")]
    correlation_id: Option<String>,
}

/// Telemetry wire payload: `{deviceUid, temperature?, humidity?, light?}`.
/// `light` is alternatively keyed `light_level` by some firmware.
#[derive(Deserialize)]
struct TelemetryPayload {
    #[serde(rename = "deviceUid")]
    device_uid: Option<String>,
    temperature: Option<f64>,
    humidity: Option<f64>,
    #[serde(alias = "light_level")]
    light: Option<f64>,
}

/// Sending half of the router's per-topic channels, handed to the
/// transport layer (or to test doubles replaying recorded messages).
#[derive(Clone)]
pub struct RouterHandle {
    pub ack_tx: async_channel::Sender<Vec<u8>>,
    pub telemetry_tx: async_channel::Sender<Vec<u8>>,
}

impl RouterHandle {
    /// Offer one raw message to the named channel. Errors only when the
    /// router has shut down.
    pub async fn offer(&self, channel: Channel, payload: Vec<u8>) -> anyhow::Result<()> {
        let tx = match channel {
            Channel::Ack => &self.ack_tx,
            Channel::Telemetry => &self.telemetry_tx,
        };
        tx.send(payload).await.map_err(|_| anyhow::anyhow!("router channel closed"))
    }
}

pub struct EventRouter {
    ledger: Arc<DeviceLedger>,
    recorder: Arc<TelemetryRecorder>,
    fanout: Arc<FanOut>,
}

impl EventRouter {
    pub fn new(
        ledger: Arc<DeviceLedger>,
        recorder: Arc<TelemetryRecorder>,
        fanout: Arc<FanOut>,
    ) -> Self {
        Self { ledger, recorder, fanout }
    }

    /// Spawn `workers` consumers per topic over bounded channels of
    /// `capacity`, returning the transport-facing sending half and the
    /// worker join handles (held for shutdown).
    pub fn start(
        self: Arc<Self>,
        capacity: usize,
        workers: usize,
    ) -> (RouterHandle, Vec<JoinHandle<()>>) {
        // bounded(0) panics; a misconfigured capacity degrades to 1 instead
        let capacity = capacity.max(1);
        let (ack_tx, ack_rx) = async_channel::bounded::<Vec<u8>>(capacity);
        let (telemetry_tx, telemetry_rx) = async_channel::bounded::<Vec<u8>>(capacity);

        let mut handles = Vec::with_capacity(workers * 2);
        for _ in 0..workers.max(1) {
            let router = Arc::clone(&self);
            let rx = ack_rx.clone();
            handles.push(tokio::spawn(async move {
                while let Ok(payload) = rx.recv().await {
                    router.route(Channel::Ack, &payload);
                }
            }));

            let router = Arc::clone(&self);
            let rx = telemetry_rx.clone();
            handles.push(tokio::spawn(async move {
                while let Ok(payload) = rx.recv().await {
                    router.route(Channel::Telemetry, &payload);
                }
            }));
        }

        (RouterHandle { ack_tx, telemetry_tx }, handles)
    }

    /// Route one raw message. Never fails from the caller's perspective —
    /// a rejection is logged and the message dropped.
    pub fn route(&self, channel: Channel, payload: &[u8]) {
        let outcome = match channel {
            Channel::Ack => self.route_ack(payload),
            Channel::Telemetry => self.route_telemetry(payload),
        };
        match outcome {
            Ok(()) => debug!(channel = %channel, "Dispatched inbound message"),
            Err(rejection) => {
                warn!(channel = %channel, reason = %rejection, "Rejected inbound message");
            }
        }
    }

    fn route_ack(&self, payload: &[u8]) -> Result<(), Rejection> {
        let ack: AckPayload = serde_json::from_slice(payload).map_err(Rejection::Decode)?;
        let state: DeviceState = ack
            .state
            .parse()
            .map_err(|_| Rejection::UnknownState(ack.state.clone()))?;

        // event timestamp, assigned at decode time
        let occurred_at = Utc::now().naive_utc();
        let record = self.ledger.apply_ack(ack.device_id, state, occurred_at).map_err(
            |e| match e {
                LedgerError::DeviceNotFound(id) => Rejection::UnknownDevice(id.to_string()),
                LedgerError::Storage(e) => Rejection::Storage(e),
            },
        )?;

        self.fanout.broadcast_device(DeviceUpdate {
            device_id: record.device_id,
            state: record.action,
            correlation_id: ack.correlation_id,
            recorded_at: format_display(record.executed_at),
        });
        Ok(())
    }

    fn route_telemetry(&self, payload: &[u8]) -> Result<(), Rejection> {
        let telemetry: TelemetryPayload =
            serde_json::from_slice(payload).map_err(Rejection::Decode)?;
        let device_uid = telemetry.device_uid.ok_or(Rejection::MissingDeviceId)?;

        let reading = self
            .recorder
            .record(&device_uid, telemetry.temperature, telemetry.humidity, telemetry.light)
            .map_err(|e| match e {
                RecorderError::DeviceNotFound(uid) => Rejection::UnknownDevice(uid),
                RecorderError::Storage(e) => Rejection::Storage(e),
            })?;

        // broadcast the normalized reading, not the raw wire values
        self.fanout.broadcast_sensor(SensorUpdate {
            device_uid,
            temperature: reading.temperature,
            humidity: reading.humidity,
            light: reading.light,
            recorded_at: format_display(reading.recorded_at),
        });
        Ok(())
    }
}
