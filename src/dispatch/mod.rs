use crate::model::{CommandIntent, DeviceState};
use crate::store::Store;
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Outbound publish seam. The MQTT publisher implements this in
/// production; tests substitute a recording double.
#[async_trait]
pub trait OutboundPublisher: Send + Sync {
    /// Queue `payload` for publication on `topic`. Returning `Ok` means
    /// queued, not delivered — delivery is the transport's concern.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;
}

/// Command Dispatcher: fire-and-forget control intents.
///
/// Dispatch returns as soon as the outbound publish is queued; it never
/// waits for the matching acknowledgement. The returned correlation id is a
/// client-side token for spotting that ack later on the fan-out.
pub struct CommandDispatcher {
    store: Arc<Store>,
    publisher: Arc<dyn OutboundPublisher>,
    command_topic: String,
}

#[derive(Debug)]
pub enum DispatchError {
    DeviceNotFound(i64),
    Storage(anyhow::Error),
    Publish(anyhow::Error),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::DeviceNotFound(id) => write!(f, "device not found: {}", id),
            DispatchError::Storage(e) => write!(f, "storage failure: {}", e),
            DispatchError::Publish(e) => write!(f, "publish failure: {}", e),
        }
    }
}

impl std::error::Error for DispatchError {}

impl CommandDispatcher {
    pub fn new(
        store: Arc<Store>,
        publisher: Arc<dyn OutboundPublisher>,
        command_topic: impl Into<String>,
    ) -> Self {
        Self { store, publisher, command_topic: command_topic.into() }
    }

    /// Dispatch a control intent to a known device, returning the minted
    /// correlation id.
    pub async fn dispatch(
        &self,
        device_id: i64,
        action: DeviceState,
    ) -> Result<Uuid, DispatchError> {
        let device = self
            .store
            .find_device(device_id)
            .map_err(DispatchError::Storage)?
            .ok_or(DispatchError::DeviceNotFound(device_id))?;

        let correlation_id = Uuid::new_v4();
        let intent = CommandIntent {
            device_id: device.id,
            action,
            correlation_id: correlation_id.to_string(),
        };
        let payload = serde_json::to_vec(&intent)
            .map_err(|e| DispatchError::Publish(e.into()))?;

        self.publisher
            .publish(&self.command_topic, payload)
            .await
            .map_err(DispatchError::Publish)?;

        info!(
            device_id = device.id,
            action = %action,
            correlation_id = %correlation_id,
            "Dispatched command"
        );

        Ok(correlation_id)
    }
}
