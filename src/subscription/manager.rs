use crate::fanout::{DeviceUpdate, SensorUpdate};
use crate::subscription::protocol::{
    ClientMessage, DeviceUpdateMessage, ErrorMessage, SensorUpdateMessage, StreamChannel,
};
use axum::extract::ws::{Message, WebSocket};
use std::collections::HashSet;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Manages a single WebSocket connection with channel subscriptions.
///
/// A connection that never sends a subscribe message receives both
/// streams; an explicit subscription narrows delivery to the named
/// channels.
pub struct ConnectionManager {
    subscriptions: HashSet<StreamChannel>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            subscriptions: HashSet::new(),
        }
    }

    /// Handle WebSocket connection lifecycle
    pub async fn handle(
        mut self,
        mut socket: WebSocket,
        mut device_rx: broadcast::Receiver<DeviceUpdate>,
        mut sensor_rx: broadcast::Receiver<SensorUpdate>,
    ) {
        info!("WebSocket connection established");

        loop {
            tokio::select! {
                // Handle incoming client messages
                Some(msg) = socket.recv() => {
                    match msg {
                        Ok(Message::Text(text)) => {
                            if let Err(e) = self.handle_client_message(&mut socket, &text).await {
                                error!(error = %e, "Error handling client message");
                            }
                        }
                        Ok(Message::Close(_)) => {
                            info!("WebSocket client disconnected");
                            break;
                        }
                        Ok(Message::Ping(data)) => {
                            if let Err(e) = socket.send(Message::Pong(data)).await {
                                error!(error = %e, "Failed to send pong");
                                break;
                            }
                        }
                        Ok(_) => {
                            // Ignore binary, pong messages
                        }
                        Err(e) => {
                            warn!(error = %e, "WebSocket error");
                            break;
                        }
                    }
                }

                // Device-state updates from the fan-out
                result = device_rx.recv() => {
                    match result {
                        Ok(update) => {
                            if self.wants(StreamChannel::Devices) {
                                if let Err(e) = self.send_device_update(&mut socket, update).await {
                                    error!(error = %e, "Failed to send device update");
                                    break;
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped = skipped, "WebSocket lagged, skipped device updates");
                            // Continue processing
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            error!("Device broadcast channel closed");
                            break;
                        }
                    }
                }

                // Sensor-reading updates from the fan-out
                result = sensor_rx.recv() => {
                    match result {
                        Ok(update) => {
                            if self.wants(StreamChannel::Sensors) {
                                if let Err(e) = self.send_sensor_update(&mut socket, update).await {
                                    error!(error = %e, "Failed to send sensor update");
                                    break;
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped = skipped, "WebSocket lagged, skipped sensor updates");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            error!("Sensor broadcast channel closed");
                            break;
                        }
                    }
                }

                else => {
                    break;
                }
            }
        }

        info!("WebSocket connection closed");
    }

    /// Handle client message (subscribe/unsubscribe)
    async fn handle_client_message(
        &mut self,
        socket: &mut WebSocket,
        text: &str,
    ) -> anyhow::Result<()> {
        let msg: ClientMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                let reply = ErrorMessage::new(format!("invalid message: {}", e));
                socket.send(Message::Text(serde_json::to_string(&reply)?)).await?;
                return Ok(());
            }
        };

        match msg {
            ClientMessage::Subscribe { channel } => {
                info!(channel = ?channel, "Client subscribed to channel");
                self.subscriptions.insert(channel);
            }
            ClientMessage::Unsubscribe { channel } => {
                info!(channel = ?channel, "Client unsubscribed from channel");
                self.subscriptions.remove(&channel);
            }
        }

        Ok(())
    }

    /// No explicit subscriptions means forward everything.
    fn wants(&self, channel: StreamChannel) -> bool {
        self.subscriptions.is_empty() || self.subscriptions.contains(&channel)
    }

    async fn send_device_update(
        &self,
        socket: &mut WebSocket,
        update: DeviceUpdate,
    ) -> anyhow::Result<()> {
        let msg = DeviceUpdateMessage::from(update);
        socket.send(Message::Text(serde_json::to_string(&msg)?)).await?;
        Ok(())
    }

    async fn send_sensor_update(
        &self,
        socket: &mut WebSocket,
        update: SensorUpdate,
    ) -> anyhow::Result<()> {
        let msg = SensorUpdateMessage::from(update);
        socket.send(Message::Text(serde_json::to_string(&msg)?)).await?;
        Ok(())
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
