use super::MqttConfig;
use crate::router::{Channel, RouterHandle};
use anyhow::Result;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Owns the broker connection and the event-loop task that pumps inbound
/// publishes into the router.
pub struct MqttTransport {
    client: AsyncClient,
    task: JoinHandle<()>,
}

impl MqttTransport {
    /// Connect to the broker, subscribe to both inbound topics, and start
    /// the event-loop task.
    ///
    /// Connection loss is handled inside the task: rumqttc reconnects on
    /// the next poll, and we resubscribe whenever the broker acknowledges
    /// a session without state.
    pub async fn start(config: &MqttConfig, router: RouterHandle) -> Result<Self> {
        let client_id = format!("pulse-{}", Uuid::new_v4());
        let mut options = MqttOptions::new(&client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(60));
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            options.set_credentials(user, pass);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 10);
        client.subscribe(&config.ack_topic, QoS::AtLeastOnce).await?;
        client.subscribe(&config.telemetry_topic, QoS::AtLeastOnce).await?;

        let ack_topic = config.ack_topic.clone();
        let telemetry_topic = config.telemetry_topic.clone();
        let resub_client = client.clone();
        let task = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let channel = if publish.topic == ack_topic {
                            Channel::Ack
                        } else if publish.topic == telemetry_topic {
                            Channel::Telemetry
                        } else {
                            debug!(topic = %publish.topic, "Ignoring publish on unexpected topic");
                            continue;
                        };
                        if router.offer(channel, publish.payload.to_vec()).await.is_err() {
                            info!("Router shut down, stopping MQTT event loop");
                            break;
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        info!("Connected to MQTT broker");
                        if !ack.session_present {
                            for topic in [&ack_topic, &telemetry_topic] {
                                if let Err(e) =
                                    resub_client.subscribe(topic, QoS::AtLeastOnce).await
                                {
                                    warn!(topic = %topic, error = %e, "Resubscribe failed");
                                }
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "MQTT connection error, retrying");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        info!(
            host = %config.host,
            port = config.port,
            ack_topic = %config.ack_topic,
            telemetry_topic = %config.telemetry_topic,
            "MQTT transport started"
        );
        Ok(Self { client, task })
    }

    /// Handle for publishing outbound messages on this connection.
    pub fn client(&self) -> AsyncClient {
        self.client.clone()
    }

    /// Disconnect from the broker and stop the event-loop task.
    pub async fn stop(self) {
        if let Err(e) = self.client.disconnect().await {
            warn!(error = %e, "MQTT disconnect failed");
        }
        self.task.abort();
        info!("MQTT transport stopped");
    }
}
