//! MQTT transport.
//!
//! Subscribes to `+/+/user/up`, derives charger identity from the topic and
//! synthesizes the connection lifecycle: a charger is connected from its
//! first inbound message until the heartbeat watchdog declares it silent
//! (the router publishes the disconnect; this transport only clears its
//! channel so the next message re-establishes one). Outbound frames are
//! published to `{type_code}/{serial}/user/down` as envelope JSON.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use rand::Rng;
use rumqttc::{AsyncClient, Event as MqttEvent, MqttOptions, Packet, Publish, QoS};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::envelope::MqttEnvelope;
use crate::application::events::{Event, SharedEventBus};
use crate::application::transport::{
    ConnectClaim, SinkMessage, TransportEvent, TransportEventSender, TransportKind,
};
use crate::config::MqttConfig;
use crate::support::shutdown::ShutdownSignal;

/// Reconnect backoff bounds (full jitter).
const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_CAP_MS: u64 = 30_000;

struct Channel {
    sink: mpsc::UnboundedSender<SinkMessage>,
}

pub struct MqttTransport {
    config: MqttConfig,
    qos: QoS,
    intake: TransportEventSender,
    event_bus: SharedEventBus,
    channels: Arc<DashMap<String, Channel>>,
    shutdown: ShutdownSignal,
}

fn qos_from_u8(qos: u8) -> QoS {
    match qos {
        0 => QoS::AtMostOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}

/// `{type_code}/{serial}/user/up` → `(type_code, serial)`
fn parse_up_topic(topic: &str) -> Option<(&str, &str)> {
    let mut parts = topic.split('/');
    let type_code = parts.next()?;
    let serial = parts.next()?;
    let category = parts.next()?;
    let direction = parts.next()?;
    if parts.next().is_some() || category != "user" || direction != "up" {
        return None;
    }
    if type_code.is_empty() || serial.is_empty() {
        return None;
    }
    Some((type_code, serial))
}

impl MqttTransport {
    pub fn new(
        config: MqttConfig,
        intake: TransportEventSender,
        event_bus: SharedEventBus,
        shutdown: ShutdownSignal,
    ) -> Self {
        let qos = qos_from_u8(config.qos);
        Self {
            config,
            qos,
            intake,
            event_bus,
            channels: Arc::new(DashMap::new()),
            shutdown,
        }
    }

    /// Spawn the broker loop and the disconnect listener.
    pub fn start(self) {
        let channels = self.channels.clone();
        let mut subscriber = self.event_bus.subscribe();

        // The watchdog marks MQTT chargers disconnected; drop their channel
        // so the next inbound message re-synthesizes a connection.
        tokio::spawn(async move {
            while let Some(message) = subscriber.recv().await {
                if let Event::ChargePointDisconnected(e) = message.event {
                    if channels.remove(&e.charge_point_id).is_some() {
                        info!(
                            charge_point_id = e.charge_point_id.as_str(),
                            "MQTT channel cleared after disconnect"
                        );
                    }
                }
            }
        });

        tokio::spawn(async move {
            self.run().await;
        });
    }

    async fn run(self) {
        let mut attempt: u32 = 0;
        loop {
            if self.shutdown.is_triggered() {
                return;
            }

            match self.run_connection().await {
                Ok(()) => return, // clean shutdown
                Err(e) => {
                    attempt = attempt.saturating_add(1);
                    let cap =
                        BACKOFF_CAP_MS.min(BACKOFF_BASE_MS.saturating_mul(1u64 << attempt.min(6)));
                    let delay = rand::thread_rng().gen_range(0..=cap);
                    warn!(
                        error = %e,
                        attempt,
                        delay_ms = delay,
                        "MQTT connection lost; reconnecting with backoff"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(delay)) => {}
                        _ = self.shutdown.notified().wait() => return,
                    }
                }
            }
        }
    }

    async fn run_connection(&self) -> Result<(), rumqttc::ConnectionError> {
        let mut options = MqttOptions::new(
            self.config.client_id.clone(),
            self.config.broker_host.clone(),
            self.config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(self.config.keepalive_seconds));

        let (client, mut event_loop) = AsyncClient::new(options, 64);

        info!(
            broker = format!("{}:{}", self.config.broker_host, self.config.broker_port),
            client_id = self.config.client_id.as_str(),
            "Connecting to MQTT broker"
        );

        loop {
            tokio::select! {
                event = event_loop.poll() => {
                    match event {
                        Ok(MqttEvent::Incoming(Packet::ConnAck(_))) => {
                            info!("MQTT broker connected; subscribing to +/+/user/up");
                            if let Err(e) = client.subscribe("+/+/user/up", self.qos).await {
                                error!(error = %e, "MQTT subscribe failed");
                            }
                        }
                        Ok(MqttEvent::Incoming(Packet::Publish(publish))) => {
                            self.handle_publish(&client, publish).await;
                        }
                        Ok(_) => {}
                        Err(e) => return Err(e),
                    }
                }
                _ = self.shutdown.notified().wait() => {
                    info!("MQTT transport shutting down");
                    let _ = client.disconnect().await;
                    return Ok(());
                }
            }
        }
    }

    async fn handle_publish(&self, client: &AsyncClient, publish: Publish) {
        let Some((type_code, serial)) = parse_up_topic(&publish.topic) else {
            warn!(topic = publish.topic.as_str(), "Ignoring message on unexpected topic");
            return;
        };
        let type_code = type_code.to_string();
        let serial = serial.to_string();

        let Ok(text) = std::str::from_utf8(&publish.payload) else {
            // OCPP-J is JSON UTF-8 only
            warn!(serial = serial.as_str(), "Ignoring non-UTF-8 MQTT payload");
            return;
        };

        // First message from a silent charger synthesizes a connection.
        if !self.channels.contains_key(&serial) {
            let (sink_tx, sink_rx) = mpsc::unbounded_channel::<SinkMessage>();
            self.spawn_writer(client.clone(), type_code.clone(), serial.clone(), sink_rx);
            self.channels.insert(
                serial.clone(),
                Channel {
                    sink: sink_tx.clone(),
                },
            );

            info!(
                serial = serial.as_str(),
                type_code = type_code.as_str(),
                "MQTT charger connected (first inbound message)"
            );
            let connected = TransportEvent::Connected {
                charge_point_id: serial.clone(),
                kind: TransportKind::Mqtt,
                claim: ConnectClaim {
                    device_serial: Some(serial.clone()),
                    type_code: Some(type_code.clone()),
                    remote_addr: None,
                },
                sink: sink_tx,
            };
            if self.intake.send(connected).await.is_err() {
                return;
            }
        }

        // Envelope → OCPP-J text. A broken envelope is forwarded raw so the
        // router's decode-failure policy applies uniformly to both carriers.
        let frame_text = match MqttEnvelope::parse(text) {
            Ok(frame) => frame.serialize(),
            Err(e) => {
                warn!(serial = serial.as_str(), error = %e, "Malformed MQTT envelope");
                text.to_string()
            }
        };

        let _ = self
            .intake
            .send(TransportEvent::Inbound {
                charge_point_id: serial,
                text: frame_text,
                received_at: Utc::now(),
            })
            .await;
    }

    fn spawn_writer(
        &self,
        client: AsyncClient,
        type_code: String,
        serial: String,
        mut sink_rx: mpsc::UnboundedReceiver<SinkMessage>,
    ) {
        let qos = self.qos;
        let channels = self.channels.clone();
        let down_topic = format!("{}/{}/user/down", type_code, serial);

        tokio::spawn(async move {
            while let Some(msg) = sink_rx.recv().await {
                match msg {
                    SinkMessage::Frame(frame) => {
                        let body = MqttEnvelope::build(&frame);
                        info!("[{}] -> MQTT {}", serial, body);
                        if let Err(e) = client.publish(down_topic.clone(), qos, false, body).await {
                            error!(serial = serial.as_str(), error = %e, "MQTT publish failed");
                            break;
                        }
                    }
                    SinkMessage::Close => {
                        info!(serial = serial.as_str(), "MQTT channel closed on request");
                        break;
                    }
                }
            }
            channels.remove(&serial);
        });
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_up_topic() {
        assert_eq!(
            parse_up_topic("zcf/861076087029615/user/up"),
            Some(("zcf", "861076087029615"))
        );
    }

    #[test]
    fn rejects_malformed_topics() {
        assert_eq!(parse_up_topic("zcf/861076087029615/user/down"), None);
        assert_eq!(parse_up_topic("zcf/861076087029615/up"), None);
        assert_eq!(parse_up_topic("zcf/861076087029615/user/up/extra"), None);
        assert_eq!(parse_up_topic("/serial/user/up"), None);
    }

    #[test]
    fn qos_mapping() {
        assert_eq!(qos_from_u8(0), QoS::AtMostOnce);
        assert_eq!(qos_from_u8(1), QoS::AtLeastOnce);
        assert_eq!(qos_from_u8(2), QoS::ExactlyOnce);
        // Anything else degrades to the protocol minimum of at-least-once
        assert_eq!(qos_from_u8(7), QoS::AtLeastOnce);
    }
}
