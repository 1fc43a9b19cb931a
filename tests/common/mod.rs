//! Shared harness for end-to-end tests: a full router/session/handler stack
//! over the in-memory store, with a fake transport driven by the test.

// Each test binary uses a different subset of the harness.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;

use voltra_csms::application::services::{ChargePointService, ChargingService};
use voltra_csms::application::session::SharedSessionRegistry;
use voltra_csms::application::transport::{
    ConnectClaim, SinkMessage, TransportEvent, TransportEventSender, TransportKind,
};
use voltra_csms::application::{CommandSender, ControlApi, MessageRouter, SessionRegistry};
use voltra_csms::config::AppConfig;
use voltra_csms::create_event_bus;
use voltra_csms::domain::id_tag::IdTag;
use voltra_csms::domain::repositories::SharedRepositoryProvider;
use voltra_csms::domain::ChargePoint;
use voltra_csms::infrastructure::{InMemoryRepositoryProvider, LivenessCache};
use voltra_csms::support::ocpp_frame::OcppFrame;
use voltra_csms::support::shutdown::ShutdownSignal;

// Not every test binary touches every field.
#[allow(dead_code)]
pub struct Harness {
    pub repos: Arc<InMemoryRepositoryProvider>,
    pub registry: SharedSessionRegistry,
    pub commands: Arc<CommandSender>,
    pub control: Arc<ControlApi>,
    pub intake: TransportEventSender,
    pub shutdown: ShutdownSignal,
}

impl Harness {
    pub async fn start() -> Self {
        let config = AppConfig::default();
        let repos = InMemoryRepositoryProvider::shared();
        let shared: SharedRepositoryProvider = repos.clone();

        let cache = Arc::new(LivenessCache::new(config.ocpp.authorize_cache_ttl_seconds));
        let event_bus = create_event_bus();
        let registry = SessionRegistry::shared(config.ocpp.inbound_buffer_depth);
        let commands = Arc::new(CommandSender::new(
            registry.clone(),
            cache.clone(),
            event_bus.clone(),
            Duration::from_secs(config.ocpp.call_timeout_seconds as u64),
            config.ocpp.outbound_queue_depth,
        ));
        let charge_points = Arc::new(ChargePointService::new(
            shared.clone(),
            config.provisioning.reject_unknown_charge_points,
        ));
        let charging = Arc::new(ChargingService::new(shared.clone()));
        let control = Arc::new(ControlApi::new(
            shared.clone(),
            registry.clone(),
            commands.clone(),
            charging.clone(),
        ));

        let (router, intake_rx) = MessageRouter::new(
            registry.clone(),
            commands.clone(),
            shared,
            charge_points,
            charging,
            cache,
            event_bus,
            config,
        );
        let intake = router.intake();

        let shutdown = ShutdownSignal::new();
        {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { router.run(intake_rx, shutdown).await });
        }

        Self {
            repos,
            registry,
            commands,
            control,
            intake,
            shutdown,
        }
    }

    /// Seed an Accepted id tag.
    pub async fn seed_tag(&self, tag: &str) {
        use voltra_csms::domain::repositories::RepositoryProvider;
        self.repos
            .id_tags()
            .save(IdTag::new(tag))
            .await
            .expect("seed tag");
    }

    /// Seed a pre-provisioned charge point with pricing.
    pub async fn seed_priced_charge_point(&self, id: &str, price: rust_decimal::Decimal) {
        use voltra_csms::domain::repositories::RepositoryProvider;
        let mut cp = ChargePoint::new(id);
        cp.price_per_kwh = Some(price);
        self.repos
            .charge_points()
            .save(cp)
            .await
            .expect("seed charge point");
    }
}

/// A simulated charger connected through the fake transport.
pub struct TestCharger {
    pub id: String,
    intake: TransportEventSender,
    sink_rx: mpsc::UnboundedReceiver<SinkMessage>,
}

impl TestCharger {
    pub async fn connect(harness: &Harness, id: &str) -> Self {
        let (sink_tx, sink_rx) = mpsc::unbounded_channel();
        harness
            .intake
            .send(TransportEvent::Connected {
                charge_point_id: id.to_string(),
                kind: TransportKind::WebSocket,
                claim: ConnectClaim::default(),
                sink: sink_tx,
            })
            .await
            .expect("router alive");
        Self {
            id: id.to_string(),
            intake: harness.intake.clone(),
            sink_rx,
        }
    }

    /// Reconnect after a drop: a fresh channel for the same charger id.
    pub async fn reconnect(&mut self, harness: &Harness) {
        let (sink_tx, sink_rx) = mpsc::unbounded_channel();
        harness
            .intake
            .send(TransportEvent::Connected {
                charge_point_id: self.id.clone(),
                kind: TransportKind::WebSocket,
                claim: ConnectClaim::default(),
                sink: sink_tx,
            })
            .await
            .expect("router alive");
        self.sink_rx = sink_rx;
    }

    pub async fn disconnect(&self) {
        self.intake
            .send(TransportEvent::Disconnected {
                charge_point_id: self.id.clone(),
                reason: "test drop".into(),
                sink: None,
            })
            .await
            .expect("router alive");
    }

    pub async fn send_raw(&self, text: &str) {
        self.intake
            .send(TransportEvent::Inbound {
                charge_point_id: self.id.clone(),
                text: text.to_string(),
                received_at: Utc::now(),
            })
            .await
            .expect("router alive");
    }

    pub async fn send_call(&self, message_id: &str, action: &str, payload: serde_json::Value) {
        let frame = OcppFrame::Call {
            message_id: message_id.to_string(),
            action: action.to_string(),
            payload,
        };
        self.send_raw(&frame.serialize()).await;
    }

    /// Answer a server-initiated call.
    pub async fn send_result(&self, message_id: &str, payload: serde_json::Value) {
        let frame = OcppFrame::result(message_id, payload);
        self.send_raw(&frame.serialize()).await;
    }

    /// Next frame the server pushed to this charger.
    pub async fn recv_frame(&mut self) -> OcppFrame {
        let msg = tokio::time::timeout(Duration::from_secs(2), self.sink_rx.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("sink closed");
        match msg {
            SinkMessage::Frame(frame) => frame,
            SinkMessage::Close => panic!("unexpected channel close"),
        }
    }

    /// Next frame, pre-serialized (for byte-identity assertions).
    pub async fn recv_text(&mut self) -> String {
        self.recv_frame().await.serialize()
    }

    /// Run the boot handshake and assert acceptance.
    pub async fn boot(&mut self, vendor: &str, model: &str) {
        self.send_call(
            &format!("boot-{}", self.id),
            "BootNotification",
            serde_json::json!({"chargePointVendor": vendor, "chargePointModel": model}),
        )
        .await;
        let frame = self.recv_frame().await;
        match frame {
            OcppFrame::CallResult { payload, .. } => {
                assert_eq!(payload["status"], "Accepted", "boot not accepted: {payload}");
            }
            other => panic!("expected boot CallResult, got {:?}", other),
        }
    }
}
