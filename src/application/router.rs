//! Message router.
//!
//! Single intake point for both transports. Owns the session registry, the
//! duplicate-delivery window and the decode-failure policy; spawns one
//! worker per charge point that drains the session inbox strictly in
//! arrival order. CallResult/CallError frames from chargers bypass the
//! inbox and resolve command waiters directly — a command response must
//! never queue behind the inbound CALL that is waiting for it.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::application::codec::{self, CallErrorCode};
use crate::application::commands::SharedCommandSender;
use crate::application::events::{
    ChargePointConnectedEvent, ChargePointDisconnectedEvent, Event, SharedEventBus,
};
use crate::application::handlers::{dispatch_call, SessionContext};
use crate::application::services::{ChargePointService, ChargingService};
use crate::application::session::{
    Inbox, InboundCall, RegisterOutcome, SessionState, SharedSessionRegistry,
};
use crate::application::transport::{
    ConnectClaim, TransportEvent, TransportEventSender, TransportKind, INTAKE_QUEUE_DEPTH,
};
use crate::config::AppConfig;
use crate::domain::device_event::{DeviceEvent, EventKind};
use crate::domain::repositories::{RepositoryProvider, SharedRepositoryProvider};
use crate::infrastructure::cache::LivenessCache;
use crate::support::ocpp_frame::{OcppFrame, OcppFrameError};
use crate::support::shutdown::ShutdownSignal;

/// Channel close policy: this many decode failures within the window closes
/// the channel.
const DECODE_FAILURE_LIMIT: usize = 5;
const DECODE_FAILURE_WINDOW_SECS: i64 = 10;

const DEDUP_SWEEP_SECS: u64 = 30;

struct DedupEntry {
    frame: OcppFrame,
    inserted_at: DateTime<Utc>,
}

/// Routes transport events to sessions and command waiters.
pub struct MessageRouter {
    registry: SharedSessionRegistry,
    commands: SharedCommandSender,
    repos: SharedRepositoryProvider,
    charge_points: Arc<ChargePointService>,
    charging: Arc<ChargingService>,
    cache: Arc<LivenessCache>,
    event_bus: SharedEventBus,
    config: AppConfig,
    dedup: DashMap<(String, String), DedupEntry>,
    decode_failures: DashMap<String, Vec<DateTime<Utc>>>,
    intake_tx: TransportEventSender,
}

impl MessageRouter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: SharedSessionRegistry,
        commands: SharedCommandSender,
        repos: SharedRepositoryProvider,
        charge_points: Arc<ChargePointService>,
        charging: Arc<ChargingService>,
        cache: Arc<LivenessCache>,
        event_bus: SharedEventBus,
        config: AppConfig,
    ) -> (Arc<Self>, mpsc::Receiver<TransportEvent>) {
        let (intake_tx, intake_rx) = mpsc::channel(INTAKE_QUEUE_DEPTH);
        let router = Arc::new(Self {
            registry,
            commands,
            repos,
            charge_points,
            charging,
            cache,
            event_bus,
            config,
            dedup: DashMap::new(),
            decode_failures: DashMap::new(),
            intake_tx,
        });
        (router, intake_rx)
    }

    /// Intake sender for transports and the heartbeat watchdog.
    pub fn intake(&self) -> TransportEventSender {
        self.intake_tx.clone()
    }

    pub fn registry(&self) -> &SharedSessionRegistry {
        &self.registry
    }

    /// Drain the intake queue until shutdown.
    pub async fn run(
        self: Arc<Self>,
        mut intake_rx: mpsc::Receiver<TransportEvent>,
        shutdown: ShutdownSignal,
    ) {
        info!("Message router started");
        let mut sweep = tokio::time::interval(StdDuration::from_secs(DEDUP_SWEEP_SECS));

        loop {
            tokio::select! {
                event = intake_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => break,
                    }
                }
                _ = sweep.tick() => {
                    self.sweep_dedup();
                }
                _ = shutdown.notified().wait() => {
                    info!("Message router shutting down");
                    break;
                }
            }
        }
    }

    async fn handle_event(self: &Arc<Self>, event: TransportEvent) {
        match event {
            TransportEvent::Connected {
                charge_point_id,
                kind,
                claim,
                sink,
            } => self.on_connected(&charge_point_id, kind, claim, sink).await,
            TransportEvent::Inbound {
                charge_point_id,
                text,
                received_at,
            } => self.on_inbound(&charge_point_id, &text, received_at).await,
            TransportEvent::Disconnected {
                charge_point_id,
                reason,
                sink,
            } => {
                self.on_disconnected(&charge_point_id, &reason, sink.as_ref())
                    .await
            }
        }
    }

    // ── Connection lifecycle ───────────────────────────────

    async fn on_connected(
        self: &Arc<Self>,
        charge_point_id: &str,
        kind: TransportKind,
        claim: ConnectClaim,
        sink: crate::application::transport::FrameSink,
    ) {
        let outcome = self.registry.attach(charge_point_id, kind, sink);
        self.cache.touch(charge_point_id);

        if let Some(serial) = claim.device_serial.as_deref() {
            if let Err(e) = self
                .repos
                .devices()
                .update_last_connected(serial, Utc::now())
                .await
            {
                // Unprovisioned WS chargers have no device row; not an error.
                tracing::debug!(serial, error = %e, "Could not record device last_connected");
            }
        }

        if let Err(e) = self
            .repos
            .device_events()
            .append(
                DeviceEvent::new(charge_point_id, EventKind::Connect).with_payload(
                    serde_json::json!({
                        "transport": kind.to_string(),
                        "remoteAddr": claim.remote_addr,
                    }),
                ),
            )
            .await
        {
            warn!(charge_point_id, error = %e, "Failed to audit connect");
        }

        self.event_bus
            .publish(Event::ChargePointConnected(ChargePointConnectedEvent {
                charge_point_id: charge_point_id.to_string(),
                transport: kind.to_string(),
                remote_addr: claim.remote_addr,
                timestamp: Utc::now(),
            }));

        match outcome {
            RegisterOutcome::New { inbox, .. } => {
                self.spawn_session_worker(charge_point_id.to_string(), inbox);
            }
            RegisterOutcome::Adopted { .. } => {
                // Reconnect: in-flight command frames fail over to the new
                // channel; their deadlines are not reset.
                self.commands.resend_pending(charge_point_id);
            }
        }
    }

    async fn on_disconnected(
        &self,
        charge_point_id: &str,
        reason: &str,
        sink: Option<&crate::application::transport::FrameSink>,
    ) {
        if !self.registry.detach(charge_point_id, sink) {
            return;
        }

        info!(charge_point_id, reason, "Charge point disconnected");
        self.commands.cancel_for(charge_point_id);

        if let Err(e) = self
            .repos
            .device_events()
            .append(
                DeviceEvent::new(charge_point_id, EventKind::Disconnect)
                    .with_payload(serde_json::json!({ "reason": reason })),
            )
            .await
        {
            warn!(charge_point_id, error = %e, "Failed to audit disconnect");
        }

        self.event_bus
            .publish(Event::ChargePointDisconnected(ChargePointDisconnectedEvent {
                charge_point_id: charge_point_id.to_string(),
                reason: Some(reason.to_string()),
                timestamp: Utc::now(),
            }));
        // Active charging sessions stay active: the charger's
        // StopTransaction is expected on reconnect, or the stale sweep
        // interrupts them.
    }

    // ── Inbound frames ─────────────────────────────────────

    async fn on_inbound(&self, charge_point_id: &str, text: &str, received_at: DateTime<Utc>) {
        self.registry.touch(charge_point_id);
        self.cache.touch(charge_point_id);
        metrics::counter!("csms_frames_inbound_total").increment(1);

        let frame = match OcppFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                self.on_decode_failure(charge_point_id, text, &e).await;
                return;
            }
        };
        self.decode_failures.remove(charge_point_id);

        match frame {
            OcppFrame::Call {
                message_id,
                action,
                payload,
            } => {
                let Some(inbox) = self.registry.inbox(charge_point_id) else {
                    warn!(charge_point_id, "Inbound CALL for unknown session dropped");
                    return;
                };
                let dropped = inbox.push(InboundCall {
                    message_id,
                    action,
                    payload,
                    received_at,
                });
                if let Some(dropped) = dropped {
                    warn!(
                        charge_point_id,
                        dropped_action = dropped.action.as_str(),
                        "Session inbox full; dropped oldest frame"
                    );
                    let _ = self
                        .repos
                        .device_events()
                        .append(
                            DeviceEvent::new(charge_point_id, EventKind::InboxOverflow)
                                .with_payload(serde_json::json!({
                                    "droppedAction": dropped.action,
                                    "droppedMessageId": dropped.message_id,
                                })),
                        )
                        .await;
                }
            }
            OcppFrame::CallResult {
                message_id,
                payload,
            } => {
                self.commands
                    .handle_response(charge_point_id, &message_id, payload);
            }
            OcppFrame::CallError {
                message_id,
                error_code,
                error_description,
                ..
            } => {
                self.commands.handle_error(
                    charge_point_id,
                    &message_id,
                    &error_code,
                    &error_description,
                );
            }
        }
    }

    async fn on_decode_failure(&self, charge_point_id: &str, text: &str, e: &OcppFrameError) {
        warn!(charge_point_id, error = %e, "Discarding malformed frame");
        metrics::counter!("csms_frames_malformed_total").increment(1);

        let _ = self
            .repos
            .device_events()
            .append(
                DeviceEvent::new(charge_point_id, EventKind::DecodeError).with_payload(
                    serde_json::json!({
                        "error": e.to_string(),
                        "prefix": text.chars().take(128).collect::<String>(),
                    }),
                ),
            )
            .await;

        // One bad frame is tolerated; a burst closes the channel.
        let now = Utc::now();
        let mut entry = self
            .decode_failures
            .entry(charge_point_id.to_string())
            .or_default();
        entry.push(now);
        entry.retain(|t| now - *t <= Duration::seconds(DECODE_FAILURE_WINDOW_SECS));
        let burst = entry.len();
        drop(entry);

        if burst >= DECODE_FAILURE_LIMIT {
            error!(
                charge_point_id,
                burst, "Repeated decode failures; closing channel"
            );
            self.decode_failures.remove(charge_point_id);
            self.registry.close_channel(charge_point_id);
        }
    }

    // ── Session worker ─────────────────────────────────────

    fn spawn_session_worker(self: &Arc<Self>, charge_point_id: String, inbox: Inbox) {
        let router = self.clone();
        tokio::spawn(async move {
            let mut ctx = SessionContext::new(
                charge_point_id.clone(),
                router.repos.clone(),
                router.charge_points.clone(),
                router.charging.clone(),
                router.registry.clone(),
                router.cache.clone(),
                router.event_bus.clone(),
                &router.config,
            );
            info!(charge_point_id = charge_point_id.as_str(), "Session worker started");

            while let Some(call) = inbox.pop().await {
                router.process_call(&mut ctx, call).await;
            }

            info!(charge_point_id = charge_point_id.as_str(), "Session worker stopped");
        });
    }

    /// Handle one inbound CALL: dedup replay, decode, dispatch, reply.
    /// Serial per charger; the CALLRESULT is emitted before the next CALL is
    /// dispatched.
    async fn process_call(&self, ctx: &mut SessionContext, call: InboundCall) {
        let charge_point_id = ctx.charge_point_id.clone();
        let dedup_key = (charge_point_id.clone(), call.message_id.clone());

        // MQTT QoS 1 redelivery: replay the cached response byte-identically
        // and apply nothing twice.
        if let Some(entry) = self.dedup.get(&dedup_key) {
            info!(
                charge_point_id = charge_point_id.as_str(),
                message_id = call.message_id.as_str(),
                "Duplicate delivery; replaying cached CallResult"
            );
            let frame = entry.frame.clone();
            drop(entry);
            if let Err(e) = self.registry.send_frame(&charge_point_id, frame) {
                warn!(charge_point_id = charge_point_id.as_str(), error = %e, "Replay send failed");
            }
            return;
        }

        let response = match codec::decode_call(&call.action, call.payload) {
            Ok(decoded) => {
                // Unknown chargers may only speak BootNotification when the
                // deployment rejects auto-registration.
                if self.config.provisioning.reject_unknown_charge_points
                    && call.action != "BootNotification"
                {
                    match self.repos.charge_points().find_by_id(&ctx.store_id).await {
                        Ok(None) => Err(crate::application::codec::CodecError::new(
                            CallErrorCode::SecurityError,
                            "charge point is not registered",
                        )),
                        _ => dispatch_call(ctx, decoded).await,
                    }
                } else {
                    dispatch_call(ctx, decoded).await
                }
            }
            Err(e) => Err(e),
        };

        match response {
            Ok(payload) => {
                let frame = OcppFrame::result(call.message_id.clone(), payload);
                self.dedup.insert(
                    dedup_key,
                    DedupEntry {
                        frame: frame.clone(),
                        inserted_at: Utc::now(),
                    },
                );
                if let Err(e) = self.registry.send_frame(&charge_point_id, frame) {
                    warn!(
                        charge_point_id = charge_point_id.as_str(),
                        error = %e,
                        "Failed to send CallResult; charger will retry"
                    );
                }
            }
            Err(codec_err) => {
                // No dedup insert: the store may succeed on the redelivery.
                let frame = OcppFrame::error_response(
                    call.message_id,
                    codec_err.code.as_str(),
                    codec_err.description,
                );
                if let Err(e) = self.registry.send_frame(&charge_point_id, frame) {
                    warn!(charge_point_id = charge_point_id.as_str(), error = %e, "Failed to send CallError");
                }
            }
        }
    }

    fn sweep_dedup(&self) {
        let horizon =
            Utc::now() - Duration::seconds(self.config.ocpp.dedup_window_seconds as i64);
        self.dedup.retain(|_, entry| entry.inserted_at > horizon);
    }

    /// Current session state, for the control plane.
    pub fn session_state(&self, charge_point_id: &str) -> Option<SessionState> {
        self.registry.state(charge_point_id)
    }
}
