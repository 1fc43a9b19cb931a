//! Server-initiated command dispatch.
//!
//! `CommandSender` owns the pending-waiter table and enforces the OCPP 1.6
//! rule of at most one outstanding server→charger call: dispatches for the
//! same charger serialize behind a per-charger gate, and at most
//! `queue_depth` callers may wait in line before `Busy` is returned.

pub mod change_availability;
pub mod change_configuration;
pub mod clear_cache;
pub mod get_configuration;
pub mod get_diagnostics;
pub mod remote_start;
pub mod remote_stop;
pub mod reset;
pub mod trigger_message;
pub mod unlock_connector;
pub mod update_firmware;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::events::{CommandIssuedEvent, Event, SharedEventBus};
use crate::application::session::SharedSessionRegistry;
use crate::infrastructure::cache::LivenessCache;
use crate::support::ocpp_frame::OcppFrame;

pub use change_availability::{change_availability, Availability};
pub use change_configuration::change_configuration;
pub use clear_cache::clear_cache;
pub use get_configuration::get_configuration;
pub use get_diagnostics::get_diagnostics;
pub use remote_start::remote_start_transaction;
pub use remote_stop::remote_stop_transaction;
pub use reset::{reset, ResetKind};
pub use trigger_message::{trigger_message, TriggerType};
pub use unlock_connector::unlock_connector;
pub use update_firmware::update_firmware;

#[derive(Debug, Clone)]
pub enum CommandError {
    NotConnected(String),
    Busy(String),
    SendFailed(String),
    Timeout,
    Disconnected(String),
    InvalidResponse(String),
    CallError { code: String, description: String },
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConnected(id) => write!(f, "Charge point not online: {}", id),
            Self::Busy(id) => write!(f, "Charge point command queue full: {}", id),
            Self::SendFailed(msg) => write!(f, "Failed to send: {}", msg),
            Self::Timeout => write!(f, "Response timeout"),
            Self::Disconnected(id) => write!(f, "Charge point disconnected: {}", id),
            Self::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            Self::CallError { code, description } => {
                write!(f, "CallError {}: {}", code, description)
            }
        }
    }
}

impl std::error::Error for CommandError {}

struct PendingRequest {
    action: String,
    /// Kept so a reconnect can fail the in-flight frame over to the new
    /// channel without resetting the waiter's deadline.
    frame: OcppFrame,
    responder: oneshot::Sender<Result<Value, CommandError>>,
}

struct ChargerQueue {
    gate: Mutex<()>,
    depth: AtomicUsize,
}

/// Command sender for central-system initiated OCPP calls.
pub struct CommandSender {
    registry: SharedSessionRegistry,
    cache: Arc<LivenessCache>,
    event_bus: SharedEventBus,
    pending: DashMap<(String, String), PendingRequest>,
    queues: DashMap<String, Arc<ChargerQueue>>,
    call_timeout: Duration,
    queue_depth: usize,
}

pub type SharedCommandSender = Arc<CommandSender>;

impl CommandSender {
    pub fn new(
        registry: SharedSessionRegistry,
        cache: Arc<LivenessCache>,
        event_bus: SharedEventBus,
        call_timeout: Duration,
        queue_depth: usize,
    ) -> Self {
        Self {
            registry,
            cache,
            event_bus,
            pending: DashMap::new(),
            queues: DashMap::new(),
            call_timeout,
            queue_depth,
        }
    }

    fn queue_for(&self, charge_point_id: &str) -> Arc<ChargerQueue> {
        self.queues
            .entry(charge_point_id.to_string())
            .or_insert_with(|| {
                Arc::new(ChargerQueue {
                    gate: Mutex::new(()),
                    depth: AtomicUsize::new(0),
                })
            })
            .clone()
    }

    /// Send an OCPP command and await the correlated response payload.
    pub async fn send_command(
        &self,
        charge_point_id: &str,
        action: &str,
        payload: Value,
    ) -> Result<Value, CommandError> {
        self.send_command_with_timeout(charge_point_id, action, payload, self.call_timeout)
            .await
    }

    pub async fn send_command_with_timeout(
        &self,
        charge_point_id: &str,
        action: &str,
        payload: Value,
        deadline: Duration,
    ) -> Result<Value, CommandError> {
        if !self.registry.is_online(charge_point_id) {
            return Err(CommandError::NotConnected(charge_point_id.to_string()));
        }

        let queue = self.queue_for(charge_point_id);
        if queue.depth.load(Ordering::SeqCst) >= self.queue_depth {
            warn!(charge_point_id, action, "Outbound queue full");
            return Err(CommandError::Busy(charge_point_id.to_string()));
        }
        queue.depth.fetch_add(1, Ordering::SeqCst);
        let result = self
            .send_serialized(&queue, charge_point_id, action, payload, deadline)
            .await;
        queue.depth.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn send_serialized(
        &self,
        queue: &ChargerQueue,
        charge_point_id: &str,
        action: &str,
        payload: Value,
        deadline: Duration,
    ) -> Result<Value, CommandError> {
        // One in-flight call per charger: the previous call must resolve,
        // reject or time out before the next frame goes on the wire.
        let _in_flight = queue.gate.lock().await;

        if !self.registry.is_online(charge_point_id) {
            return Err(CommandError::NotConnected(charge_point_id.to_string()));
        }

        let message_id = Uuid::new_v4().to_string();
        let frame = OcppFrame::Call {
            message_id: message_id.clone(),
            action: action.to_string(),
            payload,
        };

        let (tx, rx) = oneshot::channel();
        let key = (charge_point_id.to_string(), message_id.clone());
        self.pending.insert(
            key.clone(),
            PendingRequest {
                action: action.to_string(),
                frame: frame.clone(),
                responder: tx,
            },
        );
        self.cache.mark_pending_call(
            charge_point_id,
            &message_id,
            Utc::now() + chrono::Duration::from_std(deadline).unwrap_or(chrono::Duration::seconds(30)),
        );

        info!(charge_point_id, action, message_id = message_id.as_str(), "Sending command");
        self.event_bus.publish(Event::CommandIssued(CommandIssuedEvent {
            charge_point_id: charge_point_id.to_string(),
            action: action.to_string(),
            message_id: message_id.clone(),
            timestamp: Utc::now(),
        }));

        if let Err(e) = self.registry.send_frame(charge_point_id, frame) {
            self.remove_pending(&key);
            return Err(CommandError::SendFailed(e.to_string()));
        }

        match timeout(deadline, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                self.remove_pending(&key);
                Err(CommandError::Disconnected(charge_point_id.to_string()))
            }
            Err(_) => {
                // Waiter removed first: a reply racing in after this point is
                // dropped by handle_response.
                self.remove_pending(&key);
                warn!(charge_point_id, action, message_id = message_id.as_str(), "Command timed out");
                Err(CommandError::Timeout)
            }
        }
    }

    fn remove_pending(&self, key: &(String, String)) {
        if self.pending.remove(key).is_some() {
            self.cache.clear_pending_call(&key.0, &key.1);
        }
    }

    /// Resolve a waiter from an inbound CALLRESULT. A reply with no waiter
    /// (late, or replayed) is dropped and logged.
    pub fn handle_response(&self, charge_point_id: &str, message_id: &str, payload: Value) {
        let key = (charge_point_id.to_string(), message_id.to_string());
        if let Some((_, pending)) = self.pending.remove(&key) {
            self.cache.clear_pending_call(charge_point_id, message_id);
            info!(
                charge_point_id,
                action = pending.action.as_str(),
                message_id,
                "Received command response"
            );
            let _ = pending.responder.send(Ok(payload));
        } else {
            warn!(charge_point_id, message_id, "Late or unknown CallResult dropped");
        }
    }

    /// Reject a waiter from an inbound CALLERROR.
    pub fn handle_error(
        &self,
        charge_point_id: &str,
        message_id: &str,
        error_code: &str,
        error_description: &str,
    ) {
        let key = (charge_point_id.to_string(), message_id.to_string());
        if let Some((_, pending)) = self.pending.remove(&key) {
            self.cache.clear_pending_call(charge_point_id, message_id);
            warn!(
                charge_point_id,
                action = pending.action.as_str(),
                message_id,
                error_code,
                "Received command error"
            );
            let _ = pending.responder.send(Err(CommandError::CallError {
                code: error_code.to_string(),
                description: error_description.to_string(),
            }));
        } else {
            warn!(charge_point_id, message_id, "Late or unknown CallError dropped");
        }
    }

    /// Cancel every pending waiter for a charger that went away.
    pub fn cancel_for(&self, charge_point_id: &str) {
        let keys: Vec<(String, String)> = self
            .pending
            .iter()
            .filter(|e| e.key().0 == charge_point_id)
            .map(|e| e.key().clone())
            .collect();
        for key in keys {
            if let Some((_, pending)) = self.pending.remove(&key) {
                self.cache.clear_pending_call(&key.0, &key.1);
                let _ = pending
                    .responder
                    .send(Err(CommandError::Disconnected(charge_point_id.to_string())));
            }
        }
    }

    /// Re-send in-flight frames over a freshly adopted channel. Waiter
    /// deadlines are untouched.
    pub fn resend_pending(&self, charge_point_id: &str) {
        for entry in self.pending.iter() {
            if entry.key().0 == charge_point_id {
                let frame = entry.value().frame.clone();
                if let Err(e) = self.registry.send_frame(charge_point_id, frame) {
                    warn!(charge_point_id, error = %e, "Failed to fail-over pending frame");
                }
            }
        }
    }

    pub fn pending_count(&self, charge_point_id: &str) -> usize {
        self.pending
            .iter()
            .filter(|e| e.key().0 == charge_point_id)
            .count()
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::create_event_bus;
    use crate::application::session::{SessionRegistry, SessionState};
    use crate::application::transport::{SinkMessage, TransportKind};
    use serde_json::json;
    use tokio::sync::mpsc;

    fn setup() -> (
        Arc<CommandSender>,
        SharedSessionRegistry,
        mpsc::UnboundedReceiver<SinkMessage>,
    ) {
        let registry = SessionRegistry::shared(16);
        let (sink, rx) = mpsc::unbounded_channel();
        registry.attach("CP-001", TransportKind::WebSocket, sink);
        registry.set_state("CP-001", SessionState::Online);
        let sender = Arc::new(CommandSender::new(
            registry.clone(),
            Arc::new(LivenessCache::new(300)),
            create_event_bus(),
            Duration::from_secs(30),
            4,
        ));
        (sender, registry, rx)
    }

    /// Wait (yielding) until the next CALL frame appears on the sink.
    /// Ensures the dispatching task has progressed to its response await.
    async fn next_call_id(rx: &mut mpsc::UnboundedReceiver<SinkMessage>) -> String {
        for _ in 0..1000 {
            match rx.try_recv() {
                Ok(SinkMessage::Frame(OcppFrame::Call { message_id, .. })) => {
                    tokio::task::yield_now().await;
                    return message_id;
                }
                Ok(other) => panic!("expected Call frame, got {:?}", other),
                Err(_) => tokio::task::yield_now().await,
            }
        }
        panic!("no Call frame observed");
    }

    #[tokio::test]
    async fn command_resolves_with_response() {
        let (sender, _registry, mut rx) = setup();

        let fut = {
            let sender = sender.clone();
            tokio::spawn(async move {
                sender
                    .send_command("CP-001", "Reset", json!({"type": "Soft"}))
                    .await
            })
        };

        let message_id = next_call_id(&mut rx).await;
        sender.handle_response("CP-001", &message_id, json!({"status": "Accepted"}));

        let result = fut.await.unwrap().unwrap();
        assert_eq!(result["status"], "Accepted");
        assert_eq!(sender.pending_count("CP-001"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn command_times_out_and_late_reply_is_dropped() {
        let (sender, _registry, mut rx) = setup();

        let fut = {
            let sender = sender.clone();
            tokio::spawn(async move {
                sender
                    .send_command("CP-001", "Reset", json!({"type": "Hard"}))
                    .await
            })
        };
        let message_id = next_call_id(&mut rx).await;

        // Let the 30 s deadline elapse
        tokio::time::advance(Duration::from_secs(31)).await;
        let result = fut.await.unwrap();
        assert!(matches!(result, Err(CommandError::Timeout)));

        // A reply arriving after rejection is dropped silently
        sender.handle_response("CP-001", &message_id, json!({"status": "Accepted"}));
        assert_eq!(sender.pending_count("CP-001"), 0);
    }

    #[tokio::test]
    async fn offline_charger_is_rejected() {
        let (sender, registry, _rx) = setup();
        registry.set_state("CP-001", SessionState::Disconnected);
        let err = sender
            .send_command("CP-001", "Reset", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::NotConnected(_)));
    }

    #[tokio::test]
    async fn call_error_rejects_waiter() {
        let (sender, _registry, mut rx) = setup();
        let fut = {
            let sender = sender.clone();
            tokio::spawn(async move {
                sender
                    .send_command("CP-001", "UnlockConnector", json!({"connectorId": 1}))
                    .await
            })
        };
        let message_id = next_call_id(&mut rx).await;
        sender.handle_error("CP-001", &message_id, "NotSupported", "no lock");
        let err = fut.await.unwrap().unwrap_err();
        assert!(matches!(err, CommandError::CallError { .. }));
    }

    #[tokio::test]
    async fn cancel_for_rejects_all_waiters() {
        let (sender, _registry, mut rx) = setup();
        let fut = {
            let sender = sender.clone();
            tokio::spawn(async move {
                sender.send_command("CP-001", "Reset", json!({})).await
            })
        };
        let _ = next_call_id(&mut rx).await;
        sender.cancel_for("CP-001");
        let err = fut.await.unwrap().unwrap_err();
        assert!(matches!(err, CommandError::Disconnected(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn second_call_waits_for_first_to_resolve() {
        let (sender, _registry, mut rx) = setup();

        let first = {
            let sender = sender.clone();
            tokio::spawn(async move { sender.send_command("CP-001", "Reset", json!({})).await })
        };
        let first_id = next_call_id(&mut rx).await;

        let second = {
            let sender = sender.clone();
            tokio::spawn(async move {
                sender
                    .send_command("CP-001", "ClearCache", json!({}))
                    .await
            })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        // Second frame must NOT be on the wire while the first is in flight
        assert!(rx.try_recv().is_err());

        sender.handle_response("CP-001", &first_id, json!({"status": "Accepted"}));
        first.await.unwrap().unwrap();

        // Now the second frame is released
        let second_id = next_call_id(&mut rx).await;
        sender.handle_response("CP-001", &second_id, json!({"status": "Accepted"}));
        second.await.unwrap().unwrap();
    }
}
