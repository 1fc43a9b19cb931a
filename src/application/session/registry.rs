//! Session registry — live charge point channels and their protocol state.
//!
//! One entry per charge point ever seen this process lifetime; entries are
//! kept (state `Disconnected`) across connection drops so the session's
//! worker, inbox and authorization cache survive reconnects.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use super::inbox::Inbox;
use super::SessionState;
use crate::application::transport::{FrameSink, SinkMessage, TransportKind};
use crate::support::errors::{DomainError, DomainResult};
use crate::support::ocpp_frame::OcppFrame;

/// One charge point's live channel and state.
pub struct Connection {
    /// Monotonic id of the current transport attachment; guards stale
    /// cleanup from tearing down a newer attachment.
    pub connection_id: u64,
    pub charge_point_id: String,
    pub kind: TransportKind,
    /// Present while a transport channel is attached.
    pub sink: Option<FrameSink>,
    pub inbox: Inbox,
    pub state: SessionState,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Outcome of attaching a transport channel.
pub enum RegisterOutcome {
    /// First time this charge point is seen: a worker must be spawned to
    /// drain the returned inbox.
    New { connection_id: u64, inbox: Inbox },
    /// The session already exists; the new sink was adopted atomically and
    /// in-flight waiters keep their deadlines.
    Adopted { connection_id: u64 },
}

/// Thread-safe registry of charge point sessions.
pub struct SessionRegistry {
    sessions: DashMap<String, Connection>,
    next_connection_id: AtomicU64,
    inbox_capacity: usize,
}

pub type SharedSessionRegistry = Arc<SessionRegistry>;

impl SessionRegistry {
    pub fn new(inbox_capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            next_connection_id: AtomicU64::new(1),
            inbox_capacity,
        }
    }

    pub fn shared(inbox_capacity: usize) -> SharedSessionRegistry {
        Arc::new(Self::new(inbox_capacity))
    }

    /// Attach a transport channel for this charge point, creating the
    /// session on first contact or adopting the sink on reconnect.
    pub fn attach(
        &self,
        charge_point_id: &str,
        kind: TransportKind,
        sink: FrameSink,
    ) -> RegisterOutcome {
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);

        let outcome = match self.sessions.get_mut(charge_point_id) {
            Some(mut conn) => {
                if conn.sink.is_some() {
                    warn!(
                        charge_point_id,
                        old_connection_id = conn.connection_id,
                        "Evicting previous channel — new connection replaces it"
                    );
                }
                conn.connection_id = connection_id;
                conn.kind = kind;
                conn.sink = Some(sink);
                conn.connected_at = Utc::now();
                conn.last_activity = Utc::now();
                if conn.state == SessionState::Disconnected {
                    conn.state = SessionState::Booting;
                }
                RegisterOutcome::Adopted { connection_id }
            }
            None => {
                let inbox = Inbox::new(self.inbox_capacity);
                let conn = Connection {
                    connection_id,
                    charge_point_id: charge_point_id.to_string(),
                    kind,
                    sink: Some(sink),
                    inbox: inbox.clone(),
                    state: SessionState::Booting,
                    connected_at: Utc::now(),
                    last_activity: Utc::now(),
                };
                self.sessions.insert(charge_point_id.to_string(), conn);
                RegisterOutcome::New {
                    connection_id,
                    inbox,
                }
            }
        };

        info!(charge_point_id, connection_id, %kind, "Charge point channel attached");
        metrics::gauge!("csms_connected_chargers").set(self.connected_count() as f64);
        outcome
    }

    /// Detach the channel and mark the session Disconnected.
    ///
    /// When `channel` is given, the detach only applies if it identifies the
    /// CURRENT channel — a close racing in from an already-replaced channel
    /// must not tear down its successor. `None` forces the detach
    /// (watchdog-synthesized disconnects).
    pub fn detach(&self, charge_point_id: &str, channel: Option<&FrameSink>) -> bool {
        let detached = match self.sessions.get_mut(charge_point_id) {
            Some(mut conn) => {
                if let Some(closing) = channel {
                    match conn.sink.as_ref() {
                        Some(current) if current.same_channel(closing) => {}
                        _ => return false,
                    }
                }
                if conn.sink.is_none() && conn.state == SessionState::Disconnected {
                    return false;
                }
                conn.sink = None;
                conn.state = SessionState::Disconnected;
                true
            }
            None => false,
        };
        if detached {
            info!(charge_point_id, "Charge point channel detached");
            metrics::gauge!("csms_connected_chargers").set(self.connected_count() as f64);
        }
        detached
    }

    /// Deliver a frame to the charge point's current channel.
    pub fn send_frame(&self, charge_point_id: &str, frame: OcppFrame) -> DomainResult<()> {
        let conn = self
            .sessions
            .get(charge_point_id)
            .ok_or_else(|| DomainError::ChargerOffline(charge_point_id.to_string()))?;
        let sink = conn
            .sink
            .as_ref()
            .ok_or_else(|| DomainError::ChargerOffline(charge_point_id.to_string()))?;
        sink.send(SinkMessage::Frame(frame))
            .map_err(|_| DomainError::ChargerOffline(charge_point_id.to_string()))
    }

    /// Ask the transport to close the channel (decode-failure policy).
    pub fn close_channel(&self, charge_point_id: &str) {
        if let Some(conn) = self.sessions.get(charge_point_id) {
            if let Some(sink) = conn.sink.as_ref() {
                let _ = sink.send(SinkMessage::Close);
            }
        }
    }

    pub fn touch(&self, charge_point_id: &str) {
        if let Some(mut conn) = self.sessions.get_mut(charge_point_id) {
            conn.last_activity = Utc::now();
        }
    }

    pub fn state(&self, charge_point_id: &str) -> Option<SessionState> {
        self.sessions.get(charge_point_id).map(|c| c.state)
    }

    pub fn set_state(&self, charge_point_id: &str, state: SessionState) {
        if let Some(mut conn) = self.sessions.get_mut(charge_point_id) {
            conn.state = state;
        }
    }

    pub fn is_online(&self, charge_point_id: &str) -> bool {
        matches!(self.state(charge_point_id), Some(SessionState::Online))
    }

    pub fn is_connected(&self, charge_point_id: &str) -> bool {
        self.sessions
            .get(charge_point_id)
            .map(|c| c.state.is_connected() && c.sink.is_some())
            .unwrap_or(false)
    }

    pub fn inbox(&self, charge_point_id: &str) -> Option<Inbox> {
        self.sessions.get(charge_point_id).map(|c| c.inbox.clone())
    }

    pub fn transport_kind(&self, charge_point_id: &str) -> Option<TransportKind> {
        self.sessions.get(charge_point_id).map(|c| c.kind)
    }

    pub fn last_activity(&self, charge_point_id: &str) -> Option<DateTime<Utc>> {
        self.sessions.get(charge_point_id).map(|c| c.last_activity)
    }

    pub fn connected_ids(&self) -> Vec<String> {
        self.sessions
            .iter()
            .filter(|e| e.state.is_connected())
            .map(|e| e.key().clone())
            .collect()
    }

    pub fn connected_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|e| e.state.is_connected())
            .count()
    }

    /// Connected sessions whose last inbound is older than `silence_secs`.
    /// The heartbeat watchdog turns these into synthesized disconnects.
    pub fn silent_since(&self, silence_secs: i64) -> Vec<String> {
        let now = Utc::now();
        self.sessions
            .iter()
            .filter(|e| {
                e.state.is_connected()
                    && (now - e.last_activity).num_seconds() >= silence_secs
            })
            .map(|e| e.key().clone())
            .collect()
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_sink() -> (FrameSink, mpsc::UnboundedReceiver<SinkMessage>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn attach_new_session() {
        let reg = SessionRegistry::new(16);
        let (sink, _rx) = make_sink();
        let outcome = reg.attach("CP-001", TransportKind::WebSocket, sink);
        assert!(matches!(outcome, RegisterOutcome::New { .. }));
        assert_eq!(reg.state("CP-001"), Some(SessionState::Booting));
        assert!(reg.is_connected("CP-001"));
        assert_eq!(reg.connected_count(), 1);
    }

    #[test]
    fn reattach_adopts_existing_session() {
        let reg = SessionRegistry::new(16);
        let (sink1, _rx1) = make_sink();
        reg.attach("CP-001", TransportKind::WebSocket, sink1);
        reg.set_state("CP-001", SessionState::Online);

        let (sink2, mut rx2) = make_sink();
        let outcome = reg.attach("CP-001", TransportKind::Mqtt, sink2);
        assert!(matches!(outcome, RegisterOutcome::Adopted { .. }));
        // Online state is preserved on handover; only Disconnected resets
        assert_eq!(reg.state("CP-001"), Some(SessionState::Online));

        reg.send_frame("CP-001", OcppFrame::result("m1", serde_json::json!({})))
            .unwrap();
        assert!(matches!(
            rx2.try_recv().unwrap(),
            SinkMessage::Frame(OcppFrame::CallResult { .. })
        ));
    }

    #[test]
    fn detach_marks_disconnected_and_keeps_session() {
        let reg = SessionRegistry::new(16);
        let (sink, _rx) = make_sink();
        reg.attach("CP-001", TransportKind::WebSocket, sink.clone());
        assert!(reg.detach("CP-001", Some(&sink)));
        assert_eq!(reg.state("CP-001"), Some(SessionState::Disconnected));
        assert!(!reg.is_connected("CP-001"));
        // Session entry (and its inbox) survives
        assert!(reg.inbox("CP-001").is_some());
    }

    #[test]
    fn stale_detach_does_not_touch_new_channel() {
        let reg = SessionRegistry::new(16);
        let (old_sink, _rx1) = make_sink();
        reg.attach("CP-001", TransportKind::WebSocket, old_sink.clone());

        let (new_sink, _rx2) = make_sink();
        reg.attach("CP-001", TransportKind::WebSocket, new_sink);

        // The replaced channel's close must be a no-op
        assert!(!reg.detach("CP-001", Some(&old_sink)));
        assert!(reg.is_connected("CP-001"));
    }

    #[test]
    fn forced_detach_is_idempotent() {
        let reg = SessionRegistry::new(16);
        let (sink, _rx) = make_sink();
        reg.attach("CP-001", TransportKind::WebSocket, sink);
        assert!(reg.detach("CP-001", None));
        // Second disconnect for an already-detached session is a no-op
        assert!(!reg.detach("CP-001", None));
    }

    #[test]
    fn send_frame_to_disconnected_errors() {
        let reg = SessionRegistry::new(16);
        let (sink, _rx) = make_sink();
        reg.attach("CP-001", TransportKind::WebSocket, sink);
        reg.detach("CP-001", None);
        let err = reg
            .send_frame("CP-001", OcppFrame::result("m1", serde_json::json!({})))
            .unwrap_err();
        assert!(matches!(err, DomainError::ChargerOffline(_)));
    }

    #[test]
    fn silent_since_finds_quiet_sessions() {
        let reg = SessionRegistry::new(16);
        let (sink, _rx) = make_sink();
        reg.attach("CP-001", TransportKind::Mqtt, sink);
        {
            let mut conn = reg.sessions.get_mut("CP-001").unwrap();
            conn.last_activity = Utc::now() - chrono::Duration::seconds(120);
        }
        assert_eq!(reg.silent_since(90), vec!["CP-001".to_string()]);
        assert!(reg.silent_since(300).is_empty());
    }
}
