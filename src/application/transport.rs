//! Unified transport contract.
//!
//! Both transports present a charger as a bidirectional channel of OCPP-J
//! frames: they emit `TransportEvent`s into the router's intake queue and
//! register a frame sink whose transport-side writer task owns the wire
//! encoding (OCPP-J text frames for WebSocket, the envelope JSON for MQTT).
//! Each transport preserves per-charger ordering independently per direction.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::support::ocpp_frame::OcppFrame;

/// Which carrier a channel runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    WebSocket,
    Mqtt,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WebSocket => f.write_str("websocket"),
            Self::Mqtt => f.write_str("mqtt"),
        }
    }
}

/// Identity assertions made by the transport when a channel is established.
#[derive(Debug, Clone, Default)]
pub struct ConnectClaim {
    /// Device serial, when the transport knows it (MQTT topic, WS Basic auth).
    pub device_serial: Option<String>,
    /// Device family code from the MQTT topic.
    pub type_code: Option<String>,
    /// Peer address for WebSocket connections.
    pub remote_addr: Option<String>,
}

/// Message accepted by a transport's writer task.
#[derive(Debug)]
pub enum SinkMessage {
    /// Serialize and deliver one frame.
    Frame(OcppFrame),
    /// Tear the channel down (repeated decode failures, shutdown).
    Close,
}

/// Sender half registered by a transport for a connected charger.
pub type FrameSink = mpsc::UnboundedSender<SinkMessage>;

/// Events flowing from a transport into the router.
#[derive(Debug)]
pub enum TransportEvent {
    /// A new channel was established for `charge_point_id`.
    Connected {
        charge_point_id: String,
        kind: TransportKind,
        claim: ConnectClaim,
        sink: FrameSink,
    },
    /// One raw frame arrived.
    Inbound {
        charge_point_id: String,
        text: String,
        received_at: DateTime<Utc>,
    },
    /// The channel closed (observed or synthesized).
    Disconnected {
        charge_point_id: String,
        reason: String,
        /// The sink of the channel that closed, when the transport observed
        /// the close itself. Lets the router ignore a stale disconnect that
        /// races with a newer channel for the same charger. `None` forces
        /// the detach (watchdog-synthesized disconnects).
        sink: Option<FrameSink>,
    },
}

/// Sender half of the router intake queue, cloned into each transport.
pub type TransportEventSender = mpsc::Sender<TransportEvent>;

/// Depth of the router intake queue shared by all transports.
pub const INTAKE_QUEUE_DEPTH: usize = 1024;
