//! Per-charger session infrastructure: the live-connection registry, the
//! bounded inbound queue and the authorization cache.

mod auth_cache;
mod inbox;
mod registry;

pub use auth_cache::AuthCache;
pub use inbox::{Inbox, InboundCall};
pub use registry::{Connection, RegisterOutcome, SessionRegistry, SharedSessionRegistry};

use serde::{Deserialize, Serialize};

/// Per-charge-point protocol state.
///
/// Sessions outlive connections: `Disconnected` is not terminal and the
/// authorization cache survives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Disconnected,
    Booting,
    Online,
    Faulted,
    Unavailable,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Booting => "Booting",
            Self::Online => "Online",
            Self::Faulted => "Faulted",
            Self::Unavailable => "Unavailable",
        }
    }

    /// Whether the charger is reachable at all (any connected state).
    pub fn is_connected(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
