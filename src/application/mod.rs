//! Use-case orchestration: codec, router, session engine, action handlers,
//! server-initiated commands, services, events and the control API.

pub mod codec;
pub mod commands;
pub mod control;
pub mod events;
pub mod handlers;
pub mod router;
pub mod services;
pub mod session;
pub mod transport;

pub use commands::{CommandError, CommandSender, SharedCommandSender};
pub use control::ControlApi;
pub use events::{create_event_bus, Event, EventBus, SharedEventBus};
pub use router::MessageRouter;
pub use session::{SessionRegistry, SessionState, SharedSessionRegistry};
pub use transport::{ConnectClaim, SinkMessage, TransportEvent, TransportKind};
