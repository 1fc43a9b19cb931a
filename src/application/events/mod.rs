//! Event bus and event types for real-time notifications.

mod event_bus;
mod types;

pub use event_bus::{create_event_bus, EventBus, EventSubscriber, SharedEventBus};
pub use types::{
    BootNotificationEvent, ChargePointConnectedEvent, ChargePointDisconnectedEvent,
    CommandIssuedEvent, ConnectorStatusChangedEvent, Event, EventMessage, HeartbeatEvent,
    MeterValuesEvent, TransactionStartedEvent, TransactionStoppedEvent,
};
