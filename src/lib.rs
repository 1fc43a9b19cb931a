//! # Voltra CSMS
//!
//! OCPP 1.6J charging station management system core: a transport-agnostic
//! message router and per-charge-point session engine speaking OCPP over
//! WebSocket and over a topic-addressed MQTT bus.
//!
//! ## Architecture
//!
//! - **support**: cross-cutting utilities (errors, OCPP-J framing, shutdown)
//! - **domain**: entities, value objects and repository traits
//! - **application**: codec, router, session engine, handlers, commands,
//!   services, events, control API
//! - **infrastructure**: database, in-memory store, liveness cache, device
//!   credential derivation
//! - **interfaces**: HTTP control plane, WebSocket and MQTT transports
//! - **config**: TOML-based application configuration

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod support;

// Re-export commonly used types at crate root
pub use application::control::ControlApi;
pub use application::events::{create_event_bus, Event, EventBus, SharedEventBus};
pub use application::{CommandSender, MessageRouter, SessionRegistry, SessionState, TransportKind};
pub use config::{default_config_path, AppConfig};
pub use infrastructure::{
    init_database, DatabaseConfig, InMemoryRepositoryProvider, LivenessCache,
    SeaOrmRepositoryProvider,
};
pub use interfaces::http::create_api_router;
pub use interfaces::mqtt::MqttTransport;
pub use interfaces::ws::OcppWsServer;
