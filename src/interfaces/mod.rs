//! Delivery mechanisms: HTTP control plane, WebSocket and MQTT transports.

pub mod http;
pub mod mqtt;
pub mod ws;
