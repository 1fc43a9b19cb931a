//! OCPP 1.6J WebSocket transport

mod server;

pub use server::{extract_charge_point_id, OcppWsServer};
