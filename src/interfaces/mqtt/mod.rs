//! OCPP-over-MQTT transport

mod envelope;
mod transport;

pub use envelope::MqttEnvelope;
pub use transport::MqttTransport;
