//! Heartbeat handler

use chrono::Utc;
use rust_ocpp::v1_6::messages::heart_beat::{HeartbeatRequest, HeartbeatResponse};
use serde_json::Value;
use tracing::debug;

use super::{internal, to_result_payload, SessionContext};
use crate::application::codec::CodecError;
use crate::application::events::{Event, HeartbeatEvent};
use crate::domain::device_event::{DeviceEvent, EventKind};
use crate::domain::repositories::RepositoryProvider;

pub async fn handle_heartbeat(
    ctx: &mut SessionContext,
    _req: HeartbeatRequest,
) -> Result<Value, CodecError> {
    debug!(charge_point_id = ctx.charge_point_id.as_str(), "Heartbeat");

    ctx.charge_points
        .heartbeat(&ctx.store_id)
        .await
        .map_err(internal)?;
    ctx.cache.touch(&ctx.store_id);

    // The heartbeat timeline and the cold-start cache rebuild read these rows.
    ctx.repos
        .device_events()
        .append(DeviceEvent::new(&ctx.store_id, EventKind::Heartbeat))
        .await
        .map_err(internal)?;

    ctx.event_bus.publish(Event::HeartbeatReceived(HeartbeatEvent {
        charge_point_id: ctx.store_id.clone(),
        timestamp: Utc::now(),
    }));

    to_result_payload(&HeartbeatResponse {
        current_time: Utc::now(),
    })
}
