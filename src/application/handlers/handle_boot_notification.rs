//! BootNotification handler

use chrono::Utc;
use rust_ocpp::v1_6::messages::boot_notification::{
    BootNotificationRequest, BootNotificationResponse,
};
use rust_ocpp::v1_6::types::RegistrationStatus;
use serde_json::Value;
use tracing::info;

use super::{internal, to_result_payload, SessionContext};
use crate::application::codec::CodecError;
use crate::application::events::{BootNotificationEvent, Event};
use crate::application::session::SessionState;
use crate::domain::device_event::{DeviceEvent, EventKind};
use crate::domain::repositories::RepositoryProvider;

pub async fn handle_boot_notification(
    ctx: &mut SessionContext,
    req: BootNotificationRequest,
) -> Result<Value, CodecError> {
    info!(
        charge_point_id = ctx.charge_point_id.as_str(),
        vendor = req.charge_point_vendor.as_str(),
        model = req.charge_point_model.as_str(),
        "BootNotification"
    );

    let outcome = ctx
        .charge_points
        .register_from_boot(
            &ctx.store_id,
            &req.charge_point_vendor,
            &req.charge_point_model,
            req.charge_point_serial_number.as_deref(),
            req.firmware_version.as_deref(),
        )
        .await
        .map_err(internal)?;

    if outcome.accepted {
        ctx.store_id = outcome.charge_point_id.clone();
        ctx.registry
            .set_state(&ctx.charge_point_id, SessionState::Online);

        ctx.repos
            .device_events()
            .append(
                DeviceEvent::new(&ctx.store_id, EventKind::Boot).with_payload(serde_json::json!({
                    "vendor": req.charge_point_vendor,
                    "model": req.charge_point_model,
                    "serialNumber": req.charge_point_serial_number,
                    "firmwareVersion": req.firmware_version,
                })),
            )
            .await
            .map_err(internal)?;
    }
    // Rejected chargers stay in Booting; they are expected to retry.

    ctx.event_bus.publish(Event::BootNotification(BootNotificationEvent {
        charge_point_id: ctx.store_id.clone(),
        vendor: req.charge_point_vendor.clone(),
        model: req.charge_point_model.clone(),
        serial_number: req.charge_point_serial_number.clone(),
        firmware_version: req.firmware_version.clone(),
        accepted: outcome.accepted,
        timestamp: Utc::now(),
    }));

    let response = BootNotificationResponse {
        current_time: Utc::now(),
        interval: ctx.heartbeat_interval_seconds as _,
        status: if outcome.accepted {
            RegistrationStatus::Accepted
        } else {
            RegistrationStatus::Rejected
        },
    };

    to_result_payload(&response)
}
