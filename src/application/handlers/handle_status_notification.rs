//! StatusNotification handler

use chrono::Utc;
use rust_ocpp::v1_6::messages::status_notification::{
    StatusNotificationRequest, StatusNotificationResponse,
};
use rust_ocpp::v1_6::types::{ChargePointErrorCode, ChargePointStatus};
use serde_json::Value;
use tracing::info;

use super::{internal, to_result_payload, SessionContext};
use crate::application::codec::CodecError;
use crate::application::events::{ConnectorStatusChangedEvent, Event};
use crate::application::session::SessionState;
use crate::domain::charge_point::ConnectorStatus;

fn map_status(status: ChargePointStatus) -> ConnectorStatus {
    match status {
        ChargePointStatus::Available => ConnectorStatus::Available,
        ChargePointStatus::Preparing => ConnectorStatus::Preparing,
        ChargePointStatus::Charging => ConnectorStatus::Charging,
        ChargePointStatus::SuspendedEV => ConnectorStatus::SuspendedEV,
        ChargePointStatus::SuspendedEVSE => ConnectorStatus::SuspendedEVSE,
        ChargePointStatus::Finishing => ConnectorStatus::Finishing,
        ChargePointStatus::Reserved => ConnectorStatus::Reserved,
        ChargePointStatus::Unavailable => ConnectorStatus::Unavailable,
        ChargePointStatus::Faulted => ConnectorStatus::Faulted,
    }
}

pub async fn handle_status_notification(
    ctx: &mut SessionContext,
    req: StatusNotificationRequest,
) -> Result<Value, CodecError> {
    info!(
        charge_point_id = ctx.charge_point_id.as_str(),
        connector_id = req.connector_id,
        status = ?req.status,
        error_code = ?req.error_code,
        "StatusNotification"
    );

    let status = map_status(req.status);
    let error_code = match req.error_code {
        ChargePointErrorCode::NoError => None,
        other => Some(format!("{:?}", other)),
    };

    let aggregate = ctx
        .charge_points
        .update_connector_status(&ctx.store_id, req.connector_id, status, error_code.clone())
        .await
        .map_err(internal)?;

    // A connector back to Available with a session still open means the
    // stop was lost; close it as interrupted.
    if status == ConnectorStatus::Available && req.connector_id > 0 {
        ctx.charging
            .interrupt_abandoned(&ctx.store_id, req.connector_id)
            .await
            .map_err(internal)?;
    }

    ctx.cache.set_status(&ctx.store_id, aggregate.as_str());

    match ctx.registry.state(&ctx.charge_point_id) {
        Some(SessionState::Online) if aggregate == ConnectorStatus::Faulted => {
            ctx.registry
                .set_state(&ctx.charge_point_id, SessionState::Faulted);
        }
        Some(SessionState::Faulted) if aggregate != ConnectorStatus::Faulted => {
            ctx.registry
                .set_state(&ctx.charge_point_id, SessionState::Online);
        }
        _ => {}
    }

    ctx.event_bus
        .publish(Event::ConnectorStatusChanged(ConnectorStatusChangedEvent {
            charge_point_id: ctx.store_id.clone(),
            connector_id: req.connector_id,
            status: status.as_str().to_string(),
            previous_status: None,
            error_code,
            timestamp: req.timestamp.unwrap_or_else(Utc::now),
        }));

    to_result_payload(&StatusNotificationResponse {})
}
