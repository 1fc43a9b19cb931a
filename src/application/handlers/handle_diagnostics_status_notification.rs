//! DiagnosticsStatusNotification handler

use rust_ocpp::v1_6::messages::diagnostics_status_notification::{
    DiagnosticsStatusNotificationRequest, DiagnosticsStatusNotificationResponse,
};
use serde_json::Value;
use tracing::info;

use super::{internal, to_result_payload, SessionContext};
use crate::application::codec::CodecError;
use crate::domain::device_event::{DeviceEvent, EventKind};
use crate::domain::repositories::RepositoryProvider;

pub async fn handle_diagnostics_status_notification(
    ctx: &mut SessionContext,
    req: DiagnosticsStatusNotificationRequest,
) -> Result<Value, CodecError> {
    info!(
        charge_point_id = ctx.charge_point_id.as_str(),
        status = ?req.status,
        "DiagnosticsStatusNotification"
    );

    ctx.repos
        .device_events()
        .append(
            DeviceEvent::new(&ctx.store_id, EventKind::DiagnosticsStatus).with_payload(
                serde_json::json!({
                    "status": format!("{:?}", req.status),
                }),
            ),
        )
        .await
        .map_err(internal)?;

    to_result_payload(&DiagnosticsStatusNotificationResponse {})
}
