//! DataTransfer handler

use rust_ocpp::v1_6::messages::data_transfer::{DataTransferRequest, DataTransferResponse};
use rust_ocpp::v1_6::types::DataTransferStatus;
use serde_json::Value;
use tracing::info;

use super::{internal, to_result_payload, SessionContext};
use crate::application::codec::CodecError;
use crate::domain::device_event::{DeviceEvent, EventKind};
use crate::domain::repositories::RepositoryProvider;

/// Vendor-specific payloads are audited and acknowledged; the core
/// interprets none of them.
pub async fn handle_data_transfer(
    ctx: &mut SessionContext,
    req: DataTransferRequest,
) -> Result<Value, CodecError> {
    info!(
        charge_point_id = ctx.charge_point_id.as_str(),
        vendor_id = req.vendor_string.as_str(),
        message_id = ?req.message_id,
        "DataTransfer"
    );

    ctx.repos
        .device_events()
        .append(
            DeviceEvent::new(&ctx.store_id, EventKind::DataTransfer).with_payload(
                serde_json::json!({
                    "vendorId": req.vendor_string,
                    "messageId": req.message_id,
                    "data": req.data,
                }),
            ),
        )
        .await
        .map_err(internal)?;

    to_result_payload(&DataTransferResponse {
        status: DataTransferStatus::Accepted,
        data: None,
    })
}
