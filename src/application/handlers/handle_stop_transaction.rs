//! StopTransaction handler

use rust_ocpp::v1_6::messages::stop_transaction::{
    StopTransactionRequest, StopTransactionResponse,
};
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::info;

use super::{internal, to_result_payload, SessionContext};
use crate::application::codec::CodecError;
use crate::application::events::{Event, TransactionStoppedEvent};

pub async fn handle_stop_transaction(
    ctx: &mut SessionContext,
    req: StopTransactionRequest,
) -> Result<Value, CodecError> {
    info!(
        charge_point_id = ctx.charge_point_id.as_str(),
        transaction_id = req.transaction_id,
        meter_stop = req.meter_stop,
        "StopTransaction"
    );

    let reason = req.reason.as_ref().map(|r| format!("{:?}", r));

    let closed = ctx
        .charging
        .stop_transaction(
            &ctx.store_id,
            req.transaction_id,
            req.meter_stop,
            req.timestamp,
            reason.clone(),
        )
        .await
        .map_err(internal)?;

    if let Some((session, order)) = closed {
        ctx.event_bus.publish(Event::TransactionStopped(TransactionStoppedEvent {
            charge_point_id: ctx.store_id.clone(),
            transaction_id: req.transaction_id,
            meter_stop: req.meter_stop,
            energy_kwh: session.energy_kwh().unwrap_or(Decimal::ZERO),
            total_cost: order.map(|o| o.total_amount),
            reason,
            timestamp: req.timestamp,
        }));
    }
    // No matching active session (double stop / replay): Accepted, no
    // mutation — the audit row was written by the service.

    to_result_payload(&StopTransactionResponse {
        id_tag_info: Some(IdTagInfo {
            status: AuthorizationStatus::Accepted,
            expiry_date: None,
            parent_id_tag: None,
        }),
    })
}
