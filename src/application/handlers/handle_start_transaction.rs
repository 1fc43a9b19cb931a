//! StartTransaction handler

use rust_ocpp::v1_6::messages::start_transaction::{
    StartTransactionRequest, StartTransactionResponse,
};
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;
use tracing::{info, warn};

use super::handle_authorize::map_tag_status;
use super::{internal, to_result_payload, SessionContext};
use crate::application::codec::CodecError;
use crate::application::events::{Event, TransactionStartedEvent};
use crate::domain::id_tag::TagStatus;
use crate::support::errors::DomainError;

fn rejection(status: AuthorizationStatus) -> Result<Value, CodecError> {
    to_result_payload(&StartTransactionResponse {
        transaction_id: 0,
        id_tag_info: IdTagInfo {
            status,
            expiry_date: None,
            parent_id_tag: None,
        },
    })
}

pub async fn handle_start_transaction(
    ctx: &mut SessionContext,
    req: StartTransactionRequest,
) -> Result<Value, CodecError> {
    info!(
        charge_point_id = ctx.charge_point_id.as_str(),
        connector_id = req.connector_id,
        id_tag = req.id_tag.as_str(),
        meter_start = req.meter_start,
        "StartTransaction"
    );

    let verdict = ctx.authorize_tag(&req.id_tag).await?;
    if verdict != TagStatus::Accepted {
        warn!(
            charge_point_id = ctx.charge_point_id.as_str(),
            id_tag = req.id_tag.as_str(),
            verdict = ?verdict,
            "StartTransaction rejected: tag not authorized"
        );
        return rejection(map_tag_status(verdict));
    }

    match ctx
        .charging
        .start_transaction(
            &ctx.store_id,
            req.connector_id,
            &req.id_tag,
            req.meter_start,
            req.timestamp,
        )
        .await
    {
        Ok(session) => {
            ctx.event_bus.publish(Event::TransactionStarted(TransactionStartedEvent {
                charge_point_id: ctx.store_id.clone(),
                connector_id: req.connector_id,
                transaction_id: session.transaction_id,
                id_tag: req.id_tag.clone(),
                meter_start: req.meter_start,
                timestamp: req.timestamp,
            }));

            to_result_payload(&StartTransactionResponse {
                transaction_id: session.transaction_id,
                id_tag_info: IdTagInfo {
                    status: AuthorizationStatus::Accepted,
                    expiry_date: None,
                    parent_id_tag: None,
                },
            })
        }
        // Another session is already active on this connector: protocol-level
        // rejection, not a CALLERROR.
        Err(DomainError::Conflict(_)) => {
            warn!(
                charge_point_id = ctx.charge_point_id.as_str(),
                connector_id = req.connector_id,
                "StartTransaction rejected: connector already has an active session"
            );
            rejection(AuthorizationStatus::ConcurrentTx)
        }
        Err(e) => Err(internal(e)),
    }
}
