//! Authorize handler

use rust_ocpp::v1_6::messages::authorize::{AuthorizeRequest, AuthorizeResponse};
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;
use tracing::info;

use super::{to_result_payload, SessionContext};
use crate::application::codec::CodecError;
use crate::domain::id_tag::TagStatus;

pub(crate) fn map_tag_status(status: TagStatus) -> AuthorizationStatus {
    match status {
        TagStatus::Accepted => AuthorizationStatus::Accepted,
        TagStatus::Blocked => AuthorizationStatus::Blocked,
        TagStatus::Expired => AuthorizationStatus::Expired,
        TagStatus::Invalid => AuthorizationStatus::Invalid,
        TagStatus::ConcurrentTx => AuthorizationStatus::ConcurrentTx,
    }
}

pub async fn handle_authorize(
    ctx: &mut SessionContext,
    req: AuthorizeRequest,
) -> Result<Value, CodecError> {
    let status = ctx.authorize_tag(&req.id_tag).await?;

    info!(
        charge_point_id = ctx.charge_point_id.as_str(),
        id_tag = req.id_tag.as_str(),
        status = ?status,
        "Authorize"
    );

    let response = AuthorizeResponse {
        id_tag_info: IdTagInfo {
            status: map_tag_status(status),
            expiry_date: None,
            parent_id_tag: None,
        },
    };
    to_result_payload(&response)
}
