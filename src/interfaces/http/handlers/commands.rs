//! Server-initiated command endpoints and local configuration updates.
//!
//! Every OCPP-issuing endpoint answers 503 `ChargerOffline` when the
//! session is not Online; no frame is transmitted in that case.

use axum::extract::{Path, State};
use axum::Json;

use crate::application::commands::{Availability, ResetKind, TriggerType};
use crate::domain::charge_point::Location;
use crate::interfaces::http::common::{ApiError, ApiResponse, ValidatedJson};
use crate::interfaces::http::dto::{
    ChangeAvailabilityRequestDto, CommandResponse, GetDiagnosticsRequestDto, RemoteStartRequest,
    RemoteStopRequest, ResetRequestDto, TriggerMessageRequestDto, UnlockConnectorRequestDto,
    UpdateFirmwareRequestDto, UpdateLocationRequest, UpdatePriceRequest,
};
use crate::interfaces::http::router::ApiState;
use crate::support::errors::DomainError;

#[utoipa::path(
    post,
    path = "/api/remoteStart",
    tag = "Commands",
    request_body = RemoteStartRequest,
    responses(
        (status = 200, description = "Charger answered", body = ApiResponse<CommandResponse>),
        (status = 503, description = "Charger offline"),
        (status = 504, description = "Charger did not answer in time")
    )
)]
pub async fn remote_start(
    State(state): State<ApiState>,
    ValidatedJson(body): ValidatedJson<RemoteStartRequest>,
) -> Result<Json<ApiResponse<CommandResponse>>, ApiError> {
    let status = state
        .control
        .remote_start(&body.charge_point_id, &body.id_tag, body.connector_id)
        .await?;
    Ok(Json(ApiResponse::success(CommandResponse { status })))
}

#[utoipa::path(
    post,
    path = "/api/remoteStop",
    tag = "Commands",
    request_body = RemoteStopRequest,
    responses(
        (status = 200, description = "Charger answered", body = ApiResponse<CommandResponse>),
        (status = 422, description = "No or ambiguous active transaction"),
        (status = 503, description = "Charger offline")
    )
)]
pub async fn remote_stop(
    State(state): State<ApiState>,
    ValidatedJson(body): ValidatedJson<RemoteStopRequest>,
) -> Result<Json<ApiResponse<CommandResponse>>, ApiError> {
    let status = state
        .control
        .remote_stop(&body.charge_point_id, body.transaction_id)
        .await?;
    Ok(Json(ApiResponse::success(CommandResponse { status })))
}

#[utoipa::path(
    post,
    path = "/api/v1/commands/{id}/reset",
    tag = "Commands",
    params(("id" = String, Path, description = "Charge point id")),
    request_body = ResetRequestDto,
    responses((status = 200, body = ApiResponse<CommandResponse>))
)]
pub async fn reset(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<ResetRequestDto>,
) -> Result<Json<ApiResponse<CommandResponse>>, ApiError> {
    let kind = ResetKind::parse(&body.kind)
        .ok_or_else(|| DomainError::Validation(format!("invalid reset kind '{}'", body.kind)))?;
    let status = state.control.reset(&id, kind).await?;
    Ok(Json(ApiResponse::success(CommandResponse { status })))
}

#[utoipa::path(
    post,
    path = "/api/v1/commands/{id}/availability",
    tag = "Commands",
    params(("id" = String, Path, description = "Charge point id")),
    request_body = ChangeAvailabilityRequestDto,
    responses((status = 200, body = ApiResponse<CommandResponse>))
)]
pub async fn change_availability(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<ChangeAvailabilityRequestDto>,
) -> Result<Json<ApiResponse<CommandResponse>>, ApiError> {
    let availability = Availability::parse(&body.kind).ok_or_else(|| {
        DomainError::Validation(format!("invalid availability kind '{}'", body.kind))
    })?;
    let status = state
        .control
        .change_availability(&id, body.connector_id, availability)
        .await?;
    Ok(Json(ApiResponse::success(CommandResponse { status })))
}

#[utoipa::path(
    post,
    path = "/api/v1/commands/{id}/trigger",
    tag = "Commands",
    params(("id" = String, Path, description = "Charge point id")),
    request_body = TriggerMessageRequestDto,
    responses((status = 200, body = ApiResponse<CommandResponse>))
)]
pub async fn trigger_message(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<TriggerMessageRequestDto>,
) -> Result<Json<ApiResponse<CommandResponse>>, ApiError> {
    let requested = TriggerType::parse(&body.requested_message).ok_or_else(|| {
        DomainError::Validation(format!(
            "invalid requested message '{}'",
            body.requested_message
        ))
    })?;
    let status = state
        .control
        .trigger_message(&id, requested, body.connector_id)
        .await?;
    Ok(Json(ApiResponse::success(CommandResponse { status })))
}

#[utoipa::path(
    post,
    path = "/api/v1/commands/{id}/unlock",
    tag = "Commands",
    params(("id" = String, Path, description = "Charge point id")),
    request_body = UnlockConnectorRequestDto,
    responses((status = 200, body = ApiResponse<CommandResponse>))
)]
pub async fn unlock_connector(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UnlockConnectorRequestDto>,
) -> Result<Json<ApiResponse<CommandResponse>>, ApiError> {
    let status = state
        .control
        .unlock_connector(&id, body.connector_id)
        .await?;
    Ok(Json(ApiResponse::success(CommandResponse { status })))
}

#[utoipa::path(
    post,
    path = "/api/v1/commands/{id}/diagnostics",
    tag = "Commands",
    params(("id" = String, Path, description = "Charge point id")),
    request_body = GetDiagnosticsRequestDto,
    responses((status = 200, body = ApiResponse<CommandResponse>))
)]
pub async fn get_diagnostics(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<GetDiagnosticsRequestDto>,
) -> Result<Json<ApiResponse<CommandResponse>>, ApiError> {
    let file_name = state.control.get_diagnostics(&id, &body.location).await?;
    Ok(Json(ApiResponse::success(CommandResponse {
        status: file_name.unwrap_or_else(|| "Accepted".to_string()),
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/commands/{id}/firmware",
    tag = "Commands",
    params(("id" = String, Path, description = "Charge point id")),
    request_body = UpdateFirmwareRequestDto,
    responses((status = 200, body = ApiResponse<CommandResponse>))
)]
pub async fn update_firmware(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateFirmwareRequestDto>,
) -> Result<Json<ApiResponse<CommandResponse>>, ApiError> {
    state
        .control
        .update_firmware(&id, &body.location, body.retrieve_date)
        .await?;
    Ok(Json(ApiResponse::success(CommandResponse {
        status: "Accepted".to_string(),
    })))
}

#[utoipa::path(
    post,
    path = "/api/updateLocation",
    tag = "Commands",
    request_body = UpdateLocationRequest,
    responses((status = 200, body = ApiResponse<CommandResponse>))
)]
pub async fn update_location(
    State(state): State<ApiState>,
    ValidatedJson(body): ValidatedJson<UpdateLocationRequest>,
) -> Result<Json<ApiResponse<CommandResponse>>, ApiError> {
    state
        .control
        .update_location(
            &body.charge_point_id,
            Location {
                latitude: Some(body.latitude),
                longitude: Some(body.longitude),
                address: body.address,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(CommandResponse {
        status: "Updated".to_string(),
    })))
}

#[utoipa::path(
    post,
    path = "/api/updatePrice",
    tag = "Commands",
    request_body = UpdatePriceRequest,
    responses((status = 200, body = ApiResponse<CommandResponse>))
)]
pub async fn update_price(
    State(state): State<ApiState>,
    ValidatedJson(body): ValidatedJson<UpdatePriceRequest>,
) -> Result<Json<ApiResponse<CommandResponse>>, ApiError> {
    state
        .control
        .update_pricing(&body.charge_point_id, body.price_per_kwh, body.charging_rate)
        .await?;
    Ok(Json(ApiResponse::success(CommandResponse {
        status: "Updated".to_string(),
    })))
}
