//! Charge point endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::domain::charge_point::Location;
use crate::interfaces::http::common::{ApiError, ApiResponse, ValidatedJson};
use crate::interfaces::http::dto::{ChargerDto, CreateChargerRequest};
use crate::interfaces::http::router::ApiState;

#[utoipa::path(
    get,
    path = "/api/v1/chargers",
    tag = "Chargers",
    responses(
        (status = 200, description = "All charge points with derived flags", body = ApiResponse<Vec<ChargerDto>>)
    )
)]
pub async fn list_chargers(
    State(state): State<ApiState>,
) -> Result<Json<ApiResponse<Vec<ChargerDto>>>, ApiError> {
    let snapshots = state.control.list_charge_points().await?;
    let dtos = snapshots.into_iter().map(ChargerDto::from_snapshot).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

#[utoipa::path(
    get,
    path = "/api/v1/chargers/pending",
    tag = "Chargers",
    responses(
        (status = 200, description = "Chargers awaiting location/pricing configuration", body = ApiResponse<Vec<ChargerDto>>)
    )
)]
pub async fn list_pending_chargers(
    State(state): State<ApiState>,
) -> Result<Json<ApiResponse<Vec<ChargerDto>>>, ApiError> {
    let snapshots = state.control.list_pending_chargers().await?;
    let dtos = snapshots.into_iter().map(ChargerDto::from_snapshot).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

#[utoipa::path(
    get,
    path = "/api/v1/chargers/{id}",
    tag = "Chargers",
    params(("id" = String, Path, description = "Charge point id")),
    responses(
        (status = 200, description = "One charge point", body = ApiResponse<ChargerDto>),
        (status = 404, description = "Unknown charge point")
    )
)]
pub async fn get_charger(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ChargerDto>>, ApiError> {
    let snapshot = state.control.get_charge_point(&id).await?;
    Ok(Json(ApiResponse::success(ChargerDto::from_snapshot(snapshot))))
}

#[utoipa::path(
    post,
    path = "/api/v1/chargers",
    tag = "Chargers",
    request_body = CreateChargerRequest,
    responses(
        (status = 201, description = "Charge point created", body = ApiResponse<ChargerDto>),
        (status = 409, description = "Already exists"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn create_charger(
    State(state): State<ApiState>,
    ValidatedJson(body): ValidatedJson<CreateChargerRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ChargerDto>>), ApiError> {
    let snapshot = state
        .control
        .create_charge_point(
            &body.id,
            Location {
                latitude: body.latitude,
                longitude: body.longitude,
                address: body.address,
            },
            body.price_per_kwh,
            body.charging_rate,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ChargerDto::from_snapshot(snapshot))),
    ))
}
