//! Device provisioning endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::interfaces::http::common::{ApiError, ApiResponse, ValidatedJson};
use crate::interfaces::http::dto::{CreateDeviceRequest, DeviceCredentialsDto, DeviceDto};
use crate::interfaces::http::router::ApiState;

#[utoipa::path(
    post,
    path = "/api/v1/devices",
    tag = "Devices",
    request_body = CreateDeviceRequest,
    responses(
        (status = 201, description = "Device provisioned; credentials returned once", body = ApiResponse<DeviceCredentialsDto>),
        (status = 409, description = "Serial already provisioned")
    )
)]
pub async fn create_device(
    State(state): State<ApiState>,
    ValidatedJson(body): ValidatedJson<CreateDeviceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DeviceCredentialsDto>>), ApiError> {
    let credentials = state
        .control
        .create_device(&body.serial_number, &body.type_code, &body.master_secret)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(DeviceCredentialsDto::from_domain(
            credentials,
        ))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/devices",
    tag = "Devices",
    responses((status = 200, body = ApiResponse<Vec<DeviceDto>>))
)]
pub async fn list_devices(
    State(state): State<ApiState>,
) -> Result<Json<ApiResponse<Vec<DeviceDto>>>, ApiError> {
    let devices = state.control.list_devices().await?;
    let dtos = devices.into_iter().map(DeviceDto::from_domain).collect();
    Ok(Json(ApiResponse::success(dtos)))
}
