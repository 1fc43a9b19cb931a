//! Statistics endpoints: history, heartbeat timeline, status timeline.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::interfaces::http::common::{ApiError, ApiResponse};
use crate::interfaces::http::dto::{DailyStatsDto, StatusPeriodDto};
use crate::interfaces::http::router::ApiState;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Window in days (1..=30)
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct WindowParams {
    /// Window in hours
    pub hours: Option<u32>,
}

#[utoipa::path(
    get,
    path = "/api/v1/statistics/charger/{id}/history",
    tag = "Statistics",
    params(
        ("id" = String, Path, description = "Charge point id"),
        ("days" = Option<u32>, Query, description = "Window in days, default 10")
    ),
    responses((status = 200, body = ApiResponse<Vec<DailyStatsDto>>))
)]
pub async fn charger_history(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<ApiResponse<Vec<DailyStatsDto>>>, ApiError> {
    let stats = state
        .control
        .get_history(&id, params.days.unwrap_or(10))
        .await?;
    let dtos = stats.into_iter().map(DailyStatsDto::from_domain).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

#[utoipa::path(
    get,
    path = "/api/v1/statistics/charger/{id}/heartbeat-history",
    tag = "Statistics",
    params(
        ("id" = String, Path, description = "Charge point id"),
        ("hours" = Option<u32>, Query, description = "Window in hours, default 24")
    ),
    responses((status = 200, body = ApiResponse<Vec<String>>))
)]
pub async fn heartbeat_history(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(params): Query<WindowParams>,
) -> Result<Json<ApiResponse<Vec<DateTime<Utc>>>>, ApiError> {
    let timeline = state
        .control
        .get_heartbeat_timeline(&id, params.hours.unwrap_or(24))
        .await?;
    Ok(Json(ApiResponse::success(timeline)))
}

#[utoipa::path(
    get,
    path = "/api/v1/statistics/charger/{id}/status-timeline",
    tag = "Statistics",
    params(
        ("id" = String, Path, description = "Charge point id"),
        ("hours" = Option<u32>, Query, description = "Window in hours, default 24")
    ),
    responses((status = 200, body = ApiResponse<Vec<StatusPeriodDto>>))
)]
pub async fn status_timeline(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(params): Query<WindowParams>,
) -> Result<Json<ApiResponse<Vec<StatusPeriodDto>>>, ApiError> {
    let periods = state
        .control
        .get_status_timeline(&id, params.hours.unwrap_or(24))
        .await?;
    let dtos = periods.into_iter().map(StatusPeriodDto::from_domain).collect();
    Ok(Json(ApiResponse::success(dtos)))
}
