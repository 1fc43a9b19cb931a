//! Transaction and order listings

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::interfaces::http::common::{ApiError, ApiResponse};
use crate::interfaces::http::dto::{OrderDto, TransactionDto};
use crate::interfaces::http::router::ApiState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    tag = "Transactions",
    params(("limit" = Option<u64>, Query, description = "Max rows, default 100")),
    responses((status = 200, body = ApiResponse<Vec<TransactionDto>>))
)]
pub async fn list_transactions(
    State(state): State<ApiState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<TransactionDto>>>, ApiError> {
    let sessions = state
        .control
        .list_transactions(params.limit.unwrap_or(100).min(1000))
        .await?;
    let dtos = sessions.into_iter().map(TransactionDto::from_domain).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    tag = "Transactions",
    params(("limit" = Option<u64>, Query, description = "Max rows, default 100")),
    responses((status = 200, body = ApiResponse<Vec<OrderDto>>))
)]
pub async fn list_orders(
    State(state): State<ApiState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<OrderDto>>>, ApiError> {
    let orders = state
        .control
        .list_orders(params.limit.unwrap_or(100).min(1000))
        .await?;
    let dtos = orders.into_iter().map(OrderDto::from_domain).collect();
    Ok(Json(ApiResponse::success(dtos)))
}
