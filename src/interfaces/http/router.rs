//! API router with Swagger UI

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::application::control::ControlApi;
use crate::config::AppConfig;
use crate::interfaces::http::dto;
use crate::interfaces::http::handlers::{
    chargers, commands, devices, health, statistics, transactions,
};

/// Shared state for every control-plane handler.
#[derive(Clone)]
pub struct ApiState {
    pub control: Arc<ControlApi>,
    pub prometheus: PrometheusHandle,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        chargers::list_chargers,
        chargers::list_pending_chargers,
        chargers::get_charger,
        chargers::create_charger,
        commands::remote_start,
        commands::remote_stop,
        commands::reset,
        commands::change_availability,
        commands::trigger_message,
        commands::unlock_connector,
        commands::get_diagnostics,
        commands::update_firmware,
        commands::update_location,
        commands::update_price,
        statistics::charger_history,
        statistics::heartbeat_history,
        statistics::status_timeline,
        transactions::list_transactions,
        transactions::list_orders,
        devices::create_device,
        devices::list_devices,
    ),
    components(schemas(
        dto::ChargerDto,
        dto::ConnectorDto,
        dto::LocationDto,
        dto::CreateChargerRequest,
        dto::RemoteStartRequest,
        dto::RemoteStopRequest,
        dto::CommandResponse,
        dto::ResetRequestDto,
        dto::ChangeAvailabilityRequestDto,
        dto::TriggerMessageRequestDto,
        dto::UnlockConnectorRequestDto,
        dto::GetDiagnosticsRequestDto,
        dto::UpdateFirmwareRequestDto,
        dto::UpdateLocationRequest,
        dto::UpdatePriceRequest,
        dto::TransactionDto,
        dto::OrderDto,
        dto::DailyStatsDto,
        dto::StatusPeriodDto,
        dto::CreateDeviceRequest,
        dto::DeviceCredentialsDto,
        dto::DeviceDto,
        health::HealthResponse,
    )),
    tags(
        (name = "Chargers", description = "Charge point views and provisioning"),
        (name = "Commands", description = "Server-initiated OCPP commands"),
        (name = "Statistics", description = "Usage history and timelines"),
        (name = "Transactions", description = "Charging sessions and orders"),
        (name = "Devices", description = "Device credential provisioning"),
        (name = "Health", description = "Liveness and metrics"),
    ),
    info(
        title = "Voltra CSMS API",
        description = "Control plane of the OCPP 1.6J charging station management system"
    )
)]
pub struct ApiDoc;

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = &config.cors.allowed_origins;
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| o.parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(parsed)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Build the control-plane router.
pub fn create_api_router(
    control: Arc<ControlApi>,
    prometheus: PrometheusHandle,
    config: &AppConfig,
) -> Router {
    let state = ApiState {
        control,
        prometheus,
    };

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .route(
            "/api/v1/chargers",
            get(chargers::list_chargers).post(chargers::create_charger),
        )
        .route("/api/v1/chargers/pending", get(chargers::list_pending_chargers))
        .route("/api/v1/chargers/{id}", get(chargers::get_charger))
        .route("/api/remoteStart", post(commands::remote_start))
        .route("/api/remoteStop", post(commands::remote_stop))
        .route("/api/updateLocation", post(commands::update_location))
        .route("/api/updatePrice", post(commands::update_price))
        .route("/api/v1/commands/{id}/reset", post(commands::reset))
        .route(
            "/api/v1/commands/{id}/availability",
            post(commands::change_availability),
        )
        .route("/api/v1/commands/{id}/trigger", post(commands::trigger_message))
        .route("/api/v1/commands/{id}/unlock", post(commands::unlock_connector))
        .route(
            "/api/v1/commands/{id}/diagnostics",
            post(commands::get_diagnostics),
        )
        .route("/api/v1/commands/{id}/firmware", post(commands::update_firmware))
        .route(
            "/api/v1/statistics/charger/{id}/history",
            get(statistics::charger_history),
        )
        .route(
            "/api/v1/statistics/charger/{id}/heartbeat-history",
            get(statistics::heartbeat_history),
        )
        .route(
            "/api/v1/statistics/charger/{id}/status-timeline",
            get(statistics::status_timeline),
        )
        .route("/api/v1/transactions", get(transactions::list_transactions))
        .route("/api/v1/orders", get(transactions::list_orders))
        .route(
            "/api/v1/devices",
            get(devices::list_devices).post(devices::create_device),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config))
        .with_state(state)
}
