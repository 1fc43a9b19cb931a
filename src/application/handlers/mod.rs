//! Charger-initiated action handlers.
//!
//! One file per action; `dispatch_call` is the exhaustive match the session
//! worker drives. Handlers return the CALLRESULT payload or a `CodecError`
//! that becomes a CALLERROR (store failures map to InternalError so the
//! transport-level redelivery can retry — the dedup window absorbs the
//! replay once a CALLRESULT has been produced).

mod handle_authorize;
mod handle_boot_notification;
mod handle_data_transfer;
mod handle_diagnostics_status_notification;
mod handle_firmware_status_notification;
mod handle_heartbeat;
mod handle_meter_values;
mod handle_start_transaction;
mod handle_status_notification;
mod handle_stop_transaction;

pub use handle_authorize::handle_authorize;
pub use handle_boot_notification::handle_boot_notification;
pub use handle_data_transfer::handle_data_transfer;
pub use handle_diagnostics_status_notification::handle_diagnostics_status_notification;
pub use handle_firmware_status_notification::handle_firmware_status_notification;
pub use handle_heartbeat::handle_heartbeat;
pub use handle_meter_values::handle_meter_values;
pub use handle_start_transaction::handle_start_transaction;
pub use handle_status_notification::handle_status_notification;
pub use handle_stop_transaction::handle_stop_transaction;

use std::sync::Arc;

use serde_json::Value;

use crate::application::codec::{CallErrorCode, ChargerCall, CodecError};
use crate::application::events::SharedEventBus;
use crate::application::services::{ChargePointService, ChargingService};
use crate::application::session::{AuthCache, SharedSessionRegistry};
use crate::config::AppConfig;
use crate::domain::id_tag::TagStatus;
use crate::domain::repositories::SharedRepositoryProvider;
use crate::infrastructure::cache::LivenessCache;
use crate::support::errors::DomainError;

/// Per-session handler state, owned by the session worker (single writer).
pub struct SessionContext {
    /// Registry key: the id the transport presented.
    pub charge_point_id: String,
    /// Store row id; may differ from the registry key when the first boot
    /// sanitized the charger-supplied id.
    pub store_id: String,
    pub repos: SharedRepositoryProvider,
    pub charge_points: Arc<ChargePointService>,
    pub charging: Arc<ChargingService>,
    pub registry: SharedSessionRegistry,
    pub cache: Arc<LivenessCache>,
    pub event_bus: SharedEventBus,
    pub auth_cache: AuthCache,
    pub heartbeat_interval_seconds: u32,
}

impl SessionContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        charge_point_id: impl Into<String>,
        repos: SharedRepositoryProvider,
        charge_points: Arc<ChargePointService>,
        charging: Arc<ChargingService>,
        registry: SharedSessionRegistry,
        cache: Arc<LivenessCache>,
        event_bus: SharedEventBus,
        config: &AppConfig,
    ) -> Self {
        let charge_point_id = charge_point_id.into();
        Self {
            store_id: charge_point_id.clone(),
            charge_point_id,
            repos,
            charge_points,
            charging,
            registry,
            cache,
            event_bus,
            auth_cache: AuthCache::new(1000, config.ocpp.authorize_cache_ttl_seconds),
            heartbeat_interval_seconds: config.ocpp.heartbeat_interval_seconds,
        }
    }

    /// Store-first authorization with the session cache as offline fallback.
    pub async fn authorize_tag(&mut self, tag: &str) -> Result<TagStatus, CodecError> {
        match self.charge_points.authorize(tag).await {
            Ok(status) => {
                self.auth_cache.insert(tag, status);
                self.cache.cache_id_tag(tag, status);
                Ok(status)
            }
            Err(DomainError::Store(_)) => match self.auth_cache.get(tag) {
                Some(cached) => Ok(cached),
                None => Err(CodecError::new(
                    CallErrorCode::InternalError,
                    "authorization store unavailable",
                )),
            },
            Err(e) => Err(CodecError::new(CallErrorCode::InternalError, e.to_string())),
        }
    }
}

/// Route a decoded action to its handler. Exhaustive by construction.
pub async fn dispatch_call(
    ctx: &mut SessionContext,
    call: ChargerCall,
) -> Result<Value, CodecError> {
    match call {
        ChargerCall::Authorize(req) => handle_authorize(ctx, req).await,
        ChargerCall::BootNotification(req) => handle_boot_notification(ctx, req).await,
        ChargerCall::DataTransfer(req) => handle_data_transfer(ctx, req).await,
        ChargerCall::DiagnosticsStatusNotification(req) => {
            handle_diagnostics_status_notification(ctx, req).await
        }
        ChargerCall::FirmwareStatusNotification(req) => {
            handle_firmware_status_notification(ctx, req).await
        }
        ChargerCall::Heartbeat(req) => handle_heartbeat(ctx, req).await,
        ChargerCall::MeterValues(req) => handle_meter_values(ctx, req).await,
        ChargerCall::StartTransaction(req) => handle_start_transaction(ctx, req).await,
        ChargerCall::StatusNotification(req) => handle_status_notification(ctx, req).await,
        ChargerCall::StopTransaction(req) => handle_stop_transaction(ctx, req).await,
    }
}

pub(crate) fn to_result_payload<T: serde::Serialize>(response: &T) -> Result<Value, CodecError> {
    serde_json::to_value(response)
        .map_err(|e| CodecError::new(CallErrorCode::InternalError, e.to_string()))
}

pub(crate) fn internal(e: impl std::fmt::Display) -> CodecError {
    CodecError::new(CallErrorCode::InternalError, e.to_string())
}
