use thiserror::Error;

/// Business-rule and protocol-state errors.
///
/// Inbound OCPP handlers never surface these to the transport beyond a
/// CALLERROR or a protocol-level rejection payload; control-plane callers
/// receive them verbatim.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Charge point {0} is not online")]
    ChargerOffline(String),

    #[error("Charge point {0} has too many queued commands")]
    ChargerBusy(String),

    #[error("Charge point {0} disconnected while a command was pending")]
    ChargerDisconnected(String),

    #[error("Command timeout for {0}")]
    CommandTimeout(String),

    #[error("No active charging session on {0}")]
    NoActiveSession(String),

    #[error("Multiple active charging sessions on {0}; transaction id required")]
    AmbiguousSession(String),

    #[error("Store error: {0}")]
    Store(String),
}

/// Infrastructure failures (database, serialization, transports).
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Infra(#[from] InfraError),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Store(e.to_string())
    }
}
