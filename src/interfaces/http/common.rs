//! Shared HTTP plumbing: response envelope, validated JSON extractor and the
//! domain-error → status-code mapping.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::support::errors::DomainError;

/// Uniform API response envelope.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Map a domain error onto the HTTP status the control plane exposes.
pub fn domain_error_status(e: &DomainError) -> StatusCode {
    match e {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Validation(_)
        | DomainError::NoActiveSession(_)
        | DomainError::AmbiguousSession(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::ChargerOffline(_) | DomainError::ChargerDisconnected(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        DomainError::ChargerBusy(_) => StatusCode::TOO_MANY_REQUESTS,
        DomainError::CommandTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        DomainError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Handler error type that renders as an `ApiResponse` envelope.
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = domain_error_status(&self.0);
        let body = ApiResponse::<()>::error(self.0.to_string());
        (status, Json(body)).into_response()
    }
}

/// An extractor that deserializes JSON and runs `validator::Validate`.
pub struct ValidatedJson<T>(pub T);

pub enum ValidatedJsonRejection {
    JsonError(JsonRejection),
    ValidationError(validator::ValidationErrors),
}

impl IntoResponse for ValidatedJsonRejection {
    fn into_response(self) -> Response {
        match self {
            Self::JsonError(rejection) => {
                let body = ApiResponse::<()>::error(format!("Invalid JSON: {}", rejection));
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            Self::ValidationError(errors) => {
                let field_errors: Vec<String> = errors
                    .field_errors()
                    .iter()
                    .flat_map(|(field, errs)| {
                        errs.iter().map(move |e| {
                            let msg = e
                                .message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| format!("{:?}", e.code));
                            format!("{}: {}", field, msg)
                        })
                    })
                    .collect();

                let message = if field_errors.is_empty() {
                    "Validation failed".to_string()
                } else {
                    field_errors.join("; ")
                };

                let body = ApiResponse::<()>::error(message);
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            }
        }
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidatedJsonRejection;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidatedJsonRejection::JsonError)?;

        value
            .validate()
            .map_err(ValidatedJsonRejection::ValidationError)?;

        Ok(ValidatedJson(value))
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope() {
        let resp = ApiResponse::success(5);
        assert!(resp.success);
        assert_eq!(resp.data, Some(5));
        assert!(resp.error.is_none());
    }

    #[test]
    fn error_envelope() {
        let resp: ApiResponse<()> = ApiResponse::error("boom");
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("boom"));
    }

    #[test]
    fn offline_maps_to_service_unavailable() {
        let status = domain_error_status(&DomainError::ChargerOffline("CP-001".into()));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn busy_maps_to_too_many_requests() {
        let status = domain_error_status(&DomainError::ChargerBusy("CP-001".into()));
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn timeout_maps_to_gateway_timeout() {
        let status = domain_error_status(&DomainError::CommandTimeout("CP-001".into()));
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    }
}
