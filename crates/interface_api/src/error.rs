//! API error handling

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

use domain_billing::{BillingError, ErrorCategory};

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    /// Business rule rejected the request
    #[error("{0}")]
    DomainRule(String),

    /// The boleto provider failed; `details` carries its status and body
    #[error("{message}")]
    Provider {
        message: String,
        details: Vec<String>,
    },

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
                None,
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::DomainRule(msg) => (StatusCode::BAD_REQUEST, "domain_rule", msg, None),
            ApiError::Provider { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "provider_error",
                message,
                Some(details),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg,
                None,
            ),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg, None),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err.category() {
            ErrorCategory::Validation => ApiError::Validation(err.to_string()),
            ErrorCategory::NotFound => ApiError::NotFound(err.to_string()),
            ErrorCategory::Conflict => ApiError::Conflict(err.to_string()),
            ErrorCategory::DomainRule => ApiError::DomainRule(err.to_string()),
            ErrorCategory::Provider => {
                error!(error = %err, "Boleto provider failure");
                let details = match &err {
                    BillingError::Provider { status, body } => vec![
                        format!("provider_status: {}", status),
                        format!("provider_body: {}", body),
                    ],
                    other => vec![other.to_string()],
                };
                ApiError::Provider {
                    message: "Failed to issue boleto".to_string(),
                    details,
                }
            }
            ErrorCategory::Persistence => {
                error!(error = %err, "Persistence failure");
                ApiError::Internal("An internal error occurred".to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: BillingError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_billing_error_status_codes() {
        assert_eq!(status_of(BillingError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(BillingError::not_found("LedgerEntry", 1)), StatusCode::NOT_FOUND);
        assert_eq!(status_of(BillingError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(BillingError::rule("x")), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(BillingError::Provider { status: 422, body: "bad".into() }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(BillingError::Persistence("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_persistence_detail_stays_in_the_logs() {
        let err = ApiError::from(BillingError::Persistence(
            "error returned from database: relation \"ledger_entries\" does not exist".into(),
        ));
        match err {
            ApiError::Internal(message) => {
                assert_eq!(message, "An internal error occurred");
                assert!(!message.contains("ledger_entries"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_provider_details_embed_status_and_body() {
        let err = ApiError::from(BillingError::Provider {
            status: 422,
            body: "{\"error\":\"invalid document\"}".into(),
        });
        match err {
            ApiError::Provider { details, .. } => {
                assert_eq!(details[0], "provider_status: 422");
                assert!(details[1].contains("invalid document"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
