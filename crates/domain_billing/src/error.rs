//! Billing domain errors

use core_kernel::{MoneyError, PortError};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// Malformed input or a structural invariant violation
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Uniqueness violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Business rule violation (quota exhausted, entry not eligible, ...)
    #[error("{0}")]
    DomainRule(String),

    /// The boleto provider answered with a non-success status
    #[error("Boleto provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    /// Token handshake with the boleto provider failed
    #[error("Boleto provider authentication failed: {0}")]
    ProviderAuth(String),

    /// The boleto provider could not be reached
    #[error("Boleto provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Unexpected storage failure
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Coarse classification used by outer layers to pick a response code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    DomainRule,
    Provider,
    Persistence,
}

impl BillingError {
    pub fn validation(message: impl Into<String>) -> Self {
        BillingError::Validation(message.into())
    }

    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        BillingError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn rule(message: impl Into<String>) -> Self {
        BillingError::DomainRule(message.into())
    }

    /// Returns the category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            BillingError::Validation(_) => ErrorCategory::Validation,
            BillingError::NotFound { .. } => ErrorCategory::NotFound,
            BillingError::Conflict(_) => ErrorCategory::Conflict,
            BillingError::DomainRule(_) => ErrorCategory::DomainRule,
            BillingError::Provider { .. }
            | BillingError::ProviderAuth(_)
            | BillingError::ProviderUnavailable(_) => ErrorCategory::Provider,
            BillingError::Persistence(_) => ErrorCategory::Persistence,
        }
    }

    /// Translates an error raised by the boleto provider adapter
    ///
    /// Provider failures are never mistaken for storage failures, so the
    /// caller sees the upstream status and body.
    pub fn from_provider(error: PortError) -> Self {
        match error {
            PortError::Upstream { status, body } => BillingError::Provider { status, body },
            PortError::Unauthorized { message } => BillingError::ProviderAuth(message),
            PortError::Timeout { operation, duration_ms } => BillingError::ProviderUnavailable(
                format!("{} timed out after {}ms", operation, duration_ms),
            ),
            PortError::Connection { message, .. } => BillingError::ProviderUnavailable(message),
            other => BillingError::ProviderUnavailable(other.to_string()),
        }
    }
}

impl From<PortError> for BillingError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => BillingError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Validation { message, .. } => BillingError::Validation(message),
            PortError::Conflict { message } => BillingError::Conflict(message),
            other => BillingError::Persistence(other.to_string()),
        }
    }
}

impl From<MoneyError> for BillingError {
    fn from(error: MoneyError) -> Self {
        BillingError::Validation(error.to_string())
    }
}
