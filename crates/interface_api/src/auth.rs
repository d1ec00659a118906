//! Authentication and authorization

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ApiError;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User's roles
    pub roles: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing permission: {0}")]
    MissingPermission(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingPermission(permission) => {
                ApiError::Forbidden(format!("missing permission {}", permission))
            }
            AuthError::InvalidToken | AuthError::TokenExpired => ApiError::Unauthorized,
        }
    }
}

/// Creates a new JWT token
///
/// # Arguments
///
/// * `user_id` - User identifier
/// * `roles` - User's roles
/// * `secret` - JWT secret key
/// * `expiration_secs` - Token validity in seconds
pub fn create_token(
    user_id: &str,
    roles: Vec<String>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        roles,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
///
/// # Arguments
///
/// * `token` - The JWT token to validate
/// * `secret` - JWT secret key
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Checks if user has required role
pub fn has_role(claims: &Claims, required_role: &str) -> bool {
    claims.roles.iter().any(|r| r == required_role || r == "admin")
}

/// Fails with `MissingPermission` unless the caller holds `permission`
pub fn require(claims: &Claims, permission: &str) -> Result<(), AuthError> {
    if has_role(claims, permission) {
        Ok(())
    } else {
        Err(AuthError::MissingPermission(permission.to_string()))
    }
}

/// Permission definitions
pub mod permissions {
    pub const LEDGER_READ: &str = "ledger:read";
    pub const LEDGER_WRITE: &str = "ledger:write";
    pub const CONTRACT_READ: &str = "contract:read";
    pub const CONTRACT_WRITE: &str = "contract:write";
    pub const PACKAGE_READ: &str = "package:read";
    pub const PACKAGE_WRITE: &str = "package:write";
    pub const SESSION_WRITE: &str = "session:write";
    pub const BOLETO_ISSUE: &str = "boleto:issue";
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_round_trip() {
        let token = create_token("reception", vec!["ledger:read".into()], SECRET, 60).unwrap();
        let claims = validate_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "reception");
        assert!(has_role(&claims, permissions::LEDGER_READ));
        assert!(!has_role(&claims, permissions::BOLETO_ISSUE));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_token("reception", vec![], SECRET, 60).unwrap();
        assert!(matches!(
            validate_token(&token, "other"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_admin_holds_every_permission() {
        let token = create_token("owner", vec!["admin".into()], SECRET, 60).unwrap();
        let claims = validate_token(&token, SECRET).unwrap();
        assert!(require(&claims, permissions::BOLETO_ISSUE).is_ok());
        assert!(require(&claims, permissions::PACKAGE_WRITE).is_ok());
    }
}
