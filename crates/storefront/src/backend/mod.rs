//! Client for the hosted data/auth backend.
//!
//! # Architecture
//!
//! - The backend is the source of truth: NO local sync, direct API calls
//! - Row API speaks the `PostgREST` wire format (`/rest/v1/{table}`)
//! - Auth API speaks the `GoTrue` wire format (`/auth/v1/...`)
//! - Optional in-memory caching of catalog reads via `moka`
//!
//! Handlers only see the [`Backend`] trait; the production implementation
//! is [`HostedBackend`]. An in-memory implementation lives in
//! `memory` (behind the `memory-backend` feature) for tests.

mod cache;
mod hosted;
#[cfg(any(test, feature = "memory-backend"))]
pub mod memory;

pub use cache::ProductCache;
pub use hosted::HostedBackend;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use shophub_core::{CartLine, CartLineId, Email, Product, ProductId, Quantity};

use crate::models::AuthSession;

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend error ({status}): {message}")]
    Api {
        status: u16,
        /// Structured error code (`error_code` for auth, `code` for rows).
        code: Option<String>,
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The response was well-formed but not what the call expects.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl BackendError {
    /// Structured error code reported by the backend, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Human-readable message as reported by the backend.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status of an API error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build an API error from a non-success response body.
    ///
    /// Understands both the auth error shape (`error_code`/`msg`, or the
    /// older `error`/`error_description`) and the row API shape
    /// (`code`/`message`). Unparseable bodies are kept verbatim.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            error_code: Option<String>,
            code: Option<serde_json::Value>,
            error: Option<String>,
            msg: Option<String>,
            message: Option<String>,
            error_description: Option<String>,
        }

        let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
            return Self::Api {
                status,
                code: None,
                message: body.chars().take(200).collect(),
            };
        };

        // GoTrue puts the HTTP status in a numeric `code`; only string codes
        // are meaningful.
        let string_code = match parsed.code {
            Some(serde_json::Value::String(code)) => Some(code),
            _ => None,
        };

        let code = parsed
            .error_code
            .or(string_code)
            .or_else(|| parsed.error.clone());
        let message = parsed
            .msg
            .or(parsed.message)
            .or(parsed.error_description)
            .or(parsed.error)
            .unwrap_or_else(|| format!("HTTP {status}"));

        Self::Api {
            status,
            code,
            message,
        }
    }
}

/// Result of a sign-up request.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The account was created and a session issued.
    SignedIn(AuthSession),
    /// The account was created but must be confirmed by email first.
    ConfirmationRequired,
}

/// Operations the storefront needs from the hosted backend.
///
/// Cart calls take the caller's [`AuthSession`]; every cart read and write
/// is filtered by the session's user id.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Exchange email and password for a session.
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<AuthSession, BackendError>;

    /// Create an account.
    async fn sign_up(&self, email: &Email, password: &str) -> Result<SignUpOutcome, BackendError>;

    /// Revoke the session's tokens.
    async fn sign_out(&self, session: &AuthSession) -> Result<(), BackendError>;

    /// Exchange a refresh token for a new session.
    async fn refresh_session(&self, session: &AuthSession) -> Result<AuthSession, BackendError>;

    /// All products, newest first.
    async fn list_products(&self) -> Result<Vec<Product>, BackendError>;

    /// A single product, or `None` if no product has this id.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, BackendError>;

    /// The session user's cart lines joined with product data, in backend
    /// order.
    async fn list_cart_lines(&self, session: &AuthSession) -> Result<Vec<CartLine>, BackendError>;

    /// Insert a new cart line for the session user.
    async fn insert_cart_line(
        &self,
        session: &AuthSession,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<(), BackendError>;

    /// Set the quantity of one of the session user's lines.
    async fn update_cart_line_quantity(
        &self,
        session: &AuthSession,
        line_id: CartLineId,
        quantity: Quantity,
    ) -> Result<(), BackendError>;

    /// Delete one of the session user's lines. Deleting a missing line is
    /// not an error.
    async fn delete_cart_line(
        &self,
        session: &AuthSession,
        line_id: CartLineId,
    ) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_auth_shape() {
        let err = BackendError::from_response(
            400,
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        );
        assert_eq!(err.code(), Some("invalid_credentials"));
        assert_eq!(err.message(), "Invalid login credentials");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_from_response_legacy_auth_shape() {
        let err = BackendError::from_response(
            400,
            r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#,
        );
        assert_eq!(err.code(), Some("invalid_grant"));
        assert_eq!(err.message(), "Email not confirmed");
    }

    #[test]
    fn test_from_response_row_shape() {
        let err = BackendError::from_response(
            400,
            r#"{"code":"22P02","message":"invalid input syntax for type uuid","details":null,"hint":null}"#,
        );
        assert_eq!(err.code(), Some("22P02"));
        assert_eq!(err.message(), "invalid input syntax for type uuid");
    }

    #[test]
    fn test_from_response_plain_text() {
        let err = BackendError::from_response(502, "Bad Gateway");
        assert_eq!(err.code(), None);
        assert_eq!(err.message(), "Bad Gateway");
    }

    #[test]
    fn test_non_api_errors_have_no_code() {
        let err = BackendError::RateLimited(3);
        assert_eq!(err.code(), None);
        assert_eq!(err.status(), None);
        assert_eq!(err.message(), "Rate limited, retry after 3 seconds");
    }
}
