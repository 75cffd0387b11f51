//! Session-related types.
//!
//! Types stored in the browser session for authentication state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use shophub_core::{Email, UserId};

/// Seconds before the real expiry at which an access token is treated as
/// expired, so a request never starts with a token that lapses mid-flight.
const EXPIRY_LEEWAY_SECS: i64 = 30;

/// The signed-in user as reported by the auth backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Backend user id; owns cart rows.
    pub id: UserId,
    /// Email the user signed in with.
    pub email: Email,
}

/// An authenticated backend session.
///
/// Stored server-side in the session table under [`keys::AUTH_SESSION`];
/// the browser only holds the session cookie.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: SessionUser,
    /// Bearer token for backend data calls.
    pub access_token: String,
    /// Token exchanged for a new access token once this one expires.
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    /// Whether the access token should be refreshed before use.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_LEEWAY_SECS) >= self.expires_at
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("user", &self.user)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current backend session.
    pub const AUTH_SESSION: &str = "auth_session";
}
