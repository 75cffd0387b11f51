//! Current-user extraction.
//!
//! The signed-in user lives in the browser session as an [`AuthSession`].
//! [`CurrentSession`] reads it at request start, refreshing an expired
//! access token on the way; a session whose refresh fails is dropped and the
//! request continues signed out.

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use tower_sessions::Session;

use crate::models::AuthSession;
use crate::models::session::keys;
use crate::services::AuthGateway;
use crate::state::AppState;

/// Extractor for the signed-in user's backend session, if any.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentSession(session): CurrentSession) -> impl IntoResponse {
///     match session {
///         Some(s) => format!("Hello, {}!", s.user.email),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct CurrentSession(pub Option<AuthSession>);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self(None));
        };

        let stored = match session.get::<AuthSession>(keys::AUTH_SESSION).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Failed to read auth session: {e}");
                None
            }
        };
        let Some(stored) = stored else {
            return Ok(Self(None));
        };

        let previous_token = stored.access_token.clone();
        let restored = AuthGateway::new(state.backend())
            .restore(stored, Utc::now())
            .await;

        let write = match &restored {
            Some(current) if current.access_token != previous_token => {
                set_current_session(session, current).await
            }
            Some(_) => Ok(()),
            None => clear_current_session(session).await,
        };
        if let Err(e) = write {
            tracing::warn!("Failed to update auth session: {e}");
        }

        Ok(Self(restored))
    }
}

/// Helper to store the signed-in user's backend session.
///
/// Cycles the session id first so a pre-login session id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn sign_in_session(
    session: &Session,
    auth: &AuthSession,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    set_current_session(session, auth).await
}

/// Helper to set the current backend session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_session(
    session: &Session,
    auth: &AuthSession,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::AUTH_SESSION, auth).await
}

/// Helper to clear the current backend session (sign-out).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_session(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session.remove::<AuthSession>(keys::AUTH_SESSION).await?;
    Ok(())
}
