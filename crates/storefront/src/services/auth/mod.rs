//! Authentication against the hosted auth API.
//!
//! Forms are validated locally first so obviously bad input never costs a
//! round-trip. Backend failures are classified into [`AuthError`] variants
//! the auth page can explain to the user.

mod error;

pub use error::AuthError;

use chrono::{DateTime, Utc};
use shophub_core::{validate_email, validate_password, validate_password_confirmation};
use tracing::{info, instrument, warn};

use crate::backend::{Backend, SignUpOutcome};
use crate::models::AuthSession;

use error::{classify_sign_in, classify_sign_up};

/// Sign-in, sign-up and sign-out for one request.
pub struct AuthGateway<'a> {
    backend: &'a dyn Backend,
}

impl<'a> AuthGateway<'a> {
    #[must_use]
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self { backend }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for malformed input, or a classified
    /// backend failure.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = validate_email(email)?;
        validate_password(password)?;

        match self.backend.sign_in_with_password(&email, password).await {
            Ok(session) => {
                info!(user_id = %session.user.id, "User signed in");
                Ok(session)
            }
            Err(e) => {
                let err = classify_sign_in(e);
                log_failure("sign in", &err);
                Err(err)
            }
        }
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for malformed input or mismatched
    /// passwords, or a classified backend failure.
    #[instrument(skip(self, password, confirm_password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let email = validate_email(email)?;
        validate_password(password)?;
        validate_password_confirmation(password, confirm_password)?;

        match self.backend.sign_up(&email, password).await {
            Ok(outcome) => {
                match &outcome {
                    SignUpOutcome::SignedIn(session) => {
                        info!(user_id = %session.user.id, "User signed up");
                    }
                    SignUpOutcome::ConfirmationRequired => {
                        info!("User signed up, email confirmation pending");
                    }
                }
                Ok(outcome)
            }
            Err(e) => {
                let err = classify_sign_up(e);
                log_failure("sign up", &err);
                Err(err)
            }
        }
    }

    /// Revoke the session's tokens.
    ///
    /// Best-effort: a failed revocation is logged and otherwise ignored, since
    /// the caller drops the session either way.
    #[instrument(skip(self, session), fields(user_id = %session.user.id))]
    pub async fn sign_out(&self, session: &AuthSession) {
        if let Err(e) = self.backend.sign_out(session).await {
            warn!("Failed to revoke session tokens: {e}");
        }
    }

    /// Bring a stored session up to date.
    ///
    /// Unexpired sessions are returned as they are. Expired ones are
    /// refreshed; if that fails the user is treated as signed out.
    #[instrument(skip(self, session), fields(user_id = %session.user.id))]
    pub async fn restore(&self, session: AuthSession, now: DateTime<Utc>) -> Option<AuthSession> {
        if !session.is_expired(now) {
            return Some(session);
        }

        match self.backend.refresh_session(&session).await {
            Ok(refreshed) => Some(refreshed),
            Err(e) => {
                warn!("Failed to refresh expired session: {e}");
                None
            }
        }
    }
}

fn log_failure(action: &str, err: &AuthError) {
    if err.is_backend_failure() {
        tracing::error!("Failed to {action}: {err:?}");
    } else {
        warn!("Failed to {action}: {err}");
    }
}
