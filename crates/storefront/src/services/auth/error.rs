//! Authentication error types and backend error classification.

use shophub_core::ValidationError;
use thiserror::Error;

use crate::backend::BackendError;
use crate::notifications::Toast;

/// Errors that can occur during authentication operations.
///
/// The display text is what the user is shown.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The form was rejected before reaching the backend.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Wrong email or password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The account exists but its email has not been confirmed.
    #[error("Please confirm your email address")]
    EmailNotConfirmed,

    /// Sign-up with an email that already has an account.
    #[error("An account with this email already exists")]
    UserAlreadyExists,

    /// The backend rejected the password.
    #[error("Password is too weak")]
    WeakPassword,

    /// Any other sign-in failure.
    #[error("Failed to sign in")]
    SignInFailed(#[source] BackendError),

    /// Any other sign-up failure.
    #[error("Failed to create account")]
    SignUpFailed(#[source] BackendError),
}

impl AuthError {
    /// Toast heading for this error.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::InvalidEmail(_)) => "Invalid Email",
            Self::Validation(ValidationError::PasswordTooShort { .. }) => "Invalid Password",
            Self::Validation(ValidationError::PasswordMismatch) => "Passwords Don't Match",
            Self::InvalidCredentials | Self::EmailNotConfirmed | Self::SignInFailed(_) => {
                "Sign In Failed"
            }
            Self::UserAlreadyExists | Self::WeakPassword | Self::SignUpFailed(_) => {
                "Sign Up Failed"
            }
        }
    }

    /// Toast body for this error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(ValidationError::PasswordMismatch) => {
                "Please make sure both passwords are the same".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Error toast for this failure.
    #[must_use]
    pub fn toast(&self) -> Toast {
        Toast::error(self.title(), self.user_message())
    }

    /// Whether the backend call itself failed (as opposed to the user's
    /// input being wrong).
    #[must_use]
    pub const fn is_backend_failure(&self) -> bool {
        matches!(self, Self::SignInFailed(_) | Self::SignUpFailed(_))
    }
}

/// Map a failed sign-in to a user-facing error.
///
/// The structured error code decides when present; the message text is
/// the fallback for backends that only send a description.
pub(crate) fn classify_sign_in(err: BackendError) -> AuthError {
    match err.code() {
        Some("invalid_credentials") => return AuthError::InvalidCredentials,
        Some("email_not_confirmed") => return AuthError::EmailNotConfirmed,
        _ => {}
    }

    let message = err.message();
    if contains_ignore_case(&message, "Invalid login credentials") {
        AuthError::InvalidCredentials
    } else if contains_ignore_case(&message, "Email not confirmed") {
        AuthError::EmailNotConfirmed
    } else {
        AuthError::SignInFailed(err)
    }
}

/// Map a failed sign-up to a user-facing error.
pub(crate) fn classify_sign_up(err: BackendError) -> AuthError {
    match err.code() {
        Some("user_already_exists" | "email_exists") => return AuthError::UserAlreadyExists,
        Some("weak_password") => return AuthError::WeakPassword,
        _ => {}
    }

    let message = err.message();
    if contains_ignore_case(&message, "User already registered") {
        AuthError::UserAlreadyExists
    } else if contains_ignore_case(&message, "Password should be at least") {
        AuthError::WeakPassword
    } else {
        AuthError::SignUpFailed(err)
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
