//! Pre-submission checks for the sign-in and sign-up forms.
//!
//! These run before any request reaches the auth backend, so an obviously
//! bad form never costs a network round-trip.

use thiserror::Error;

use crate::types::{Email, EmailError};

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// A form value rejected before submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The email is not a well-formed address or is too long.
    #[error("Invalid email address: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The password is shorter than [`MIN_PASSWORD_LENGTH`].
    #[error("Password must be at least {min} characters")]
    PasswordTooShort {
        /// Required minimum length.
        min: usize,
    },

    /// The sign-up password and its confirmation differ.
    #[error("Passwords don't match")]
    PasswordMismatch,
}

/// Check an email address.
///
/// # Errors
///
/// Returns `ValidationError::InvalidEmail` if the address is malformed or
/// longer than [`Email::MAX_LENGTH`].
pub fn validate_email(input: &str) -> Result<Email, ValidationError> {
    Ok(Email::parse(input)?)
}

/// Check a password's length.
///
/// # Errors
///
/// Returns `ValidationError::PasswordTooShort` if the password has fewer than
/// [`MIN_PASSWORD_LENGTH`] characters.
pub fn validate_password(input: &str) -> Result<(), ValidationError> {
    if input.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

/// Check that the sign-up confirmation matches the password.
///
/// # Errors
///
/// Returns `ValidationError::PasswordMismatch` if they differ.
pub fn validate_password_confirmation(password: &str, confirm: &str) -> Result<(), ValidationError> {
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_examples() {
        assert!(matches!(
            validate_email("not-an-email"),
            Err(ValidationError::InvalidEmail(EmailError::MissingAtSymbol))
        ));
        assert!(validate_email("a@b.com").is_ok());
    }

    #[test]
    fn test_email_too_long_is_format_error() {
        let long = format!("{}@example.com", "x".repeat(300));
        assert!(matches!(
            validate_email(&long),
            Err(ValidationError::InvalidEmail(EmailError::TooLong { .. }))
        ));
    }

    #[test]
    fn test_password_examples() {
        assert_eq!(
            validate_password("abc"),
            Err(ValidationError::PasswordTooShort { min: 6 })
        );
        assert_eq!(validate_password("abcdef"), Ok(()));
    }

    #[test]
    fn test_password_counts_characters_not_bytes() {
        // Five multi-byte characters are still too short.
        assert!(validate_password("ééééé").is_err());
        assert!(validate_password("éééééé").is_ok());
    }

    #[test]
    fn test_password_confirmation() {
        assert_eq!(validate_password_confirmation("secret1", "secret1"), Ok(()));
        assert_eq!(
            validate_password_confirmation("secret1", "secret2"),
            Err(ValidationError::PasswordMismatch)
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ValidationError::PasswordTooShort { min: 6 }.to_string(),
            "Password must be at least 6 characters"
        );
        assert_eq!(
            ValidationError::InvalidEmail(EmailError::MissingAtSymbol).to_string(),
            "Invalid email address: email must contain an @ symbol"
        );
    }
}
