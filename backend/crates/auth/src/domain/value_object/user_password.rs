//! User Password Value Object
//!
//! Domain wrapper over `platform::password` that turns policy violations
//! into user-facing messages.

use kernel::error::app_error::{AppError, AppResult};
use platform::password::{ClearTextPassword, HashedPassword, PasswordHashError, PasswordPolicyError};
use std::fmt;

/// Password typed by the user. Zeroized on drop.
pub struct RawPassword(ClearTextPassword);

impl RawPassword {
    /// Validate a new password (sign-up, password change).
    pub fn new(raw: String) -> AppResult<Self> {
        let clear_text = ClearTextPassword::new(raw).map_err(|e| match e {
            PasswordPolicyError::TooShort { .. } | PasswordPolicyError::TooLong { .. } => {
                AppError::bad_request(e.to_string())
            }
            PasswordPolicyError::EmptyOrWhitespace => {
                AppError::bad_request("Password is required")
            }
            PasswordPolicyError::InvalidCharacter => AppError::bad_request(e.to_string())
                .with_action("Remove any special control characters"),
            PasswordPolicyError::MissingUppercase
            | PasswordPolicyError::MissingLowercase
            | PasswordPolicyError::MissingDigit => AppError::bad_request(e.to_string())
                .with_action("Mix uppercase letters, lowercase letters and numbers"),
        })?;

        Ok(Self(clear_text))
    }

    /// Password submitted at sign-in; the policy is not re-applied.
    pub fn for_sign_in(raw: String) -> Self {
        Self(ClearTextPassword::for_verification(raw))
    }
}

impl fmt::Debug for RawPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawPassword").field(&"[REDACTED]").finish()
    }
}

/// Stored Argon2id hash.
#[derive(Clone, PartialEq, Eq)]
pub struct UserPassword(HashedPassword);

impl UserPassword {
    pub fn from_raw(raw: &RawPassword, pepper: Option<&[u8]>) -> Result<Self, PasswordHashError> {
        raw.0.hash(pepper).map(Self)
    }

    pub fn from_db(phc: impl Into<String>) -> Result<Self, PasswordHashError> {
        HashedPassword::from_phc_string(phc).map(Self)
    }

    pub fn as_phc_string(&self) -> &str {
        self.0.as_phc_string()
    }

    pub fn verify(&self, raw: &RawPassword, pepper: Option<&[u8]>) -> bool {
        self.0.verify(&raw.0, pepper)
    }
}

impl fmt::Debug for UserPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UserPassword").field(&"[HASH]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_message_is_user_facing() {
        let err = RawPassword::new("alllowercase1".to_string()).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.message().contains("uppercase"));
    }

    #[test]
    fn sign_in_password_skips_policy() {
        let stored = UserPassword::from_raw(&RawPassword::new("Capetown1".to_string()).unwrap(), None)
            .unwrap();
        assert!(stored.verify(&RawPassword::for_sign_in("Capetown1".to_string()), None));
        assert!(!stored.verify(&RawPassword::for_sign_in("short".to_string()), None));
    }
}
