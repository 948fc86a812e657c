//! Email Value Object
//!
//! Lower-cased, syntactically plausible address. Ownership is proven
//! separately (`email_verified`).

use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Maximum email length (per RFC 5321)
const EMAIL_MAX_LENGTH: usize = 254;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    pub fn new(email: impl Into<String>) -> AppResult<Self> {
        let email = email.into().trim().to_lowercase();

        if email.is_empty() {
            return Err(AppError::bad_request("Email is required"));
        }

        if email.len() > EMAIL_MAX_LENGTH {
            return Err(AppError::bad_request(format!(
                "Email must be at most {} characters",
                EMAIL_MAX_LENGTH
            )));
        }

        if !Self::is_valid_format(&email) {
            return Err(AppError::bad_request("Invalid email address")
                .with_action("Enter an address like name@example.co.za"));
        }

        Ok(Self(email))
    }

    fn is_valid_format(email: &str) -> bool {
        let Some((local, domain)) = email.split_once('@') else {
            return false;
        };

        if local.is_empty() || local.len() > 64 || domain.contains('@') {
            return false;
        }

        if local.chars().any(char::is_whitespace) {
            return false;
        }

        if domain.is_empty() || !domain.contains('.') {
            return false;
        }

        if !domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return false;
        }

        !(domain.starts_with(['.', '-']) || domain.ends_with(['.', '-']) || domain.contains(".."))
    }

    /// Trusted value read back from the database.
    pub fn from_db(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Email {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        Email::new(s)
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_addresses() {
        assert!(Email::new("thandi@example.co.za").is_ok());
        assert!(Email::new("first.last+zomieks@mail.example.com").is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(Email::new("").is_err());
        assert!(Email::new("thandi.example.com").is_err());
        assert!(Email::new("thandi@").is_err());
        assert!(Email::new("@example.com").is_err());
        assert!(Email::new("thandi@@example.com").is_err());
        assert!(Email::new("thandi@example").is_err());
        assert!(Email::new("thandi@example..com").is_err());
        assert!(Email::new("tha ndi@example.com").is_err());
    }

    #[test]
    fn lowercases_and_trims() {
        let email = Email::new("  Thandi@Example.CO.ZA ").unwrap();
        assert_eq!(email.as_str(), "thandi@example.co.za");
    }
}
