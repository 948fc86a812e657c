//! User Name Value Object
//!
//! Public handle shown on profiles and used in profile URLs.
//! 3 to 30 characters of `[A-Za-z0-9_-]`; uniqueness is case-insensitive.

use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const USER_NAME_MIN_LENGTH: usize = 3;
pub const USER_NAME_MAX_LENGTH: usize = 30;

const RESERVED: &[&str] = &[
    "admin", "administrator", "api", "moderator", "root", "support", "system", "zomieks",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserName(String);

impl UserName {
    pub fn new(raw: impl AsRef<str>) -> AppResult<Self> {
        let value = raw.as_ref().trim();
        let len = value.chars().count();

        if !(USER_NAME_MIN_LENGTH..=USER_NAME_MAX_LENGTH).contains(&len) {
            return Err(AppError::bad_request(format!(
                "Username must be between {} and {} characters",
                USER_NAME_MIN_LENGTH, USER_NAME_MAX_LENGTH
            )));
        }

        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(AppError::bad_request(
                "Username may only contain letters, numbers, underscores and hyphens",
            ));
        }

        if RESERVED.contains(&value.to_ascii_lowercase().as_str()) {
            return Err(AppError::bad_request("This username is reserved")
                .with_action("Choose a different username"));
        }

        Ok(Self(value.to_string()))
    }

    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased form used for uniqueness checks and lookups.
    pub fn canonical(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(UserName::new("thandi_dev").is_ok());
        assert!(UserName::new("Sipho-99").is_ok());
        assert_eq!(UserName::new("  abc ").unwrap().as_str(), "abc");
    }

    #[test]
    fn length_bounds() {
        assert!(UserName::new("ab").is_err());
        assert!(UserName::new("a".repeat(31)).is_err());
        assert!(UserName::new("a".repeat(30)).is_ok());
    }

    #[test]
    fn rejects_symbols_and_reserved() {
        assert!(UserName::new("thandi.dev").is_err());
        assert!(UserName::new("thandi dev").is_err());
        assert!(UserName::new("Admin").is_err());
    }

    #[test]
    fn canonical_is_lowercase() {
        assert_eq!(UserName::new("ThandiDev").unwrap().canonical(), "thandidev");
    }
}
