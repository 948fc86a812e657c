//! Free-text and slug validation shared by listings, projects and messages.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MarketplaceError, MarketplaceResult};

/// Trim and check the length in characters.
pub fn bounded_text(field: &str, value: &str, min: usize, max: usize) -> MarketplaceResult<String> {
    let value = value.trim();
    let len = value.chars().count();
    if len < min || len > max {
        return Err(MarketplaceError::validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(value.to_string())
}

/// URL segment for categories: lower-case letters, digits and single hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn new(raw: &str) -> MarketplaceResult<Self> {
        let value = raw.trim();
        let valid = (2..=50).contains(&value.len())
            && value
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !value.starts_with('-')
            && !value.ends_with('-')
            && !value.contains("--");
        if !valid {
            return Err(MarketplaceError::validation(
                "Slug must be 2-50 lower-case letters, digits or single hyphens",
            ));
        }
        Ok(Self(value.to_string()))
    }

    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_text_trims() {
        assert_eq!(bounded_text("Title", "  Logo design  ", 3, 20).unwrap(), "Logo design");
        assert!(bounded_text("Title", "ab", 3, 20).is_err());
        assert!(bounded_text("Body", "", 1, 5000).is_err());
    }

    #[test]
    fn slugs() {
        assert!(Slug::new("graphic-design").is_ok());
        assert!(Slug::new("web3").is_ok());
        assert!(Slug::new("Graphic").is_err());
        assert!(Slug::new("-lead").is_err());
        assert!(Slug::new("double--dash").is_err());
        assert!(Slug::new("a").is_err());
    }
}
