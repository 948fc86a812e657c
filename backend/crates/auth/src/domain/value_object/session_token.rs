//! Session Token Value Object
//!
//! The raw token lives only in the client's cookie. The store is keyed by
//! its SHA-256 so a leaked store dump cannot be replayed as cookies.

use platform::crypto::{random_token, sha256_hex};
use std::fmt;

/// Random bytes per token (256 bits).
pub const SESSION_TOKEN_BYTES: usize = 32;

#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self {
        Self(random_token(SESSION_TOKEN_BYTES))
    }

    /// Token read back from a cookie. Empty values are rejected.
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        (!raw.trim().is_empty()).then_some(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex SHA-256 of the token, used as the store key.
    pub fn digest(&self) -> String {
        sha256_hex(self.0.as_bytes())
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionToken").field(&"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique() {
        let a = SessionToken::generate();
        let b = SessionToken::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 43);
    }

    #[test]
    fn digest_is_stable_and_hides_token() {
        let token = SessionToken::parse("abc").unwrap();
        assert_eq!(token.digest(), token.digest());
        assert_eq!(token.digest().len(), 64);
        assert!(!token.digest().contains("abc"));
    }

    #[test]
    fn parse_rejects_blank() {
        assert!(SessionToken::parse("").is_none());
        assert!(SessionToken::parse("   ").is_none());
    }
}
