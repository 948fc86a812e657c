//! Password policy and hashing.
//!
//! Policy: 8 to 128 code points after NFKC normalization, with at least
//! one uppercase letter, one lowercase letter and one digit.
//!
//! Hashing uses Argon2id with a random salt and an optional
//! application-wide pepper. The clear text is zeroized on drop.

use std::fmt;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters")]
    TooLong { max: usize, actual: usize },

    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    #[error("Password contains invalid control characters")]
    InvalidCharacter,

    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,

    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,

    #[error("Password must contain at least one number")]
    MissingDigit,
}

#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Clear text password, zeroized when dropped.
///
/// Deliberately not `Clone`; `Debug` output is redacted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Normalize and validate against the registration policy.
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let raw = Zeroizing::new(raw);
        let normalized: String = raw.nfkc().collect();
        let candidate = Self(normalized);
        candidate.check_policy()?;
        Ok(candidate)
    }

    /// Normalize without enforcing the policy.
    ///
    /// Sign-in must accept whatever was valid when the account was created.
    pub fn for_verification(raw: String) -> Self {
        let raw = Zeroizing::new(raw);
        Self(raw.nfkc().collect())
    }

    fn check_policy(&self) -> Result<(), PasswordPolicyError> {
        let value = &self.0;

        if value.trim().is_empty() {
            return Err(PasswordPolicyError::EmptyOrWhitespace);
        }

        let char_count = value.chars().count();
        if char_count < MIN_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: MIN_PASSWORD_LENGTH,
                actual: char_count,
            });
        }
        if char_count > MAX_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: MAX_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        if value
            .chars()
            .any(|ch| ch.is_control() && ch != ' ' && ch != '\t')
        {
            return Err(PasswordPolicyError::InvalidCharacter);
        }

        if !value.chars().any(char::is_uppercase) {
            return Err(PasswordPolicyError::MissingUppercase);
        }
        if !value.chars().any(char::is_lowercase) {
            return Err(PasswordPolicyError::MissingLowercase);
        }
        if !value.chars().any(|c| c.is_ascii_digit()) {
            return Err(PasswordPolicyError::MissingDigit);
        }

        Ok(())
    }

    fn peppered(&self, pepper: Option<&[u8]>) -> Zeroizing<Vec<u8>> {
        let mut bytes = self.0.as_bytes().to_vec();
        if let Some(p) = pepper {
            bytes.extend_from_slice(p);
        }
        Zeroizing::new(bytes)
    }

    /// Hash with Argon2id (default params: m=19456, t=2, p=1).
    pub fn hash(&self, pepper: Option<&[u8]>) -> Result<HashedPassword, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(&self.peppered(pepper), &salt)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;

        Ok(HashedPassword {
            hash: hash.to_string(),
        })
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

/// Argon2id hash in PHC string format, safe to store.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();
        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        Ok(Self { hash })
    }

    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    /// Argon2 compares in constant time internally.
    pub fn verify(&self, password: &ClearTextPassword, pepper: Option<&[u8]>) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(&password.peppered(pepper), &parsed_hash)
            .is_ok()
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_password() {
        let result = ClearTextPassword::new("Ab1".to_string());
        assert!(matches!(
            result,
            Err(PasswordPolicyError::TooShort { min: 8, actual: 3 })
        ));
    }

    #[test]
    fn rejects_long_password() {
        let long = format!("Aa1{}", "x".repeat(MAX_PASSWORD_LENGTH));
        assert!(matches!(
            ClearTextPassword::new(long),
            Err(PasswordPolicyError::TooLong { .. })
        ));
    }

    #[test]
    fn rejects_whitespace_only() {
        assert!(matches!(
            ClearTextPassword::new("          ".to_string()),
            Err(PasswordPolicyError::EmptyOrWhitespace)
        ));
    }

    #[test]
    fn requires_character_classes() {
        assert!(matches!(
            ClearTextPassword::new("lowercase1".to_string()),
            Err(PasswordPolicyError::MissingUppercase)
        ));
        assert!(matches!(
            ClearTextPassword::new("UPPERCASE1".to_string()),
            Err(PasswordPolicyError::MissingLowercase)
        ));
        assert!(matches!(
            ClearTextPassword::new("NoDigitsHere".to_string()),
            Err(PasswordPolicyError::MissingDigit)
        ));
    }

    #[test]
    fn accepts_valid_password() {
        assert!(ClearTextPassword::new("Joburg2024".to_string()).is_ok());
    }

    #[test]
    fn hash_and_verify() {
        let password = ClearTextPassword::new("Joburg2024".to_string()).unwrap();
        let hashed = password.hash(None).unwrap();
        assert!(hashed.verify(&password, None));

        let wrong = ClearTextPassword::for_verification("Durban2024".to_string());
        assert!(!hashed.verify(&wrong, None));
    }

    #[test]
    fn pepper_must_match() {
        let password = ClearTextPassword::new("Joburg2024".to_string()).unwrap();
        let hashed = password.hash(Some(b"pepper")).unwrap();
        assert!(hashed.verify(&password, Some(b"pepper")));
        assert!(!hashed.verify(&password, None));
        assert!(!hashed.verify(&password, Some(b"other")));
    }

    #[test]
    fn phc_string_roundtrip() {
        let password = ClearTextPassword::new("Joburg2024".to_string()).unwrap();
        let hashed = password.hash(None).unwrap();
        let restored = HashedPassword::from_phc_string(hashed.as_phc_string()).unwrap();
        assert!(restored.verify(&password, None));
        assert!(HashedPassword::from_phc_string("not-a-hash").is_err());
    }

    #[test]
    fn debug_is_redacted() {
        let password = ClearTextPassword::for_verification("Secret123".to_string());
        let debug_output = format!("{:?}", password);
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains("Secret123"));
    }
}
