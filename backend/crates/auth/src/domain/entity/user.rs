//! User Entity
//!
//! Account identity, role, verification and moderation state.
//! Users are never hard-deleted; moderation suspends them instead.

use chrono::{DateTime, Utc};
use kernel::id::UserId;

use crate::domain::entity::profile::Profile;
use crate::domain::value_object::{Email, UserName, UserPassword, UserRole};

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub user_name: UserName,
    pub role: UserRole,
    pub email_verified: bool,
    pub identity_verified: bool,
    pub is_suspended: bool,
    pub suspended_reason: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: Email, user_name: UserName) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            email,
            user_name,
            role: UserRole::default(),
            email_verified: false,
            identity_verified: false,
            is_suspended: false,
            suspended_reason: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn record_login(&mut self) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    pub fn suspend(&mut self, reason: impl Into<String>) {
        self.is_suspended = true;
        self.suspended_reason = Some(reason.into());
        self.updated_at = Utc::now();
    }

    pub fn unsuspend(&mut self) {
        self.is_suspended = false;
        self.suspended_reason = None;
        self.updated_at = Utc::now();
    }

    pub fn set_role(&mut self, role: UserRole) {
        self.role = role;
        self.updated_at = Utc::now();
    }

    pub fn verify(&mut self, kind: VerificationKind) {
        match kind {
            VerificationKind::Email => self.email_verified = true,
            VerificationKind::Identity => self.identity_verified = true,
        }
        self.updated_at = Utc::now();
    }
}

/// Which verification flag a moderator sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationKind {
    Email,
    Identity,
}

/// Everything written when an account is opened.
///
/// Persisted atomically together with a free, non-expiring subscription.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user: User,
    pub password_hash: UserPassword,
    pub profile: Profile,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new(
            Email::new("lerato@example.co.za").unwrap(),
            UserName::new("lerato").unwrap(),
        )
    }

    #[test]
    fn new_user_defaults() {
        let user = user();
        assert_eq!(user.role, UserRole::User);
        assert!(!user.email_verified);
        assert!(!user.identity_verified);
        assert!(!user.is_suspended);
        assert!(user.last_login_at.is_none());
    }

    #[test]
    fn suspend_and_unsuspend() {
        let mut user = user();
        user.suspend("Spam listings");
        assert!(user.is_suspended);
        assert_eq!(user.suspended_reason.as_deref(), Some("Spam listings"));
        user.unsuspend();
        assert!(!user.is_suspended);
        assert!(user.suspended_reason.is_none());
    }

    #[test]
    fn verification_flags() {
        let mut user = user();
        user.verify(VerificationKind::Identity);
        assert!(user.identity_verified);
        assert!(!user.email_verified);
    }
}
