//! Session Entity
//!
//! What the session store keeps under `session:{sha256(token)}`.
//! A snapshot of the user taken at sign-in; changes to role, suspension or
//! verification revoke the user's sessions so the snapshot never goes stale.

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use serde::{Deserialize, Serialize};

use crate::domain::entity::{identity::Identity, user::User};
use crate::domain::value_object::UserRole;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user_id: UserId,
    pub email: String,
    pub user_name: String,
    pub role: UserRole,
    pub email_verified: bool,
    pub identity_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn for_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.as_str().to_string(),
            user_name: user.user_name.as_str().to_string(),
            role: user.role,
            email_verified: user.email_verified,
            identity_verified: user.identity_verified,
            created_at: Utc::now(),
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id,
            email: self.email.clone(),
            user_name: self.user_name.clone(),
            role: self.role,
            email_verified: self.email_verified,
            identity_verified: self.identity_verified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::{Email, UserName};

    #[test]
    fn record_serializes_as_camel_case_json() {
        let user = User::new(
            Email::new("naledi@example.co.za").unwrap(),
            UserName::new("naledi").unwrap(),
        );
        let record = SessionRecord::for_user(&user);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["userName"], "naledi");
        assert_eq!(json["role"], "user");
        assert_eq!(json["identityVerified"], false);

        let back: SessionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.identity().user_id, user.id);
    }
}
