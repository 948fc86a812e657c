//! Identity
//!
//! The authenticated caller. Resolved once per request by the session
//! middleware and handed to every action explicitly.

use kernel::id::UserId;
use serde::{Deserialize, Serialize};

use crate::domain::value_object::UserRole;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
    pub user_name: String,
    pub role: UserRole,
    pub email_verified: bool,
    pub identity_verified: bool,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_moderator_or_admin(&self) -> bool {
        self.role.is_moderator_or_admin()
    }

    pub fn is(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn identity(role: UserRole) -> Identity {
        Identity {
            user_id: UserId::new(),
            email: "caller@example.co.za".to_string(),
            user_name: "caller".to_string(),
            role,
            email_verified: true,
            identity_verified: false,
        }
    }
}
