use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    #[display("user")]
    User,
    #[display("moderator")]
    Moderator,
    #[display("admin")]
    Admin,
}

impl UserRole {
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
        }
    }

    #[inline]
    pub const fn is_moderator_or_admin(&self) -> bool {
        matches!(self, UserRole::Moderator | UserRole::Admin)
    }

    #[inline]
    pub const fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "user" => Ok(UserRole::User),
            "moderator" => Ok(UserRole::Moderator),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes() {
        assert_eq!("user".parse::<UserRole>(), Ok(UserRole::User));
        assert_eq!("moderator".parse::<UserRole>(), Ok(UserRole::Moderator));
        assert_eq!("admin".parse::<UserRole>(), Ok(UserRole::Admin));
        assert!("super_admin".parse::<UserRole>().is_err());
    }

    #[test]
    fn display_matches_code() {
        for role in [UserRole::User, UserRole::Moderator, UserRole::Admin] {
            assert_eq!(role.to_string(), role.code());
        }
    }

    #[test]
    fn privilege_checks() {
        assert!(!UserRole::User.is_moderator_or_admin());
        assert!(UserRole::Moderator.is_moderator_or_admin());
        assert!(!UserRole::Moderator.is_admin());
        assert!(UserRole::Admin.is_admin());
    }
}
