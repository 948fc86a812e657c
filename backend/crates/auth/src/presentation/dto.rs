//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use serde::{Deserialize, Serialize};

use crate::domain::entity::{Identity, Profile, ProfileChanges, User, VerificationKind};
use crate::domain::value_object::UserRole;

// ============================================================================
// Sign Up / Sign In
// ============================================================================

/// Sign up request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub user_name: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// Sign in request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Returned by sign up and sign in; the token itself only travels in the cookie
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOutAllResponse {
    pub revoked: u64,
}

// ============================================================================
// Session Status
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub authenticated: bool,
    pub user: Option<Identity>,
}

// ============================================================================
// Users and Profiles
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub user_name: String,
    pub role: UserRole,
    pub email_verified: bool,
    pub identity_verified: bool,
    pub is_suspended: bool,
    pub suspended_reason: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email.as_str().to_string(),
            user_name: user.user_name.as_str().to_string(),
            role: user.role,
            email_verified: user.email_verified,
            identity_verified: user.identity_verified,
            is_suspended: user.is_suspended,
            suspended_reason: user.suspended_reason,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub display_name: String,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            display_name: profile.display_name,
            headline: profile.headline,
            bio: profile.bio,
            location: profile.location,
            skills: profile.skills,
            updated_at: profile.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: UserResponse,
    pub profile: ProfileResponse,
}

/// Public view; no email, no moderation state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfileResponse {
    pub id: UserId,
    pub user_name: String,
    pub identity_verified: bool,
    pub member_since: DateTime<Utc>,
    pub profile: ProfileResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub skills: Option<Vec<String>>,
}

impl From<UpdateProfileRequest> for ProfileChanges {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            display_name: req.display_name,
            headline: req.headline,
            bio: req.bio,
            location: req.location,
            skills: req.skills,
        }
    }
}

// ============================================================================
// User Moderation
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub search: Option<String>,
}

fn first_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    kernel::pagination::DEFAULT_PER_PAGE
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspendUserRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyUserRequest {
    pub kind: VerificationKind,
}
