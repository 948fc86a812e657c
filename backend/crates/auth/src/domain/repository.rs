//! Repository Traits
//!
//! Interfaces for data persistence. Implementations live in the
//! infrastructure layer (Postgres + Redis, or in-memory for tests).

use std::time::Duration;

use kernel::id::UserId;
use kernel::pagination::{Page, PageRequest};

use crate::domain::entity::{NewAccount, Profile, SessionRecord, User};
use crate::domain::value_object::{Email, SessionToken, UserName, UserPassword};
use crate::error::AuthResult;

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Insert user, profile and the free subscription in one transaction
    async fn create_account(&self, account: &NewAccount) -> AuthResult<()>;

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>>;

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>>;

    async fn find_by_user_name(&self, user_name: &UserName) -> AuthResult<Option<User>>;

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool>;

    async fn exists_by_user_name(&self, user_name: &UserName) -> AuthResult<bool>;

    /// User plus stored password hash, for sign-in only
    async fn find_credentials(&self, email: &Email) -> AuthResult<Option<(User, UserPassword)>>;

    /// Persist role, verification, suspension and last-login changes
    async fn update(&self, user: &User) -> AuthResult<()>;

    /// Newest first; `search` matches email or user name
    async fn list(&self, search: Option<&str>, page: PageRequest) -> AuthResult<Page<User>>;
}

/// Profile repository trait
#[trait_variant::make(ProfileRepository: Send)]
pub trait LocalProfileRepository {
    async fn find_by_user_id(&self, user_id: UserId) -> AuthResult<Option<Profile>>;

    async fn update(&self, profile: &Profile) -> AuthResult<()>;
}

/// Session store trait
///
/// Records are keyed by the token digest and expire after `ttl`.
/// Each user has a reverse index of their most recent sessions.
#[trait_variant::make(SessionStore: Send)]
pub trait LocalSessionStore {
    async fn create(
        &self,
        token: &SessionToken,
        record: &SessionRecord,
        ttl: Duration,
    ) -> AuthResult<()>;

    async fn get(&self, token: &SessionToken) -> AuthResult<Option<SessionRecord>>;

    /// Reset the expiry of the session and of its owner's index; `false` if
    /// the session is gone. The index must outlive every session it lists.
    async fn refresh(&self, token: &SessionToken, user_id: UserId, ttl: Duration)
    -> AuthResult<bool>;

    async fn delete(&self, token: &SessionToken) -> AuthResult<()>;

    /// Delete every indexed session of the user, returns how many were removed
    async fn delete_all_for_user(&self, user_id: UserId) -> AuthResult<u64>;
}
