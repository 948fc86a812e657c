//! User Moderation Use Case
//!
//! Listing, suspension, role changes and verification flags.
//! Every mutation revokes the target's sessions so the identity snapshot
//! held in the session store is rebuilt on their next sign-in.

use std::sync::Arc;

use kernel::error::app_error::AppError;
use kernel::id::UserId;
use kernel::pagination::{Page, PageRequest};

use crate::domain::entity::{Identity, User, VerificationKind};
use crate::domain::repository::{SessionStore, UserRepository};
use crate::domain::value_object::UserRole;
use crate::error::{AuthError, AuthResult};

const MAX_REASON_LEN: usize = 500;

pub struct UserModerationUseCase<U, S>
where
    U: UserRepository,
    S: SessionStore,
{
    user_repo: Arc<U>,
    sessions: Arc<S>,
}

impl<U, S> UserModerationUseCase<U, S>
where
    U: UserRepository,
    S: SessionStore,
{
    pub fn new(user_repo: Arc<U>, sessions: Arc<S>) -> Self {
        Self {
            user_repo,
            sessions,
        }
    }

    pub async fn list_users(
        &self,
        actor: &Identity,
        search: Option<&str>,
        page: PageRequest,
    ) -> AuthResult<Page<User>> {
        require_moderator(actor)?;
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        self.user_repo.list(search, page).await
    }

    pub async fn suspend(&self, actor: &Identity, target: UserId, reason: &str) -> AuthResult<User> {
        require_moderator(actor)?;
        let reason = reason.trim();
        if reason.is_empty() || reason.chars().count() > MAX_REASON_LEN {
            return Err(AuthError::Invalid(AppError::bad_request(
                "A suspension reason of at most 500 characters is required",
            )));
        }
        if actor.is(target) {
            return Err(AuthError::Forbidden("You cannot suspend yourself".into()));
        }

        let mut user = self.load(target).await?;
        if user.role.is_admin() && !actor.is_admin() {
            return Err(AuthError::Forbidden("Only an admin can suspend an admin".into()));
        }

        user.suspend(reason);
        self.user_repo.update(&user).await?;
        let revoked = self.sessions.delete_all_for_user(user.id).await?;

        tracing::warn!(
            moderator_id = %actor.user_id,
            user_id = %user.id,
            revoked,
            "User suspended"
        );
        Ok(user)
    }

    pub async fn unsuspend(&self, actor: &Identity, target: UserId) -> AuthResult<User> {
        require_moderator(actor)?;
        let mut user = self.load(target).await?;
        user.unsuspend();
        self.user_repo.update(&user).await?;

        tracing::info!(moderator_id = %actor.user_id, user_id = %user.id, "User unsuspended");
        Ok(user)
    }

    pub async fn set_role(&self, actor: &Identity, target: UserId, role: UserRole) -> AuthResult<User> {
        if !actor.is_admin() {
            return Err(AuthError::Forbidden("Admin access required".into()));
        }
        if actor.is(target) && role != actor.role {
            return Err(AuthError::Forbidden("You cannot change your own role".into()));
        }

        let mut user = self.load(target).await?;
        user.set_role(role);
        self.user_repo.update(&user).await?;
        self.sessions.delete_all_for_user(user.id).await?;

        tracing::warn!(admin_id = %actor.user_id, user_id = %user.id, role = %role, "User role changed");
        Ok(user)
    }

    pub async fn verify(&self, actor: &Identity, target: UserId, kind: VerificationKind) -> AuthResult<User> {
        require_moderator(actor)?;
        let mut user = self.load(target).await?;
        user.verify(kind);
        self.user_repo.update(&user).await?;
        self.sessions.delete_all_for_user(user.id).await?;

        tracing::info!(moderator_id = %actor.user_id, user_id = %user.id, ?kind, "User verified");
        Ok(user)
    }

    async fn load(&self, user_id: UserId) -> AuthResult<User> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

fn require_moderator(actor: &Identity) -> AuthResult<()> {
    if actor.is_moderator_or_admin() {
        Ok(())
    } else {
        Err(AuthError::Forbidden("Moderator access required".into()))
    }
}
