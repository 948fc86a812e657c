//! Profile Use Case
//!
//! Own account view, profile edits and public profile lookup.

use std::sync::Arc;

use crate::domain::entity::{Identity, Profile, ProfileChanges, User};
use crate::domain::repository::{ProfileRepository, UserRepository};
use crate::domain::value_object::UserName;
use crate::error::{AuthError, AuthResult};

pub struct ProfileUseCase<R>
where
    R: UserRepository + ProfileRepository,
{
    repo: Arc<R>,
}

impl<R> ProfileUseCase<R>
where
    R: UserRepository + ProfileRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn me(&self, identity: &Identity) -> AuthResult<(User, Profile)> {
        self.load(identity.user_id).await
    }

    pub async fn update(&self, identity: &Identity, changes: ProfileChanges) -> AuthResult<Profile> {
        let mut profile = ProfileRepository::find_by_user_id(self.repo.as_ref(), identity.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        profile.apply(changes)?;
        ProfileRepository::update(self.repo.as_ref(), &profile).await?;

        tracing::debug!(user_id = %identity.user_id, "Profile updated");
        Ok(profile)
    }

    /// Suspended users have no public profile.
    pub async fn public_profile(&self, user_name: &str) -> AuthResult<(User, Profile)> {
        let user_name = UserName::new(user_name).map_err(|_| AuthError::UserNotFound)?;
        let user = self
            .repo
            .find_by_user_name(&user_name)
            .await?
            .filter(|u| !u.is_suspended)
            .ok_or(AuthError::UserNotFound)?;
        let profile = ProfileRepository::find_by_user_id(self.repo.as_ref(), user.id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok((user, profile))
    }

    async fn load(&self, user_id: kernel::id::UserId) -> AuthResult<(User, Profile)> {
        let user = self
            .repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let profile = ProfileRepository::find_by_user_id(self.repo.as_ref(), user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok((user, profile))
    }
}
