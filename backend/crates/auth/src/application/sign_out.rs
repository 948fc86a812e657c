//! Sign Out Use Case
//!
//! Invalidates one session, or every session of a user.

use std::sync::Arc;

use crate::domain::entity::Identity;
use crate::domain::repository::SessionStore;
use crate::domain::value_object::SessionToken;
use crate::error::AuthResult;

/// Sign out use case
pub struct SignOutUseCase<S>
where
    S: SessionStore,
{
    sessions: Arc<S>,
}

impl<S> SignOutUseCase<S>
where
    S: SessionStore,
{
    pub fn new(sessions: Arc<S>) -> Self {
        Self { sessions }
    }

    /// Signing out without a session is not an error.
    pub async fn execute(&self, token: Option<SessionToken>) -> AuthResult<()> {
        if let Some(token) = token {
            self.sessions.delete(&token).await?;
            tracing::info!("User signed out");
        }
        Ok(())
    }

    pub async fn execute_all(&self, identity: &Identity) -> AuthResult<u64> {
        let revoked = self.sessions.delete_all_for_user(identity.user_id).await?;
        tracing::info!(user_id = %identity.user_id, revoked, "User signed out everywhere");
        Ok(revoked)
    }
}
