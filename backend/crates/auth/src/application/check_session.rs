//! Check Session Use Case
//!
//! Resolves a session token to the caller's identity, sliding the expiry.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::entity::Identity;
use crate::domain::repository::SessionStore;
use crate::domain::value_object::SessionToken;
use crate::error::{AuthError, AuthResult};

/// Check session use case
pub struct CheckSessionUseCase<S>
where
    S: SessionStore,
{
    sessions: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<S> CheckSessionUseCase<S>
where
    S: SessionStore,
{
    pub fn new(sessions: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self { sessions, config }
    }

    pub async fn execute(&self, token: &SessionToken) -> AuthResult<Identity> {
        let record = self
            .sessions
            .get(token)
            .await?
            .ok_or(AuthError::SessionInvalid)?;

        // Lost the race with expiry or revocation
        if !self
            .sessions
            .refresh(token, record.user_id, self.config.session_ttl)
            .await?
        {
            return Err(AuthError::SessionInvalid);
        }

        Ok(record.identity())
    }

    /// Like [`execute`](Self::execute) but a missing or dead session is `None`.
    pub async fn status(&self, token: Option<SessionToken>) -> AuthResult<Option<Identity>> {
        let Some(token) = token else {
            return Ok(None);
        };
        match self.execute(&token).await {
            Ok(identity) => Ok(Some(identity)),
            Err(AuthError::SessionInvalid) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
