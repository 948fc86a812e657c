//! Sign In Use Case
//!
//! Authenticates a user by email and password and creates a session.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::entity::{SessionRecord, User};
use crate::domain::repository::{SessionStore, UserRepository};
use crate::domain::value_object::{Email, RawPassword, SessionToken};
use crate::error::{AuthError, AuthResult};

/// Sign in input
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

/// Sign in output
#[derive(Debug)]
pub struct SignInOutput {
    pub user: User,
    pub session_token: SessionToken,
}

/// Sign in use case
pub struct SignInUseCase<U, S>
where
    U: UserRepository,
    S: SessionStore,
{
    user_repo: Arc<U>,
    sessions: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<U, S> SignInUseCase<U, S>
where
    U: UserRepository,
    S: SessionStore,
{
    pub fn new(user_repo: Arc<U>, sessions: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self {
            user_repo,
            sessions,
            config,
        }
    }

    pub async fn execute(&self, input: SignInInput) -> AuthResult<SignInOutput> {
        // Malformed email and unknown email look the same to the caller
        let email = Email::new(input.email).map_err(|_| AuthError::InvalidCredentials)?;

        let (mut user, password_hash) = self
            .user_repo
            .find_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let raw_password = RawPassword::for_sign_in(input.password);
        if !password_hash.verify(&raw_password, self.config.pepper()) {
            return Err(AuthError::InvalidCredentials);
        }

        if user.is_suspended {
            return Err(AuthError::AccountSuspended(user.suspended_reason.clone()));
        }

        user.record_login();
        self.user_repo.update(&user).await?;

        let session_token = open_session(self.sessions.as_ref(), &user, &self.config).await?;

        tracing::info!(user_id = %user.id, "User signed in");

        Ok(SignInOutput {
            user,
            session_token,
        })
    }
}

/// Issue a fresh token and store the user's snapshot under it.
pub(crate) async fn open_session<S: SessionStore>(
    sessions: &S,
    user: &User,
    config: &AuthConfig,
) -> AuthResult<SessionToken> {
    let token = SessionToken::generate();
    let record = SessionRecord::for_user(user);
    sessions.create(&token, &record, config.session_ttl).await?;
    Ok(token)
}
