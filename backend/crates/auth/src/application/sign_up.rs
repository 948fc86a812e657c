//! Sign Up Use Case
//!
//! Creates a new user account and signs it in.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::sign_in::open_session;
use crate::domain::entity::{NewAccount, Profile, ProfileChanges, User};
use crate::domain::repository::{SessionStore, UserRepository};
use crate::domain::value_object::{Email, RawPassword, SessionToken, UserName, UserPassword};
use crate::error::{AuthError, AuthResult};

/// Sign up input
pub struct SignUpInput {
    pub email: String,
    pub user_name: String,
    pub password: String,
    pub display_name: Option<String>,
}

/// Sign up output
#[derive(Debug)]
pub struct SignUpOutput {
    pub user: User,
    pub session_token: SessionToken,
}

/// Sign up use case
pub struct SignUpUseCase<U, S>
where
    U: UserRepository,
    S: SessionStore,
{
    user_repo: Arc<U>,
    sessions: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<U, S> SignUpUseCase<U, S>
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

    pub async fn execute(&self, input: SignUpInput) -> AuthResult<SignUpOutput> {
        let email = Email::new(input.email)?;
        let user_name = UserName::new(&input.user_name)?;
        let raw_password = RawPassword::new(input.password)?;

        if self.user_repo.exists_by_email(&email).await? {
            return Err(AuthError::EmailTaken);
        }
        if self.user_repo.exists_by_user_name(&user_name).await? {
            return Err(AuthError::UserNameTaken);
        }

        let password_hash = UserPassword::from_raw(&raw_password, self.config.pepper())?;

        let user = User::new(email, user_name);
        let mut profile = Profile::new(user.id, user.user_name.as_str());
        if let Some(display_name) = input.display_name.filter(|n| !n.trim().is_empty()) {
            profile.apply(ProfileChanges {
                display_name: Some(display_name),
                ..Default::default()
            })?;
        }

        let account = NewAccount {
            user,
            password_hash,
            profile,
        };
        self.user_repo.create_account(&account).await?;

        tracing::info!(
            user_id = %account.user.id,
            user_name = %account.user.user_name,
            "User signed up"
        );

        let session_token = open_session(self.sessions.as_ref(), &account.user, &self.config).await?;

        Ok(SignUpOutput {
            user: account.user,
            session_token,
        })
    }
}
