//! Auth Middleware
//!
//! Resolves the session cookie to an [`Identity`] and stores it in the
//! request extensions. Handlers take it with `Extension<Identity>`.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

use crate::application::CheckSessionUseCase;
use crate::application::config::AuthConfig;
use crate::domain::entity::Identity;
use crate::domain::repository::SessionStore;
use crate::error::AuthError;
use crate::presentation::handlers::session_token;

/// Middleware state
#[derive(Clone)]
pub struct SessionLayerState<S>
where
    S: SessionStore + Clone + Send + Sync + 'static,
{
    pub sessions: Arc<S>,
    pub config: Arc<AuthConfig>,
}

impl<S> SessionLayerState<S>
where
    S: SessionStore + Clone + Send + Sync + 'static,
{
    pub fn new(sessions: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self { sessions, config }
    }
}

/// Rejects the request with 401 unless it carries a live session.
pub async fn require_identity<S>(
    State(state): State<SessionLayerState<S>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError>
where
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let token = session_token(req.headers(), &state.config).ok_or(AuthError::SessionInvalid)?;

    let use_case = CheckSessionUseCase::new(state.sessions.clone(), state.config.clone());
    let identity = use_case.execute(&token).await?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Must run inside [`require_identity`].
pub async fn require_moderator(req: Request<Body>, next: Next) -> Result<Response, AuthError> {
    let identity = req
        .extensions()
        .get::<Identity>()
        .ok_or(AuthError::SessionInvalid)?;

    if !identity.is_moderator_or_admin() {
        return Err(AuthError::Forbidden("Moderator access required".into()));
    }

    Ok(next.run(req).await)
}

/// Attaches the [`Identity`] when the request has a live session and lets
/// anonymous requests through. A session store failure is logged and the
/// request continues anonymously.
pub async fn attach_identity<S>(
    State(state): State<SessionLayerState<S>>,
    mut req: Request<Body>,
    next: Next,
) -> Response
where
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let use_case = CheckSessionUseCase::new(state.sessions.clone(), state.config.clone());
    match use_case
        .status(session_token(req.headers(), &state.config))
        .await
    {
        Ok(Some(identity)) => {
            req.extensions_mut().insert(identity);
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Session lookup failed, continuing anonymously"),
    }
    next.run(req).await
}
