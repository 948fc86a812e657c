//! Auth Router

use axum::{
    Router, middleware,
    routing::{get, patch, post, put},
};
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::repository::{ProfileRepository, SessionStore, UserRepository};
use crate::infra::postgres::PgAuthRepository;
use crate::infra::redis::RedisSessionStore;
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::{SessionLayerState, require_identity, require_moderator};

/// Create the Auth router with the PostgreSQL repository and Redis sessions
pub fn auth_router(
    repo: PgAuthRepository,
    sessions: RedisSessionStore,
    config: AuthConfig,
) -> Router {
    auth_router_generic(Arc::new(repo), Arc::new(sessions), Arc::new(config))
}

/// `/api/auth` for any repository implementation
pub fn auth_router_generic<R, S>(repo: Arc<R>, sessions: Arc<S>, config: Arc<AuthConfig>) -> Router
where
    R: UserRepository + ProfileRepository + Clone + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let layer_state = SessionLayerState::new(sessions.clone(), config.clone());
    let state = AuthAppState {
        repo,
        sessions,
        config,
    };

    let protected = Router::new()
        .route("/signout-all", post(handlers::sign_out_all::<R, S>))
        .route("/me", get(handlers::me::<R, S>))
        .route("/profile", patch(handlers::update_profile::<R, S>))
        .route_layer(middleware::from_fn_with_state(
            layer_state,
            require_identity::<S>,
        ));

    Router::new()
        .route("/signup", post(handlers::sign_up::<R, S>))
        .route("/signin", post(handlers::sign_in::<R, S>))
        .route("/signout", post(handlers::sign_out::<R, S>))
        .route("/status", get(handlers::session_status::<R, S>))
        .route("/users/{user_name}", get(handlers::public_profile::<R, S>))
        .merge(protected)
        .with_state(state)
}

/// `/api/admin/users`, moderator or admin only
pub fn admin_users_router_generic<R, S>(
    repo: Arc<R>,
    sessions: Arc<S>,
    config: Arc<AuthConfig>,
) -> Router
where
    R: UserRepository + ProfileRepository + Clone + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let layer_state = SessionLayerState::new(sessions.clone(), config.clone());
    let state = AuthAppState {
        repo,
        sessions,
        config,
    };

    // Layers run outermost-last: identity first, then the role check
    Router::new()
        .route("/", get(handlers::list_users::<R, S>))
        .route("/{id}/suspend", post(handlers::suspend_user::<R, S>))
        .route("/{id}/unsuspend", post(handlers::unsuspend_user::<R, S>))
        .route("/{id}/role", put(handlers::set_role::<R, S>))
        .route("/{id}/verify", post(handlers::verify_user::<R, S>))
        .route_layer(middleware::from_fn(require_moderator))
        .route_layer(middleware::from_fn_with_state(
            layer_state,
            require_identity::<S>,
        ))
        .with_state(state)
}
