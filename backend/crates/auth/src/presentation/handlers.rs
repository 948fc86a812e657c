//! HTTP Handlers

use axum::Extension;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use kernel::id::UserId;
use kernel::pagination::{Page, PageRequest};
use std::sync::Arc;

use platform::cookie::extract_cookie;

use crate::application::config::AuthConfig;
use crate::application::{
    CheckSessionUseCase, ProfileUseCase, SignInInput, SignInUseCase, SignOutUseCase, SignUpInput,
    SignUpUseCase, UserModerationUseCase,
};
use crate::domain::entity::Identity;
use crate::domain::repository::{ProfileRepository, SessionStore, UserRepository};
use crate::domain::value_object::SessionToken;
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    AuthResponse, ListUsersQuery, MeResponse, ProfileResponse, PublicProfileResponse,
    SessionStatusResponse, SetRoleRequest, SignInRequest, SignOutAllResponse, SignUpRequest,
    SuspendUserRequest, UpdateProfileRequest, UserResponse, VerifyUserRequest,
};

/// Shared state for auth handlers
#[derive(Clone)]
pub struct AuthAppState<R, S>
where
    R: UserRepository + ProfileRepository + Clone + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub sessions: Arc<S>,
    pub config: Arc<AuthConfig>,
}

/// Session token from the request cookie, if any
pub fn session_token(headers: &HeaderMap, config: &AuthConfig) -> Option<SessionToken> {
    extract_cookie(headers, &config.session_cookie_name).and_then(SessionToken::parse)
}

fn set_cookie(config: &AuthConfig, token: &SessionToken) -> AuthResult<HeaderValue> {
    config
        .cookie()
        .set_cookie_header(token.as_str())
        .ok_or_else(|| AuthError::Internal("Session cookie is not a valid header".into()))
}

fn clear_cookie(config: &AuthConfig) -> AuthResult<HeaderValue> {
    config
        .cookie()
        .delete_cookie_header()
        .ok_or_else(|| AuthError::Internal("Session cookie is not a valid header".into()))
}

// ============================================================================
// Sign Up / Sign In / Sign Out
// ============================================================================

/// POST /api/auth/signup
pub async fn sign_up<R, S>(
    State(state): State<AuthAppState<R, S>>,
    Json(req): Json<SignUpRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: UserRepository + ProfileRepository + Clone + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let use_case = SignUpUseCase::new(
        state.repo.clone(),
        state.sessions.clone(),
        state.config.clone(),
    );

    let output = use_case
        .execute(SignUpInput {
            email: req.email,
            user_name: req.user_name,
            password: req.password,
            display_name: req.display_name,
        })
        .await?;

    let cookie = set_cookie(&state.config, &output.session_token)?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user: output.user.into(),
        }),
    ))
}

/// POST /api/auth/signin
pub async fn sign_in<R, S>(
    State(state): State<AuthAppState<R, S>>,
    Json(req): Json<SignInRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: UserRepository + ProfileRepository + Clone + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let use_case = SignInUseCase::new(
        state.repo.clone(),
        state.sessions.clone(),
        state.config.clone(),
    );

    let output = use_case
        .execute(SignInInput {
            email: req.email,
            password: req.password,
        })
        .await?;

    let cookie = set_cookie(&state.config, &output.session_token)?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user: output.user.into(),
        }),
    ))
}

/// POST /api/auth/signout
pub async fn sign_out<R, S>(
    State(state): State<AuthAppState<R, S>>,
    headers: HeaderMap,
) -> AuthResult<impl IntoResponse>
where
    R: UserRepository + ProfileRepository + Clone + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let token = session_token(&headers, &state.config);
    let use_case = SignOutUseCase::new(state.sessions.clone());

    // The cookie is cleared even if the store is unreachable
    if let Err(e) = use_case.execute(token).await {
        tracing::warn!(error = %e, "Failed to delete session on sign out");
    }

    let cookie = clear_cookie(&state.config)?;
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]))
}

/// POST /api/auth/signout-all
pub async fn sign_out_all<R, S>(
    State(state): State<AuthAppState<R, S>>,
    Extension(identity): Extension<Identity>,
) -> AuthResult<impl IntoResponse>
where
    R: UserRepository + ProfileRepository + Clone + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let use_case = SignOutUseCase::new(state.sessions.clone());
    let revoked = use_case.execute_all(&identity).await?;

    let cookie = clear_cookie(&state.config)?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(SignOutAllResponse { revoked }),
    ))
}

// ============================================================================
// Session Status
// ============================================================================

/// GET /api/auth/status
pub async fn session_status<R, S>(
    State(state): State<AuthAppState<R, S>>,
    headers: HeaderMap,
) -> AuthResult<Json<SessionStatusResponse>>
where
    R: UserRepository + ProfileRepository + Clone + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let use_case = CheckSessionUseCase::new(state.sessions.clone(), state.config.clone());
    let identity = use_case
        .status(session_token(&headers, &state.config))
        .await?;

    Ok(Json(SessionStatusResponse {
        authenticated: identity.is_some(),
        user: identity,
    }))
}

// ============================================================================
// Profile
// ============================================================================

/// GET /api/auth/me
pub async fn me<R, S>(
    State(state): State<AuthAppState<R, S>>,
    Extension(identity): Extension<Identity>,
) -> AuthResult<Json<MeResponse>>
where
    R: UserRepository + ProfileRepository + Clone + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let (user, profile) = ProfileUseCase::new(state.repo.clone()).me(&identity).await?;
    Ok(Json(MeResponse {
        user: user.into(),
        profile: profile.into(),
    }))
}

/// PATCH /api/auth/profile
pub async fn update_profile<R, S>(
    State(state): State<AuthAppState<R, S>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<UpdateProfileRequest>,
) -> AuthResult<Json<ProfileResponse>>
where
    R: UserRepository + ProfileRepository + Clone + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let profile = ProfileUseCase::new(state.repo.clone())
        .update(&identity, req.into())
        .await?;
    Ok(Json(profile.into()))
}

/// GET /api/auth/users/{user_name}
pub async fn public_profile<R, S>(
    State(state): State<AuthAppState<R, S>>,
    Path(user_name): Path<String>,
) -> AuthResult<Json<PublicProfileResponse>>
where
    R: UserRepository + ProfileRepository + Clone + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let (user, profile) = ProfileUseCase::new(state.repo.clone())
        .public_profile(&user_name)
        .await?;
    Ok(Json(PublicProfileResponse {
        id: user.id,
        user_name: user.user_name.as_str().to_string(),
        identity_verified: user.identity_verified,
        member_since: user.created_at,
        profile: profile.into(),
    }))
}

// ============================================================================
// User Moderation
// ============================================================================

/// GET /api/admin/users
pub async fn list_users<R, S>(
    State(state): State<AuthAppState<R, S>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListUsersQuery>,
) -> AuthResult<Json<Page<UserResponse>>>
where
    R: UserRepository + ProfileRepository + Clone + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let use_case = UserModerationUseCase::new(state.repo.clone(), state.sessions.clone());
    let page = use_case
        .list_users(
            &identity,
            query.search.as_deref(),
            PageRequest::new(query.page, query.per_page),
        )
        .await?;
    Ok(Json(page.map(UserResponse::from)))
}

/// POST /api/admin/users/{id}/suspend
pub async fn suspend_user<R, S>(
    State(state): State<AuthAppState<R, S>>,
    Extension(identity): Extension<Identity>,
    Path(user_id): Path<UserId>,
    Json(req): Json<SuspendUserRequest>,
) -> AuthResult<Json<UserResponse>>
where
    R: UserRepository + ProfileRepository + Clone + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let use_case = UserModerationUseCase::new(state.repo.clone(), state.sessions.clone());
    let user = use_case.suspend(&identity, user_id, &req.reason).await?;
    Ok(Json(user.into()))
}

/// POST /api/admin/users/{id}/unsuspend
pub async fn unsuspend_user<R, S>(
    State(state): State<AuthAppState<R, S>>,
    Extension(identity): Extension<Identity>,
    Path(user_id): Path<UserId>,
) -> AuthResult<Json<UserResponse>>
where
    R: UserRepository + ProfileRepository + Clone + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let use_case = UserModerationUseCase::new(state.repo.clone(), state.sessions.clone());
    let user = use_case.unsuspend(&identity, user_id).await?;
    Ok(Json(user.into()))
}

/// PUT /api/admin/users/{id}/role
pub async fn set_role<R, S>(
    State(state): State<AuthAppState<R, S>>,
    Extension(identity): Extension<Identity>,
    Path(user_id): Path<UserId>,
    Json(req): Json<SetRoleRequest>,
) -> AuthResult<Json<UserResponse>>
where
    R: UserRepository + ProfileRepository + Clone + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let use_case = UserModerationUseCase::new(state.repo.clone(), state.sessions.clone());
    let user = use_case.set_role(&identity, user_id, req.role).await?;
    Ok(Json(user.into()))
}

/// POST /api/admin/users/{id}/verify
pub async fn verify_user<R, S>(
    State(state): State<AuthAppState<R, S>>,
    Extension(identity): Extension<Identity>,
    Path(user_id): Path<UserId>,
    Json(req): Json<VerifyUserRequest>,
) -> AuthResult<Json<UserResponse>>
where
    R: UserRepository + ProfileRepository + Clone + Send + Sync + 'static,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let use_case = UserModerationUseCase::new(state.repo.clone(), state.sessions.clone());
    let user = use_case.verify(&identity, user_id, req.kind).await?;
    Ok(Json(user.into()))
}
