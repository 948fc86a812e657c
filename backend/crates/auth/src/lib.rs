//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Use cases
//! - `infra/` - Postgres accounts, Redis sessions, in-memory test doubles
//! - `presentation/` - HTTP handlers, DTOs, router, identity middleware
//!
//! ## Features
//! - Sign up (auto sign-in) and sign in with email + password
//! - Opaque session tokens in Redis with a sliding 7-day TTL
//! - Per-user session index for "sign out everywhere" and moderation
//! - Roles (user, moderator, admin), verification flags, suspension
//!
//! ## Security Model
//! - Passwords hashed with Argon2id, optional pepper
//! - Only the SHA-256 of a session token is stored server-side
//! - Unknown email and wrong password are indistinguishable
//! - Role, suspension and verification changes revoke the user's sessions

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::AuthConfig;
pub use domain::entity::Identity;
pub use error::{AuthError, AuthResult};
pub use infra::memory::{MemoryAuthRepository, MemorySessionStore};
pub use infra::postgres::PgAuthRepository;
pub use infra::redis::RedisSessionStore;
pub use presentation::router::{admin_users_router_generic, auth_router, auth_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod store {
    pub use crate::domain::repository::{ProfileRepository, SessionStore, UserRepository};
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}
