//! Presentation Layer
//!
//! HTTP handlers, DTOs, router, and middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::AuthAppState;
pub use middleware::{SessionLayerState, attach_identity, require_identity, require_moderator};
pub use router::{admin_users_router_generic, auth_router, auth_router_generic};
