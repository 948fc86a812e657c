//! Application Layer
//!
//! Use cases and application services.

pub mod check_session;
pub mod config;
pub mod moderation;
pub mod profile;
pub mod sign_in;
pub mod sign_out;
pub mod sign_up;


// Re-exports
pub use check_session::CheckSessionUseCase;
pub use config::AuthConfig;
pub use moderation::UserModerationUseCase;
pub use profile::ProfileUseCase;
pub use sign_in::{SignInInput, SignInOutput, SignInUseCase};
pub use sign_out::SignOutUseCase;
pub use sign_up::{SignUpInput, SignUpOutput, SignUpUseCase};
