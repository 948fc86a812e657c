//! Entity Module

pub mod identity;
pub mod profile;
pub mod session;
pub mod user;

pub use identity::Identity;
pub use profile::{Profile, ProfileChanges};
pub use session::SessionRecord;
pub use user::{NewAccount, User, VerificationKind};
