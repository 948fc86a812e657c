//! Application Layer
//!
//! Use cases. Each takes the caller's [`auth::Identity`] explicitly.

pub mod bids;
pub mod billing;
pub mod categories;
pub mod config;
pub mod messages;
pub mod moderation;
pub mod notifications;
pub mod orders;
pub mod outsourcing;
pub mod projects;
pub mod services;
pub mod shortlist;


// Re-exports
pub use bids::{BidUseCase, PlaceBidInput};
pub use billing::{BillingUseCase, SubscriptionView};
pub use categories::CategoryUseCase;
pub use config::MarketplaceConfig;
pub use messages::MessageUseCase;
pub use moderation::MarketplaceModerationUseCase;
pub use notifications::{NotificationEmitter, NotificationUseCase};
pub use orders::OrderUseCase;
pub use outsourcing::OutsourcingUseCase;
pub use projects::ProjectUseCase;
pub use services::ServiceUseCase;
pub use shortlist::ShortlistUseCase;
