//! Marketplace Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Use cases and plan limits
//! - `infra/` - Postgres store, in-memory test double
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Features
//! - Categories, service listings and a per-user shortlist
//! - Projects with bidding; accepting a bid opens an order
//! - Orders with milestones and a guarded status machine
//! - Direct messages, in-app notifications, outsourcing requests
//! - Subscription plans with bid and service quotas
//! - The payment ledger written by webhook reconciliation
//!
//! ## Consistency
//! - Quotas are checked and consumed in a single statement
//! - Order transitions are compare-and-set on the previous status
//! - Ledger rows are unique per gateway reference, so a redelivered
//!   webhook applies nothing twice

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::MarketplaceConfig;
pub use application::notifications::NotificationEmitter;
pub use domain::MarketplaceStore;
pub use error::{MarketplaceError, MarketplaceResult};
pub use infra::memory::MemoryMarketplaceRepository;
pub use infra::postgres::PgMarketplaceRepository;
pub use presentation::router::{marketplace_router, marketplace_router_generic};

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
}

pub mod store {
    pub use crate::domain::repository::*;
}
