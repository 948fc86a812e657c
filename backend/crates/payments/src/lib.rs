//! Payments Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Webhook payloads, classification, references, gateway trait
//! - `application/` - Initiation, browser returns, webhook reconciliation
//! - `infra/` - PayFast and Ozow adapters
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Webhook contract
//! - Authenticity failures are answered with 400 and change nothing
//! - Everything else is acknowledged with the gateway's success token,
//!   including payloads that settle to nothing and internal errors
//! - A gateway reference settles at most once; redeliveries are no-ops

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::{OzowConfig, PayFastConfig, PaymentsConfig};
pub use domain::PaymentStore;
pub use error::{PaymentError, PaymentResult};
pub use infra::{Gateways, OzowGateway, PayFastGateway};
pub use presentation::router::{payments_router, payments_router_generic};

#[cfg(test)]
mod tests;
