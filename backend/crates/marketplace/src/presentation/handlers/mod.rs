//! HTTP Handlers
//!
//! Thin adapters: extract, call one use case, map the result to a DTO.
//! Every handler is generic over the store so the router tests can run
//! against the in-memory implementation.

pub mod account;
pub mod admin;
pub mod catalogue;
pub mod inbox;
pub mod orders;
pub mod projects;

use std::sync::Arc;

use crate::application::config::MarketplaceConfig;
use crate::domain::MarketplaceStore;

/// Shared state for marketplace handlers
#[derive(Clone)]
pub struct MarketplaceAppState<R>
where
    R: MarketplaceStore,
{
    pub repo: Arc<R>,
    pub config: Arc<MarketplaceConfig>,
}
