//! Presentation Layer

pub mod dto;
pub mod handlers;
pub mod router;

pub use handlers::PaymentsAppState;
pub use router::{payments_router, payments_router_generic};
