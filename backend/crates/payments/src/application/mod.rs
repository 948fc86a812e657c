//! Application Layer
//!
//! Use cases for payment initiation, browser returns and webhook
//! reconciliation.

pub mod config;
pub mod initiate;
pub mod redirect;
pub mod settle;
pub mod webhook;

#[cfg(test)]
mod tests;

// Re-exports
pub use config::{OzowConfig, PayFastConfig, PaymentsConfig};
pub use initiate::InitiatePaymentUseCase;
pub use redirect::{ReturnOutcome, return_path};
pub use settle::{SettlePaymentUseCase, Settlement};
pub use webhook::{HandleWebhookUseCase, WebhookOutcome};
