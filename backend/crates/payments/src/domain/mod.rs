//! Domain Layer
//!
//! Gateway-neutral payment types, reference formats and the gateway trait.

pub mod gateway;
pub mod notification;
pub mod reference;

pub use gateway::{BuyerContact, CallbackUrls, Checkout, PaymentGateway, Verification, WebhookContext};
pub use notification::{PaymentKind, PaymentNotification, PaymentStatus, WebhookPayload};

use marketplace::store::{LedgerRepository, NotificationRepository, OrderRepository};

/// Everything reconciliation and initiation need from the marketplace store
pub trait PaymentStore:
    LedgerRepository + OrderRepository + NotificationRepository + Send + Sync + 'static
{
}

impl<T> PaymentStore for T where
    T: LedgerRepository + OrderRepository + NotificationRepository + Send + Sync + 'static
{
}
