//! Infrastructure Layer
//!
//! Gateway adapters. [`Gateways`] picks the adapter for a provider; the
//! gateway trait uses `async fn`, so dispatch is a match rather than a
//! trait object.

pub mod ozow;
pub mod payfast;

pub use ozow::OzowGateway;
pub use payfast::PayFastGateway;

use marketplace::models::PaymentProvider;

use crate::application::config::PaymentsConfig;
use crate::domain::gateway::{BuyerContact, Checkout, PaymentGateway, Verification, WebhookContext};
use crate::domain::notification::{PaymentNotification, WebhookPayload};
use crate::error::PaymentResult;

#[derive(Debug, Clone)]
pub struct Gateways {
    pub payfast: PayFastGateway,
    pub ozow: OzowGateway,
}

impl Gateways {
    pub fn new(config: &PaymentsConfig) -> Self {
        Self {
            payfast: PayFastGateway::new(config.payfast.clone()),
            ozow: OzowGateway::new(config.ozow.clone()),
        }
    }

    pub async fn verify_webhook(
        &self,
        provider: PaymentProvider,
        payload: &WebhookPayload,
        context: &WebhookContext,
    ) -> Verification {
        match provider {
            PaymentProvider::PayFast => self.payfast.verify_webhook(payload, context).await,
            PaymentProvider::Ozow => self.ozow.verify_webhook(payload, context).await,
        }
    }

    pub fn parse_webhook(
        &self,
        provider: PaymentProvider,
        payload: &WebhookPayload,
    ) -> PaymentResult<PaymentNotification> {
        match provider {
            PaymentProvider::PayFast => self.payfast.parse_webhook(payload),
            PaymentProvider::Ozow => self.ozow.parse_webhook(payload),
        }
    }

    pub fn initiate(
        &self,
        provider: PaymentProvider,
        checkout: &Checkout,
        buyer: &BuyerContact,
        base_url: &str,
    ) -> PaymentResult<String> {
        match provider {
            PaymentProvider::PayFast => self.payfast.initiate(checkout, buyer, base_url),
            PaymentProvider::Ozow => self.ozow.initiate(checkout, buyer, base_url),
        }
    }
}
