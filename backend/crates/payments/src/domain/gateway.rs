//! Payment Gateway Trait
//!
//! Adapters are stateless apart from their configuration. Verification
//! fails closed: anything short of a positive check is a rejection.

use std::net::IpAddr;

use marketplace::models::{Cents, PaymentProvider};

use crate::domain::notification::{PaymentKind, PaymentNotification, WebhookPayload};
use crate::error::PaymentResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    pub reason: Option<String>,
}

impl Verification {
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Transport facts about an inbound webhook
#[derive(Debug, Clone, Copy, Default)]
pub struct WebhookContext {
    pub source_ip: Option<IpAddr>,
}

/// A payment about to be sent to a gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub reference: String,
    pub amount: Cents,
    pub item_name: String,
    pub kind: PaymentKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyerContact {
    pub email: String,
    pub name: String,
}

/// Where the gateway sends the browser and the webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackUrls {
    pub success: String,
    pub cancel: String,
    pub error: String,
    pub notify: String,
}

impl CallbackUrls {
    /// Browser return URLs carry the order (or subscription marker) so the
    /// redirect handler can route the user without a lookup.
    pub fn new(base_url: &str, provider: PaymentProvider, kind: &PaymentKind) -> Self {
        let base = base_url.trim_end_matches('/');
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        match kind {
            PaymentKind::Subscription { .. } => {
                query.append_pair("kind", "subscription");
            }
            PaymentKind::EscrowFunding {
                order_id,
                milestone_id,
            } => {
                query.append_pair("orderId", &order_id.to_string());
                if let Some(milestone_id) = milestone_id {
                    query.append_pair("milestoneId", &milestone_id.to_string());
                }
            }
        }
        let query = query.finish();
        let page = |outcome: &str| format!("{base}/api/payments/{provider}/{outcome}?{query}");

        Self {
            success: page("success"),
            cancel: page("cancel"),
            error: page("error"),
            notify: format!("{base}/api/webhooks/{provider}"),
        }
    }
}

#[trait_variant::make(PaymentGateway: Send)]
pub trait LocalPaymentGateway {
    fn provider(&self) -> PaymentProvider;

    async fn verify_webhook(&self, payload: &WebhookPayload, context: &WebhookContext)
    -> Verification;

    fn parse_webhook(&self, payload: &WebhookPayload) -> PaymentResult<PaymentNotification>;

    /// Signed redirect URL for the gateway's hosted payment page
    fn initiate(
        &self,
        checkout: &Checkout,
        buyer: &BuyerContact,
        base_url: &str,
    ) -> PaymentResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::id::{MilestoneId, OrderId, UserId};
    use marketplace::models::Plan;

    #[test]
    fn escrow_callbacks_carry_the_order() {
        let order_id = OrderId::new();
        let milestone_id = MilestoneId::new();
        let urls = CallbackUrls::new(
            "https://zomieks.test/",
            PaymentProvider::Ozow,
            &PaymentKind::EscrowFunding {
                order_id,
                milestone_id: Some(milestone_id),
            },
        );
        assert_eq!(
            urls.success,
            format!(
                "https://zomieks.test/api/payments/ozow/success?orderId={order_id}&milestoneId={milestone_id}"
            )
        );
        assert!(urls.cancel.contains("/api/payments/ozow/cancel?"));
        assert_eq!(urls.notify, "https://zomieks.test/api/webhooks/ozow");
    }

    #[test]
    fn subscription_callbacks_are_marked() {
        let urls = CallbackUrls::new(
            "http://localhost:3000",
            PaymentProvider::PayFast,
            &PaymentKind::Subscription {
                user_id: UserId::new(),
                plan: Plan::Monthly,
            },
        );
        assert_eq!(
            urls.error,
            "http://localhost:3000/api/payments/payfast/error?kind=subscription"
        );
    }
}
