//! Gateway-neutral webhook data.
//!
//! Each adapter turns its form post into a [`PaymentNotification`];
//! [`PaymentKind::classify`] then decides, once, what the payment was for.

use derive_more::Display;
use kernel::id::{MilestoneId, OrderId, UserId};
use marketplace::models::{Cents, PaymentProvider, Plan};

use crate::domain::reference::{
    is_order_reference, is_subscription_reference, order_id_from_reference,
};

/// Form fields in the order the gateway sent them.
///
/// PayFast signs the fields in received order, so the body is never
/// collected into a map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookPayload {
    fields: Vec<(String, String)>,
}

impl WebhookPayload {
    /// Parse an `application/x-www-form-urlencoded` body
    pub fn from_form(body: &[u8]) -> Self {
        Self {
            fields: url::form_urlencoded::parse(body).into_owned().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// First non-empty value for `key`, trimmed
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Raw value for `key`, empty when absent
    pub fn raw(&self, key: &str) -> &str {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    #[display("success")]
    Success,
    #[display("failed")]
    Failed,
    #[display("cancelled")]
    Cancelled,
    /// The gateway is still processing
    #[display("pending")]
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotification {
    pub provider: PaymentProvider,
    pub reference: String,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub amount: Cents,
    pub order_id: Option<OrderId>,
    pub milestone_id: Option<MilestoneId>,
    pub user_id: Option<UserId>,
    pub plan: Option<Plan>,
}

impl PaymentNotification {
    pub fn new(
        provider: PaymentProvider,
        reference: impl Into<String>,
        transaction_id: Option<String>,
        status: PaymentStatus,
        amount: Cents,
    ) -> Self {
        Self {
            provider,
            reference: reference.into(),
            transaction_id,
            status,
            amount,
            order_id: None,
            milestone_id: None,
            user_id: None,
            plan: None,
        }
    }

    /// Both gateways carry two free-form strings back to us. Subscriptions
    /// put the user id and plan there, escrow the order and milestone ids.
    /// Values that do not parse are dropped.
    pub fn with_custom_fields(mut self, first: Option<&str>, second: Option<&str>) -> Self {
        if is_subscription_reference(&self.reference) {
            self.user_id = first.and_then(|v| v.parse().ok());
            self.plan = second.and_then(|v| v.parse().ok());
        } else {
            self.order_id = first.and_then(|v| v.parse().ok());
            self.milestone_id = second.and_then(|v| v.parse().ok());
        }
        self
    }
}

/// What a payment was for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentKind {
    Subscription { user_id: UserId, plan: Plan },
    EscrowFunding {
        order_id: OrderId,
        milestone_id: Option<MilestoneId>,
    },
}

impl PaymentKind {
    /// `None` means unrecognized: acknowledge and change nothing.
    pub fn classify(notification: &PaymentNotification) -> Option<Self> {
        let reference = notification.reference.as_str();

        if is_subscription_reference(reference) {
            return match (notification.user_id, notification.plan) {
                (Some(user_id), Some(plan)) if plan.is_paid() => {
                    Some(PaymentKind::Subscription { user_id, plan })
                }
                _ => None,
            };
        }

        if is_order_reference(reference) || notification.order_id.is_some() {
            let order_id = notification
                .order_id
                .or_else(|| order_id_from_reference(reference))?;
            return Some(PaymentKind::EscrowFunding {
                order_id,
                milestone_id: notification.milestone_id,
            });
        }

        None
    }

    /// Values for the gateway's two custom fields
    pub fn custom_fields(&self) -> (String, Option<String>) {
        match self {
            PaymentKind::Subscription { user_id, plan } => {
                (user_id.to_string(), Some(plan.code().to_string()))
            }
            PaymentKind::EscrowFunding {
                order_id,
                milestone_id,
            } => (order_id.to_string(), milestone_id.map(|m| m.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reference::{order_reference, subscription_reference};

    fn notification(reference: &str) -> PaymentNotification {
        PaymentNotification::new(
            PaymentProvider::PayFast,
            reference,
            Some("1089250".into()),
            PaymentStatus::Success,
            Cents(9_900),
        )
    }

    #[test]
    fn payload_keeps_received_order() {
        let payload = WebhookPayload::from_form(b"b=2&a=1&name=Thabo+Nkosi&empty=");
        let keys: Vec<_> = payload.fields().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["b", "a", "name", "empty"]);
        assert_eq!(payload.get("name"), Some("Thabo Nkosi"));
        assert_eq!(payload.get("empty"), None);
        assert_eq!(payload.raw("missing"), "");
    }

    #[test]
    fn subscription_needs_user_and_paid_plan() {
        let user_id = UserId::new();
        let uid = user_id.to_string();
        let reference = subscription_reference();

        let n = notification(&reference).with_custom_fields(Some(&uid), Some("annual"));
        assert_eq!(
            PaymentKind::classify(&n),
            Some(PaymentKind::Subscription {
                user_id,
                plan: Plan::Annual
            })
        );

        let n = notification(&reference).with_custom_fields(Some(&uid), Some("free"));
        assert_eq!(PaymentKind::classify(&n), None);

        let n = notification(&reference).with_custom_fields(Some("user_42"), Some("monthly"));
        assert_eq!(PaymentKind::classify(&n), None);
    }

    #[test]
    fn escrow_from_custom_field_or_reference() {
        let order_id = OrderId::new();
        let milestone_id = MilestoneId::new();

        let n = notification(&order_reference(order_id)).with_custom_fields(None, None);
        assert_eq!(
            PaymentKind::classify(&n),
            Some(PaymentKind::EscrowFunding {
                order_id,
                milestone_id: None
            })
        );

        let oid = order_id.to_string();
        let mid = milestone_id.to_string();
        let n = notification("legacy-77").with_custom_fields(Some(&oid), Some(&mid));
        assert_eq!(
            PaymentKind::classify(&n),
            Some(PaymentKind::EscrowFunding {
                order_id,
                milestone_id: Some(milestone_id)
            })
        );
    }

    #[test]
    fn unknown_reference_is_unrecognized() {
        let n = notification("XYZ-1").with_custom_fields(Some("abc"), None);
        assert_eq!(PaymentKind::classify(&n), None);
        assert_eq!(PaymentKind::classify(&notification("ORD-broken")), None);
    }
}
