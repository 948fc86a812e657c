//! Ozow instant-EFT gateway.
//!
//! Both directions are protected by a SHA-512 hash over a fixed field list
//! concatenated with the private key, lower-cased before hashing.

use marketplace::models::{Cents, PaymentProvider};
use platform::crypto::{constant_time_eq, sha512_hex};

use crate::application::config::OzowConfig;
use crate::domain::gateway::{
    BuyerContact, CallbackUrls, Checkout, PaymentGateway, Verification, WebhookContext,
};
use crate::domain::notification::{PaymentNotification, PaymentStatus, WebhookPayload};
use crate::error::{PaymentError, PaymentResult};

/// Fields covered by the notification hash, in hashing order
const NOTIFICATION_HASH_FIELDS: [&str; 13] = [
    "SiteCode",
    "TransactionId",
    "TransactionReference",
    "Amount",
    "Status",
    "Optional1",
    "Optional2",
    "Optional3",
    "Optional4",
    "Optional5",
    "CurrencyCode",
    "IsTest",
    "StatusMessage",
];

/// Ozow limits the bank statement reference to 20 characters
const BANK_REFERENCE_MAX: usize = 20;

#[derive(Debug, Clone)]
pub struct OzowGateway {
    config: OzowConfig,
}

impl OzowGateway {
    pub fn new(config: OzowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OzowConfig {
        &self.config
    }

    /// Concatenate, append the private key, lower-case, SHA-512
    pub fn hash<'a, I>(&self, values: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut joined: String = values.into_iter().collect();
        joined.push_str(&self.config.private_key);
        sha512_hex(joined.to_lowercase().as_bytes())
    }

    fn bank_reference(reference: &str) -> String {
        let suffix = reference.rsplit('-').next().unwrap_or(reference);
        let mut bank = format!("Zomieks {suffix}");
        bank.truncate(BANK_REFERENCE_MAX);
        bank
    }
}

impl PaymentGateway for OzowGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Ozow
    }

    async fn verify_webhook(
        &self,
        payload: &WebhookPayload,
        _context: &WebhookContext,
    ) -> Verification {
        if !self.config.is_configured() {
            return Verification::rejected("Ozow is not configured");
        }
        if payload.get("SiteCode") != Some(self.config.site_code.as_str()) {
            return Verification::rejected("site code mismatch");
        }
        let Some(received) = payload.get("Hash") else {
            return Verification::rejected("hash missing");
        };

        let expected = self.hash(
            NOTIFICATION_HASH_FIELDS
                .iter()
                .map(|k| payload.raw(k)),
        );
        let received = received.to_ascii_lowercase();
        if !constant_time_eq(expected.as_bytes(), received.as_bytes()) {
            return Verification::rejected("hash mismatch");
        }

        Verification::valid()
    }

    fn parse_webhook(&self, payload: &WebhookPayload) -> PaymentResult<PaymentNotification> {
        let reference = payload
            .get("TransactionReference")
            .ok_or_else(|| PaymentError::validation("TransactionReference is missing"))?;

        let status = match payload.get("Status") {
            Some("Complete") => PaymentStatus::Success,
            Some("Cancelled") | Some("Abandoned") => PaymentStatus::Cancelled,
            Some("Error") => PaymentStatus::Failed,
            Some("Pending") | Some("PendingInvestigation") => PaymentStatus::Pending,
            other => {
                return Err(PaymentError::validation(format!(
                    "unknown Status: {}",
                    other.unwrap_or("")
                )));
            }
        };

        let amount = payload
            .get("Amount")
            .ok_or_else(|| PaymentError::validation("Amount is missing"))?;
        let amount =
            Cents::parse_rands(amount).map_err(|e| PaymentError::validation(e.to_string()))?;

        Ok(PaymentNotification::new(
            PaymentProvider::Ozow,
            reference,
            payload.get("TransactionId").map(str::to_string),
            status,
            amount,
        )
        .with_custom_fields(payload.get("Optional1"), payload.get("Optional2")))
    }

    fn initiate(
        &self,
        checkout: &Checkout,
        buyer: &BuyerContact,
        base_url: &str,
    ) -> PaymentResult<String> {
        if !self.config.is_configured() {
            return Err(PaymentError::NotConfigured(PaymentProvider::Ozow));
        }

        let urls = CallbackUrls::new(base_url, PaymentProvider::Ozow, &checkout.kind);
        let (optional1, optional2) = checkout.kind.custom_fields();
        let is_test = if self.config.is_test { "true" } else { "false" };

        // Hashing order is the request field order
        let fields = [
            ("SiteCode", self.config.site_code.clone()),
            ("CountryCode", self.config.country_code.clone()),
            ("CurrencyCode", self.config.currency_code.clone()),
            ("Amount", checkout.amount.to_rands()),
            ("TransactionReference", checkout.reference.clone()),
            ("BankReference", Self::bank_reference(&checkout.reference)),
            ("Optional1", optional1),
            ("Optional2", optional2.unwrap_or_default()),
            ("Customer", buyer.email.clone()),
            ("CancelUrl", urls.cancel),
            ("ErrorUrl", urls.error),
            ("SuccessUrl", urls.success),
            ("NotifyUrl", urls.notify),
            ("IsTest", is_test.to_string()),
        ];
        let hash = self.hash(fields.iter().map(|(_, v)| v.as_str()));

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &fields {
            if !value.is_empty() {
                query.append_pair(key, value);
            }
        }
        query.append_pair("HashCheck", &hash);

        let base = self.config.pay_url.trim_end_matches('?');
        Ok(format!("{base}?{}", query.finish()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::id::{MilestoneId, OrderId, UserId};
    use marketplace::models::Plan;

    use crate::domain::notification::PaymentKind;

    fn gateway() -> OzowGateway {
        OzowGateway::new(OzowConfig {
            site_code: "ZOM-001".into(),
            private_key: "Pr1vateKey".into(),
            ..OzowConfig::development()
        })
    }

    fn notification(gateway: &OzowGateway, status: &str) -> WebhookPayload {
        let order_id = "5f1c7c5e-2a3b-4d8e-9f10-1a2b3c4d5e6f";
        let fields = vec![
            ("SiteCode", "ZOM-001".to_string()),
            ("TransactionId", "b1f7a2c4-0000-4000-8000-000000000001".to_string()),
            ("TransactionReference", format!("ORD-{order_id}-0A1B2C3D")),
            ("Amount", "1500.00".to_string()),
            ("Status", status.to_string()),
            ("Optional1", order_id.to_string()),
            ("Optional2", String::new()),
            ("Optional3", String::new()),
            ("Optional4", String::new()),
            ("Optional5", String::new()),
            ("CurrencyCode", "ZAR".to_string()),
            ("IsTest", "true".to_string()),
            ("StatusMessage", String::new()),
        ];
        let hash = gateway.hash(fields.iter().map(|(_, v)| v.as_str()));
        let mut pairs: Vec<(String, String)> = fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        pairs.push(("Hash".into(), hash.to_uppercase()));
        WebhookPayload::from_pairs(pairs)
    }

    #[test]
    fn hash_is_lowercased_before_digest() {
        let gateway = gateway();
        assert_eq!(
            gateway.hash(["ZOM-001", "ABC"]),
            sha512_hex(b"zom-001abcpr1vatekey")
        );
        assert_eq!(hex::decode(gateway.hash(["x"])).unwrap().len(), 64);
    }

    #[tokio::test]
    async fn verifies_hash_case_insensitively() {
        let gateway = gateway();
        let payload = notification(&gateway, "Complete");
        assert!(
            gateway
                .verify_webhook(&payload, &WebhookContext::default())
                .await
                .valid
        );
    }

    #[tokio::test]
    async fn rejects_wrong_site_or_hash() {
        let gateway = gateway();
        let context = WebhookContext::default();

        let other_site = OzowGateway::new(OzowConfig {
            site_code: "OTHER-1".into(),
            ..gateway.config().clone()
        });
        let v = other_site
            .verify_webhook(&notification(&gateway, "Complete"), &context)
            .await;
        assert_eq!(v.reason.as_deref(), Some("site code mismatch"));

        let forged = WebhookPayload::from_pairs(
            notification(&gateway, "Complete")
                .fields()
                .iter()
                .map(|(k, v)| {
                    if k == "Amount" {
                        (k.clone(), "1.00".to_string())
                    } else {
                        (k.clone(), v.clone())
                    }
                }),
        );
        let v = gateway.verify_webhook(&forged, &context).await;
        assert_eq!(v.reason.as_deref(), Some("hash mismatch"));

        let unconfigured = OzowGateway::new(OzowConfig::development());
        assert!(
            !unconfigured
                .verify_webhook(&notification(&gateway, "Complete"), &context)
                .await
                .valid
        );
    }

    #[test]
    fn maps_statuses() {
        let gateway = gateway();
        for (raw, status) in [
            ("Complete", PaymentStatus::Success),
            ("Cancelled", PaymentStatus::Cancelled),
            ("Abandoned", PaymentStatus::Cancelled),
            ("Error", PaymentStatus::Failed),
            ("Pending", PaymentStatus::Pending),
            ("PendingInvestigation", PaymentStatus::Pending),
        ] {
            let n = gateway.parse_webhook(&notification(&gateway, raw)).unwrap();
            assert_eq!(n.status, status, "{raw}");
        }
        assert!(gateway.parse_webhook(&notification(&gateway, "Refunded")).is_err());
    }

    #[test]
    fn parses_escrow_ids_from_optionals() {
        let gateway = gateway();
        let n = gateway
            .parse_webhook(&notification(&gateway, "Complete"))
            .unwrap();
        assert_eq!(n.amount, Cents(150_000));
        assert_eq!(
            n.order_id,
            Some("5f1c7c5e-2a3b-4d8e-9f10-1a2b3c4d5e6f".parse().unwrap())
        );
        assert_eq!(n.milestone_id, None);
        assert_eq!(
            PaymentKind::classify(&n),
            Some(PaymentKind::EscrowFunding {
                order_id: n.order_id.unwrap(),
                milestone_id: None
            })
        );
    }

    #[test]
    fn initiation_url_carries_hash_check() {
        let gateway = gateway();
        let order_id = OrderId::new();
        let milestone_id = MilestoneId::new();
        let checkout = Checkout {
            reference: format!("ORD-{order_id}-0A1B2C3D"),
            amount: Cents(60_000),
            item_name: "Wireframes".into(),
            kind: PaymentKind::EscrowFunding {
                order_id,
                milestone_id: Some(milestone_id),
            },
        };
        let buyer = BuyerContact {
            email: "lerato@example.co.za".into(),
            name: "Lerato".into(),
        };

        let url = gateway
            .initiate(&checkout, &buyer, "https://zomieks.test")
            .unwrap();
        assert!(url.starts_with("https://pay.ozow.com/?SiteCode=ZOM-001&"));

        let (_, query) = url.split_once('?').unwrap();
        let payload = WebhookPayload::from_form(query.as_bytes());
        assert_eq!(payload.get("Amount"), Some("600.00"));
        assert_eq!(payload.get("BankReference"), Some("Zomieks 0A1B2C3D"));
        assert_eq!(payload.get("Optional2"), Some(milestone_id.to_string().as_str()));
        assert_eq!(payload.get("IsTest"), Some("true"));

        let hashed: Vec<&str> = payload
            .fields()
            .iter()
            .filter(|(k, _)| k != "HashCheck")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(payload.get("HashCheck"), Some(gateway.hash(hashed).as_str()));
    }

    #[test]
    fn subscriptions_use_plan_in_second_optional() {
        let gateway = gateway();
        let user_id = UserId::new();
        let checkout = Checkout {
            reference: "SUB-0123456789ABCDEF".into(),
            amount: Cents(99_900),
            item_name: "Pro Annual plan".into(),
            kind: PaymentKind::Subscription {
                user_id,
                plan: Plan::Annual,
            },
        };
        let buyer = BuyerContact {
            email: "sipho@example.co.za".into(),
            name: "Sipho".into(),
        };
        let url = gateway.initiate(&checkout, &buyer, "http://localhost:3000").unwrap();
        let (_, query) = url.split_once('?').unwrap();
        let payload = WebhookPayload::from_form(query.as_bytes());
        assert_eq!(payload.get("Optional1"), Some(user_id.to_string().as_str()));
        assert_eq!(payload.get("Optional2"), Some("annual"));
    }
}
