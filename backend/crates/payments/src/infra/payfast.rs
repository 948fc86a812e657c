//! PayFast card gateway.
//!
//! Notifications (ITN) are form posts signed with an MD5 over every posted
//! field before `signature`, in received order and blanks included, plus the
//! merchant passphrase. Checkout redirects are signed the same way but leave
//! out blank fields. A notification is
//! accepted only when the signature matches, it came from a PayFast address,
//! it names our merchant and, when enabled, PayFast confirms it
//! server-to-server.

use http::header::CONTENT_TYPE;
use marketplace::models::{Cents, PaymentProvider};
use platform::crypto::{constant_time_eq, md5_hex};

use crate::application::config::PayFastConfig;
use crate::domain::gateway::{
    BuyerContact, CallbackUrls, Checkout, PaymentGateway, Verification, WebhookContext,
};
use crate::domain::notification::{PaymentNotification, PaymentStatus, WebhookPayload};
use crate::error::{PaymentError, PaymentResult};

const SIGNATURE_FIELD: &str = "signature";

#[derive(Debug, Clone)]
pub struct PayFastGateway {
    config: PayFastConfig,
    http: reqwest::Client,
}

impl PayFastGateway {
    pub fn new(config: PayFastConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.validate_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, http }
    }

    pub fn config(&self) -> &PayFastConfig {
        &self.config
    }

    /// Signature of a checkout redirect, over [`param_string`]
    pub fn checkout_signature<'a, I>(&self, fields: I) -> String
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.sign(param_string(fields))
    }

    /// Signature of a notification, over [`itn_param_string`]
    pub fn itn_signature<'a, I>(&self, fields: I) -> String
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.sign(itn_param_string(fields))
    }

    /// MD5 over the parameter string, with the passphrase appended when set
    fn sign(&self, mut params: String) -> String {
        if let Some(passphrase) = self
            .config
            .passphrase
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            if !params.is_empty() {
                params.push('&');
            }
            params.push_str("passphrase=");
            params.push_str(&encode(passphrase));
        }
        md5_hex(params.as_bytes())
    }

    fn signed_fields(payload: &WebhookPayload) -> impl Iterator<Item = (&str, &str)> {
        payload
            .fields()
            .iter()
            .take_while(|(k, _)| k != SIGNATURE_FIELD)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Ask PayFast whether it really sent this notification
    async fn confirm_with_server(&self, payload: &WebhookPayload) -> Result<bool, reqwest::Error> {
        let body = itn_param_string(Self::signed_fields(payload));
        let response = self
            .http
            .post(self.config.validate_url())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;
        Ok(text.trim() == "VALID")
    }

    fn check_source(&self, context: &WebhookContext) -> Result<(), String> {
        if !self.config.check_source_ip {
            return Ok(());
        }
        match context.source_ip {
            Some(ip) if self.config.allowed_ips.contains(ip) => Ok(()),
            Some(ip) => Err(format!("source {ip} is not a PayFast address")),
            None => Err("source address unknown".to_string()),
        }
    }
}

impl PaymentGateway for PayFastGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::PayFast
    }

    async fn verify_webhook(
        &self,
        payload: &WebhookPayload,
        context: &WebhookContext,
    ) -> Verification {
        if !self.config.is_configured() {
            return Verification::rejected("PayFast is not configured");
        }
        let Some(received) = payload.get(SIGNATURE_FIELD) else {
            return Verification::rejected("signature missing");
        };

        let expected = self.itn_signature(Self::signed_fields(payload));
        let received = received.to_ascii_lowercase();
        if !constant_time_eq(expected.as_bytes(), received.as_bytes()) {
            return Verification::rejected("signature mismatch");
        }

        if let Err(reason) = self.check_source(context) {
            return Verification::rejected(reason);
        }

        if payload.get("merchant_id") != Some(self.config.merchant_id.as_str()) {
            return Verification::rejected("merchant id mismatch");
        }

        if self.config.validate_with_server {
            match self.confirm_with_server(payload).await {
                Ok(true) => {}
                Ok(false) => return Verification::rejected("PayFast did not confirm the notification"),
                Err(e) => {
                    return Verification::rejected(format!("PayFast validation unavailable: {e}"));
                }
            }
        }

        Verification::valid()
    }

    fn parse_webhook(&self, payload: &WebhookPayload) -> PaymentResult<PaymentNotification> {
        let reference = payload
            .get("m_payment_id")
            .ok_or_else(|| PaymentError::validation("m_payment_id is missing"))?;

        let status = match payload
            .get("payment_status")
            .map(str::to_ascii_uppercase)
            .as_deref()
        {
            Some("COMPLETE") => PaymentStatus::Success,
            Some("FAILED") => PaymentStatus::Failed,
            Some("CANCELLED") => PaymentStatus::Cancelled,
            Some("PENDING") => PaymentStatus::Pending,
            other => {
                return Err(PaymentError::validation(format!(
                    "unknown payment_status: {}",
                    other.unwrap_or("")
                )));
            }
        };

        let amount = payload
            .get("amount_gross")
            .ok_or_else(|| PaymentError::validation("amount_gross is missing"))?;
        let amount =
            Cents::parse_rands(amount).map_err(|e| PaymentError::validation(e.to_string()))?;

        Ok(PaymentNotification::new(
            PaymentProvider::PayFast,
            reference,
            payload.get("pf_payment_id").map(str::to_string),
            status,
            amount,
        )
        .with_custom_fields(payload.get("custom_str1"), payload.get("custom_str2")))
    }

    fn initiate(
        &self,
        checkout: &Checkout,
        buyer: &BuyerContact,
        base_url: &str,
    ) -> PaymentResult<String> {
        if !self.config.is_configured() {
            return Err(PaymentError::NotConfigured(PaymentProvider::PayFast));
        }

        let urls = CallbackUrls::new(base_url, PaymentProvider::PayFast, &checkout.kind);
        let (custom1, custom2) = checkout.kind.custom_fields();
        let (first_name, last_name) = split_name(&buyer.name);

        // PayFast checks the signature against this exact field order
        let fields = [
            ("merchant_id", self.config.merchant_id.clone()),
            ("merchant_key", self.config.merchant_key.clone()),
            ("return_url", urls.success),
            ("cancel_url", urls.cancel),
            ("notify_url", urls.notify),
            ("name_first", first_name.to_string()),
            ("name_last", last_name.to_string()),
            ("email_address", buyer.email.clone()),
            ("m_payment_id", checkout.reference.clone()),
            ("amount", checkout.amount.to_rands()),
            ("item_name", checkout.item_name.clone()),
            ("custom_str1", custom1),
            ("custom_str2", custom2.unwrap_or_default()),
        ];
        let fields: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let signature = self.checkout_signature(fields.iter().copied());
        let query = param_string(fields.iter().copied());
        Ok(format!(
            "{}?{query}&{SIGNATURE_FIELD}={signature}",
            self.config.process_url()
        ))
    }
}

/// `key=value` pairs joined with `&`; empty values are skipped and values
/// are trimmed and form-encoded (`+` for spaces).
pub fn param_string<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    fields
        .into_iter()
        .map(|(k, v)| (k, v.trim()))
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{k}={}", encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// `key=value` pairs joined with `&`, exactly as posted: blank values are
/// kept and nothing is trimmed.
pub fn itn_param_string<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    fields
        .into_iter()
        .map(|(k, v)| format!("{k}={}", encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn split_name(name: &str) -> (&str, &str) {
    let name = name.trim();
    match name.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::id::OrderId;

    use crate::domain::notification::PaymentKind;

    fn gateway(passphrase: Option<&str>) -> PayFastGateway {
        PayFastGateway::new(PayFastConfig {
            passphrase: passphrase.map(str::to_string),
            ..PayFastConfig::development()
        })
    }

    fn itn(gateway: &PayFastGateway) -> WebhookPayload {
        let fields = vec![
            ("m_payment_id", "SUB-0123456789ABCDEF"),
            ("pf_payment_id", "1089250"),
            ("payment_status", "COMPLETE"),
            ("item_name", "Pro Monthly plan"),
            ("item_description", ""),
            ("amount_gross", "99.00"),
            ("amount_fee", "-2.28"),
            ("amount_net", "96.72"),
            ("custom_str1", "8c5b1d52-9f0e-4c55-8a7e-3b2a1f0d9e11"),
            ("custom_str2", "monthly"),
            ("email_address", "thabo@example.co.za"),
            ("merchant_id", "10000100"),
        ];
        let signature = gateway.itn_signature(fields.iter().copied());
        let mut pairs: Vec<(String, String)> = fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        pairs.push(("signature".into(), signature));
        WebhookPayload::from_pairs(pairs)
    }

    fn with_field(payload: &WebhookPayload, key: &str, value: &str) -> WebhookPayload {
        WebhookPayload::from_pairs(payload.fields().iter().map(|(k, v)| {
            if k == key {
                (k.clone(), value.to_string())
            } else {
                (k.clone(), v.clone())
            }
        }))
    }

    #[test]
    fn param_string_encodes_like_a_form() {
        let params = param_string([
            ("merchant_id", "10000100"),
            ("item_name", " Logo & brand pack "),
            ("email_address", "a@b.co"),
            ("custom_str2", ""),
        ]);
        assert_eq!(
            params,
            "merchant_id=10000100&item_name=Logo+%26+brand+pack&email_address=a%40b.co"
        );
    }

    #[test]
    fn signature_depends_on_order_and_passphrase() {
        let plain = gateway(None);
        let salted = gateway(Some("jt7NOE43FZPn"));
        let fields = [("a", "1"), ("b", "2")];
        let reversed = [("b", "2"), ("a", "1")];

        assert_eq!(plain.checkout_signature(fields), md5_hex(b"a=1&b=2"));
        assert_ne!(
            plain.checkout_signature(fields),
            plain.checkout_signature(reversed)
        );
        assert_eq!(
            salted.checkout_signature(fields),
            md5_hex(b"a=1&b=2&passphrase=jt7NOE43FZPn")
        );
    }

    #[test]
    fn itn_param_string_keeps_blanks_and_spacing() {
        let params = itn_param_string([
            ("item_name", " Logo & brand pack "),
            ("item_description", ""),
            ("merchant_id", "10000100"),
        ]);
        assert_eq!(
            params,
            "item_name=+Logo+%26+brand+pack+&item_description=&merchant_id=10000100"
        );
    }

    #[tokio::test]
    async fn blank_fields_are_signed_into_a_notification() {
        let gateway = gateway(Some("jt7NOE43FZPn"));
        let fields = [
            ("m_payment_id", "SUB-0123456789ABCDEF"),
            ("pf_payment_id", "1089250"),
            ("payment_status", "COMPLETE"),
            ("item_name", "Pro Monthly plan"),
            ("item_description", ""),
            ("amount_gross", "99.00"),
            ("name_first", "Thabo"),
            ("name_last", ""),
            ("merchant_id", "10000100"),
        ];
        let expected = md5_hex(
            b"m_payment_id=SUB-0123456789ABCDEF&pf_payment_id=1089250\
              &payment_status=COMPLETE&item_name=Pro+Monthly+plan&item_description=\
              &amount_gross=99.00&name_first=Thabo&name_last=&merchant_id=10000100\
              &passphrase=jt7NOE43FZPn",
        );
        assert_eq!(gateway.itn_signature(fields), expected);
        assert_ne!(gateway.checkout_signature(fields), expected);

        let mut pairs: Vec<(String, String)> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        pairs.push(("signature".into(), expected));
        let payload = WebhookPayload::from_pairs(pairs);
        let verification = gateway
            .verify_webhook(&payload, &WebhookContext::default())
            .await;
        assert_eq!(verification, Verification::valid());
    }

    #[tokio::test]
    async fn fields_after_the_signature_are_not_signed() {
        let gateway = gateway(None);
        let mut pairs: Vec<(String, String)> = itn(&gateway).fields().to_vec();
        pairs.push(("trailing".into(), "ignored".into()));
        let payload = WebhookPayload::from_pairs(pairs);
        assert!(
            gateway
                .verify_webhook(&payload, &WebhookContext::default())
                .await
                .valid
        );
    }

    #[tokio::test]
    async fn accepts_a_correctly_signed_notification() {
        let gateway = gateway(Some("jt7NOE43FZPn"));
        let payload = itn(&gateway);
        let verification = gateway
            .verify_webhook(&payload, &WebhookContext::default())
            .await;
        assert_eq!(verification, Verification::valid());
    }

    #[tokio::test]
    async fn rejects_tampering_and_foreign_merchants() {
        let gateway = gateway(None);
        let payload = itn(&gateway);
        let context = WebhookContext::default();

        let tampered = with_field(&payload, "amount_gross", "9.90");
        let v = gateway.verify_webhook(&tampered, &context).await;
        assert!(!v.valid);
        assert_eq!(v.reason.as_deref(), Some("signature mismatch"));

        let unsigned = WebhookPayload::from_pairs(
            payload
                .fields()
                .iter()
                .filter(|(k, _)| k != "signature")
                .cloned(),
        );
        assert!(!gateway.verify_webhook(&unsigned, &context).await.valid);

        let other = PayFastGateway::new(PayFastConfig {
            merchant_id: "10000999".into(),
            ..PayFastConfig::development()
        });
        let v = other.verify_webhook(&itn(&other), &context).await;
        assert_eq!(v.reason.as_deref(), Some("merchant id mismatch"));
    }

    #[tokio::test]
    async fn source_address_must_be_allowed() {
        let gateway = PayFastGateway::new(PayFastConfig {
            check_source_ip: true,
            allowed_ips: platform::client::IpAllowList::parse(["197.97.145.144/28"]).unwrap(),
            ..PayFastConfig::development()
        });
        let payload = itn(&gateway);

        let inside = WebhookContext {
            source_ip: Some("197.97.145.150".parse().unwrap()),
        };
        assert!(gateway.verify_webhook(&payload, &inside).await.valid);

        let outside = WebhookContext {
            source_ip: Some("10.1.2.3".parse().unwrap()),
        };
        assert!(!gateway.verify_webhook(&payload, &outside).await.valid);
        assert!(!gateway.verify_webhook(&payload, &WebhookContext::default()).await.valid);
    }

    #[test]
    fn parses_an_itn() {
        let gateway = gateway(None);
        let n = gateway.parse_webhook(&itn(&gateway)).unwrap();
        assert_eq!(n.provider, PaymentProvider::PayFast);
        assert_eq!(n.reference, "SUB-0123456789ABCDEF");
        assert_eq!(n.transaction_id.as_deref(), Some("1089250"));
        assert_eq!(n.status, PaymentStatus::Success);
        assert_eq!(n.amount, Cents(9_900));
        assert_eq!(n.plan, Some(marketplace::models::Plan::Monthly));
        assert!(n.user_id.is_some());

        for (raw, status) in [
            ("FAILED", PaymentStatus::Failed),
            ("CANCELLED", PaymentStatus::Cancelled),
            ("PENDING", PaymentStatus::Pending),
        ] {
            let payload = with_field(&itn(&gateway), "payment_status", raw);
            assert_eq!(gateway.parse_webhook(&payload).unwrap().status, status);
        }

        let payload = with_field(&itn(&gateway), "payment_status", "REFUNDED");
        assert!(gateway.parse_webhook(&payload).is_err());
    }

    #[test]
    fn initiation_url_is_signed() {
        let gateway = gateway(Some("jt7NOE43FZPn"));
        let order_id = OrderId::new();
        let checkout = Checkout {
            reference: format!("ORD-{order_id}-0A1B2C3D"),
            amount: Cents(150_000),
            item_name: "Logo design".into(),
            kind: PaymentKind::EscrowFunding {
                order_id,
                milestone_id: None,
            },
        };
        let buyer = BuyerContact {
            email: "lerato@example.co.za".into(),
            name: "Lerato".into(),
        };

        let url = gateway
            .initiate(&checkout, &buyer, "https://zomieks.test")
            .unwrap();
        let (base, query) = url.split_once('?').unwrap();
        assert_eq!(base, "https://sandbox.payfast.co.za/eng/process");

        let payload = WebhookPayload::from_form(query.as_bytes());
        assert_eq!(payload.get("amount"), Some("1500.00"));
        assert_eq!(payload.get("custom_str1"), Some(order_id.to_string().as_str()));
        assert_eq!(payload.get("name_last"), None);
        assert_eq!(
            payload.get("notify_url"),
            Some("https://zomieks.test/api/webhooks/payfast")
        );

        let signed: Vec<_> = payload
            .fields()
            .iter()
            .filter(|(k, _)| k != "signature")
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(payload.get("signature"), Some(gateway.checkout_signature(signed).as_str()));
    }

    #[test]
    fn unconfigured_merchant_cannot_initiate() {
        let gateway = PayFastGateway::new(PayFastConfig::default());
        let checkout = Checkout {
            reference: "SUB-0123456789ABCDEF".into(),
            amount: Cents(9_900),
            item_name: "Pro Monthly plan".into(),
            kind: PaymentKind::Subscription {
                user_id: kernel::id::UserId::new(),
                plan: marketplace::models::Plan::Monthly,
            },
        };
        let buyer = BuyerContact {
            email: "a@b.co".into(),
            name: "A".into(),
        };
        assert!(matches!(
            gateway.initiate(&checkout, &buyer, "http://localhost:3000"),
            Err(PaymentError::NotConfigured(PaymentProvider::PayFast))
        ));
    }
}
