use std::sync::Arc;
use std::time::Duration;

use auth::MemorySessionStore;
use auth::config::AuthConfig;
use auth::models::{SessionRecord, SessionToken, UserRole};
use auth::store::SessionStore;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use kernel::id::UserId;
use marketplace::MemoryMarketplaceRepository;
use marketplace::models::Plan;
use marketplace::store::SubscriptionRepository;
use tower::ServiceExt;

use super::*;
use crate::domain::reference::subscription_reference;

const SESSION_COOKIE: &str = "zomieks_session";

struct App {
    router: Router,
    repo: Arc<MemoryMarketplaceRepository>,
    sessions: Arc<MemorySessionStore>,
    gateways: Gateways,
}

impl App {
    fn new() -> Self {
        let config = PaymentsConfig {
            payfast: PayFastConfig {
                passphrase: Some("jt7NOE43FZPn".into()),
                ..PayFastConfig::development()
            },
            ozow: OzowConfig {
                site_code: "ZOM-001".into(),
                private_key: "Pr1vateKey".into(),
                ..OzowConfig::development()
            },
            ..PaymentsConfig::development()
        };
        let repo = Arc::new(MemoryMarketplaceRepository::new());
        let sessions = Arc::new(MemorySessionStore::default());
        let gateways = Gateways::new(&config);
        let router = payments_router_generic(
            repo.clone(),
            sessions.clone(),
            Arc::new(AuthConfig::development()),
            config,
        );
        Self {
            router,
            repo,
            sessions,
            gateways,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Option<String>, String) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, location, String::from_utf8(body.to_vec()).unwrap())
    }

    /// Signed-in user; returns the user id and the cookie header value
    async fn sign_in(&self, name: &str) -> (UserId, String) {
        let user_id = UserId::new();
        self.repo.register_user(user_id).await;
        let record = SessionRecord {
            user_id,
            email: format!("{name}@example.co.za"),
            user_name: name.to_string(),
            role: UserRole::User,
            email_verified: true,
            identity_verified: true,
            created_at: Utc::now(),
        };
        let token = SessionToken::generate();
        self.sessions
            .create(&token, &record, Duration::from_secs(3600))
            .await
            .unwrap();
        (user_id, format!("{SESSION_COOKIE}={}", token.as_str()))
    }

    /// Form-encoded PayFast ITN with a valid signature
    fn payfast_itn(&self, fields: &[(&str, &str)]) -> String {
        let signature = self.gateways.payfast.itn_signature(fields.iter().copied());
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in fields {
            form.append_pair(key, value);
        }
        form.append_pair("signature", &signature);
        form.finish()
    }

    /// Form-encoded Ozow notification with a valid hash
    fn ozow_notification(&self, reference: &str, order_id: &str) -> String {
        let fields = [
            ("SiteCode", "ZOM-001"),
            ("TransactionId", "b1f7a2c4-0000-4000-8000-000000000001"),
            ("TransactionReference", reference),
            ("Amount", "1500.00"),
            ("Status", "Complete"),
            ("Optional1", order_id),
            ("Optional2", ""),
            ("Optional3", ""),
            ("Optional4", ""),
            ("Optional5", ""),
            ("CurrencyCode", "ZAR"),
            ("IsTest", "true"),
            ("StatusMessage", ""),
        ];
        let hash = self.gateways.ozow.hash(fields.iter().map(|(_, v)| *v));
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in fields {
            form.append_pair(key, value);
        }
        form.append_pair("Hash", &hash);
        form.finish()
    }
}

fn form_post(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn json_post(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ============================================================================
// Webhooks
// ============================================================================

#[tokio::test]
async fn payfast_itn_is_acknowledged_with_ok_and_settles() {
    let app = App::new();
    let user_id = UserId::new();
    app.repo.register_user(user_id).await;
    let uid = user_id.to_string();
    let reference = subscription_reference();
    let body = app.payfast_itn(&[
        ("m_payment_id", reference.as_str()),
        ("pf_payment_id", "1089250"),
        ("payment_status", "COMPLETE"),
        ("item_name", "Zomieks Monthly plan"),
        ("item_description", ""),
        ("amount_gross", "99.00"),
        ("custom_str1", uid.as_str()),
        ("custom_str2", "monthly"),
        ("merchant_id", "10000100"),
    ]);

    let (status, _, text) = app.send(form_post("/api/webhooks/payfast", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "OK");
    let subscription = app.repo.find_subscription(user_id).await.unwrap().unwrap();
    assert_eq!(subscription.payment_reference.as_deref(), Some(reference.as_str()));
}

#[tokio::test]
async fn tampered_payfast_itn_is_a_bad_request() {
    let app = App::new();
    let user_id = UserId::new();
    app.repo.register_user(user_id).await;
    let uid = user_id.to_string();
    let reference = subscription_reference();
    let body = app
        .payfast_itn(&[
            ("m_payment_id", reference.as_str()),
            ("payment_status", "COMPLETE"),
            ("amount_gross", "99.00"),
            ("custom_str1", uid.as_str()),
            ("custom_str2", "monthly"),
            ("merchant_id", "10000100"),
        ])
        .replace("amount_gross=99.00", "amount_gross=999.00");

    let (status, _, _) = app.send(form_post("/api/webhooks/payfast", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let subscription = app.repo.find_subscription(user_id).await.unwrap().unwrap();
    assert_eq!(subscription.plan, Plan::Free);
    assert!(app.repo.ledger().await.is_empty());
}

#[tokio::test]
async fn oversized_webhook_body_is_acknowledged_and_ignored() {
    let app = App::new();
    let body = format!("m_payment_id=SUB-0011223344556677&padding={}", "a".repeat(70 * 1024));

    let (status, _, text) = app.send(form_post("/api/webhooks/payfast", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "OK");
    assert!(app.repo.ledger().await.is_empty());

    let body = format!("SiteCode=ZOM-001&padding={}", "a".repeat(70 * 1024));
    let (status, _, text) = app.send(form_post("/api/webhooks/ozow", body)).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn ozow_notification_for_unknown_order_is_still_acknowledged() {
    let app = App::new();
    let order_id = "5f1c7c5e-2a3b-4d8e-9f10-1a2b3c4d5e6f";
    let body = app.ozow_notification(&format!("ORD-{order_id}-0A1B2C3D"), order_id);

    let (status, _, text) = app.send(form_post("/api/webhooks/ozow", body)).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["success"], true);
    assert!(app.repo.ledger().await.is_empty());
}

#[tokio::test]
async fn unsigned_ozow_notification_is_a_bad_request() {
    let app = App::new();
    let (status, _, _) = app
        .send(form_post(
            "/api/webhooks/ozow",
            "SiteCode=ZOM-001&TransactionReference=SUB-0011223344556677&Status=Complete".into(),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Initiation
// ============================================================================

#[tokio::test]
async fn initiation_requires_a_session() {
    let app = App::new();
    let (status, _, _) = app
        .send(json_post(
            "/api/payments/payfast/subscribe",
            None,
            r#"{"plan":"monthly"}"#,
        ))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn subscribe_returns_a_signed_gateway_redirect() {
    let app = App::new();
    let (_, cookie) = app.sign_in("thandi").await;

    let (status, _, text) = app
        .send(json_post(
            "/api/payments/payfast/subscribe",
            Some(cookie.as_str()),
            r#"{"plan":"annual"}"#,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["success"], true);
    let redirect = json["redirectUrl"].as_str().unwrap();
    assert!(redirect.starts_with("https://sandbox.payfast.co.za/eng/process?"));
    assert!(redirect.contains("&signature="));
    assert!(json["reference"].as_str().unwrap().starts_with("SUB-"));
}

#[tokio::test]
async fn unknown_gateway_is_not_found() {
    let app = App::new();
    let (_, cookie) = app.sign_in("sipho").await;

    let (status, _, _) = app
        .send(json_post(
            "/api/payments/snapscan/subscribe",
            Some(cookie.as_str()),
            r#"{"plan":"monthly"}"#,
        ))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Browser returns
// ============================================================================

#[tokio::test]
async fn return_redirects_to_the_order_page() {
    let app = App::new();
    let order_id = "5f1c7c5e-2a3b-4d8e-9f10-1a2b3c4d5e6f";

    let (status, location, _) = app
        .send(get(&format!("/api/payments/ozow/success?orderId={order_id}")))
        .await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(
        location.as_deref(),
        Some(format!("/orders/{order_id}?payment=success").as_str())
    );
}

#[tokio::test]
async fn subscription_return_redirects_to_the_plan_page() {
    let app = App::new();

    let (status, location, _) = app
        .send(get("/api/payments/payfast/cancel?kind=subscription"))
        .await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/subscription?payment=cancelled"));
}

#[tokio::test]
async fn unknown_return_outcome_is_not_found() {
    let app = App::new();
    let (status, _, _) = app.send(get("/api/payments/payfast/maybe")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
