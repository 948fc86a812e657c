use std::sync::Arc;

use auth::Identity;
use auth::models::UserRole;
use chrono::Months;
use kernel::id::{MilestoneId, OrderId, ServiceId, UserId};
use marketplace::MemoryMarketplaceRepository;
use marketplace::models::{
    Cents, LedgerStatus, Milestone, MilestoneStatus, Order, OrderOrigin, OrderStatus,
    PaymentProvider, Plan, Subscription, TransactionKind,
};
use marketplace::store::{OrderRepository, SubscriptionRepository};

use super::*;
use crate::domain::gateway::WebhookContext;
use crate::domain::notification::{PaymentNotification, PaymentStatus, WebhookPayload};
use crate::domain::reference::{order_reference, subscription_reference};
use crate::error::PaymentError;
use crate::infra::Gateways;

struct Harness {
    repo: Arc<MemoryMarketplaceRepository>,
    gateways: Arc<Gateways>,
}

impl Harness {
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
        Self {
            repo: Arc::new(MemoryMarketplaceRepository::new()),
            gateways: Arc::new(Gateways::new(&config)),
        }
    }

    async fn user(&self, name: &str) -> Identity {
        let identity = Identity {
            user_id: UserId::new(),
            email: format!("{name}@example.co.za"),
            user_name: name.to_string(),
            role: UserRole::User,
            email_verified: true,
            identity_verified: true,
        };
        self.repo.register_user(identity.user_id).await;
        identity
    }

    fn settle(&self) -> SettlePaymentUseCase<MemoryMarketplaceRepository> {
        SettlePaymentUseCase::new(self.repo.clone())
    }

    fn webhooks(&self) -> HandleWebhookUseCase<MemoryMarketplaceRepository> {
        HandleWebhookUseCase::new(self.repo.clone(), self.gateways.clone())
    }

    fn initiate(&self) -> InitiatePaymentUseCase<MemoryMarketplaceRepository> {
        InitiatePaymentUseCase::new(self.repo.clone())
    }

    async fn order(&self, buyer: &Identity, seller: &Identity) -> Order {
        let order = Order::new(
            buyer.user_id,
            seller.user_id,
            OrderOrigin::Service(ServiceId::new()),
            "Logo design".into(),
            None,
            Cents(150_000),
        );
        self.repo.create_order(&order).await.unwrap();
        order
    }

    async fn subscription(&self, user_id: UserId) -> Option<Subscription> {
        self.repo.find_subscription(user_id).await.unwrap()
    }

    async fn titles(&self, user_id: UserId) -> Vec<String> {
        self.repo
            .notifications_for(user_id)
            .await
            .into_iter()
            .map(|n| n.title)
            .collect()
    }

    /// A PayFast ITN signed the way PayFast signs it
    fn payfast_itn(&self, fields: &[(&str, &str)]) -> WebhookPayload {
        let signature = self.gateways.payfast.itn_signature(fields.iter().copied());
        let mut pairs: Vec<(String, String)> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        pairs.push(("signature".into(), signature));
        WebhookPayload::from_pairs(pairs)
    }
}

fn subscription_payment(user_id: UserId, plan: Plan, status: PaymentStatus) -> PaymentNotification {
    let uid = user_id.to_string();
    PaymentNotification::new(
        PaymentProvider::PayFast,
        subscription_reference(),
        Some("1089250".into()),
        status,
        plan.price(),
    )
    .with_custom_fields(Some(&uid), Some(plan.code()))
}

fn escrow_payment(order: &Order, status: PaymentStatus) -> PaymentNotification {
    PaymentNotification::new(
        PaymentProvider::Ozow,
        order_reference(order.id),
        Some("b1f7a2c4-0000-4000-8000-000000000001".into()),
        status,
        order.amount,
    )
}

// ============================================================================
// Subscription settlement
// ============================================================================

mod subscription_tests {
    use super::*;

    #[tokio::test]
    async fn success_without_a_row_inserts_one_month() {
        let h = Harness::new();
        let user_id = UserId::new();
        assert_eq!(h.repo.subscription_count().await, 0);

        let settlement = h
            .settle()
            .execute(&subscription_payment(user_id, Plan::Monthly, PaymentStatus::Success))
            .await
            .unwrap();
        assert_eq!(settlement, Settlement::Applied);

        assert_eq!(h.repo.subscription_count().await, 1);
        let sub = h.subscription(user_id).await.unwrap();
        assert_eq!(sub.plan, Plan::Monthly);
        assert_eq!(
            sub.period_end,
            sub.period_start.checked_add_months(Months::new(1))
        );

        let ledger = h.repo.ledger().await;
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].kind, TransactionKind::Subscription);
        assert_eq!(ledger[0].status, LedgerStatus::Completed);
        assert_eq!(ledger[0].amount, Cents(9_900));
        assert_eq!(ledger[0].user_id, user_id);

        let notifications = h.repo.notifications_for(user_id).await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Subscription Activated");
        assert!(notifications[0].send_email);
    }

    #[tokio::test]
    async fn annual_adds_a_calendar_year() {
        let h = Harness::new();
        let user = h.user("naledi").await;
        h.settle()
            .execute(&subscription_payment(user.user_id, Plan::Annual, PaymentStatus::Success))
            .await
            .unwrap();

        let sub = h.subscription(user.user_id).await.unwrap();
        assert_eq!(sub.plan, Plan::Annual);
        assert_eq!(
            sub.period_end,
            sub.period_start.checked_add_months(Months::new(12))
        );
    }

    #[tokio::test]
    async fn existing_row_is_updated_not_duplicated() {
        let h = Harness::new();
        let user = h.user("sipho").await;
        let mut sub = h.subscription(user.user_id).await.unwrap();
        sub.bids_used = 7;
        h.repo.put_subscription(sub.clone()).await;
        assert_eq!(h.repo.subscription_count().await, 1);

        h.settle()
            .execute(&subscription_payment(user.user_id, Plan::Monthly, PaymentStatus::Success))
            .await
            .unwrap();

        assert_eq!(h.repo.subscription_count().await, 1);
        let renewed = h.subscription(user.user_id).await.unwrap();
        assert_eq!(renewed.id, sub.id);
        assert_eq!(renewed.plan, Plan::Monthly);
        assert_eq!(renewed.bids_used, 0);
        assert!(renewed.payment_reference.unwrap().starts_with("SUB-"));
    }

    #[tokio::test]
    async fn redelivery_settles_once() {
        let h = Harness::new();
        let user = h.user("thandi").await;
        let payment = subscription_payment(user.user_id, Plan::Monthly, PaymentStatus::Success);

        assert_eq!(h.settle().execute(&payment).await.unwrap(), Settlement::Applied);
        let first = h.subscription(user.user_id).await.unwrap();

        assert_eq!(h.settle().execute(&payment).await.unwrap(), Settlement::Duplicate);
        let second = h.subscription(user.user_id).await.unwrap();

        assert_eq!(h.repo.ledger().await.len(), 1);
        assert_eq!(first.period_end, second.period_end);
        assert_eq!(h.titles(user.user_id).await, ["Subscription Activated"]);
    }

    #[tokio::test]
    async fn failed_or_cancelled_only_notify() {
        let h = Harness::new();
        let user_id = UserId::new();

        for status in [PaymentStatus::Failed, PaymentStatus::Cancelled] {
            let settlement = h
                .settle()
                .execute(&subscription_payment(user_id, Plan::Monthly, status))
                .await
                .unwrap();
            assert_eq!(settlement, Settlement::NotifiedFailure);
        }

        assert_eq!(h.repo.subscription_count().await, 0);
        assert!(h.repo.ledger().await.is_empty());
        assert_eq!(
            h.titles(user_id).await,
            ["Subscription Payment Failed", "Subscription Payment Failed"]
        );
    }

    #[tokio::test]
    async fn underpayment_changes_nothing() {
        let h = Harness::new();
        let user = h.user("bongani").await;
        let mut payment = subscription_payment(user.user_id, Plan::Annual, PaymentStatus::Success);
        payment.amount = Plan::Monthly.price();

        assert_eq!(h.settle().execute(&payment).await.unwrap(), Settlement::Ignored);
        assert_eq!(h.subscription(user.user_id).await.unwrap().plan, Plan::Free);
        assert!(h.repo.ledger().await.is_empty());
    }
}

// ============================================================================
// Escrow settlement
// ============================================================================

mod escrow_tests {
    use super::*;

    #[tokio::test]
    async fn success_starts_the_order_and_notifies_both_parties() {
        let h = Harness::new();
        let buyer = h.user("lerato").await;
        let seller = h.user("kagiso").await;
        let order = h.order(&buyer, &seller).await;

        let settlement = h
            .settle()
            .execute(&escrow_payment(&order, PaymentStatus::Success))
            .await
            .unwrap();
        assert_eq!(settlement, Settlement::Applied);

        let stored = h.repo.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::InProgress);

        let ledger = h.repo.ledger().await;
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].kind, TransactionKind::EscrowFund);
        assert_eq!(ledger[0].order_id, Some(order.id));
        assert_eq!(ledger[0].user_id, buyer.user_id);
        assert_eq!(ledger[0].provider, PaymentProvider::Ozow);

        assert_eq!(h.titles(buyer.user_id).await, ["Payment Successful"]);
        assert_eq!(h.titles(seller.user_id).await, ["New Order Started"]);
    }

    #[tokio::test]
    async fn redelivery_writes_one_ledger_row() {
        let h = Harness::new();
        let buyer = h.user("lerato").await;
        let seller = h.user("kagiso").await;
        let order = h.order(&buyer, &seller).await;
        let payment = escrow_payment(&order, PaymentStatus::Success);

        assert_eq!(h.settle().execute(&payment).await.unwrap(), Settlement::Applied);
        assert_eq!(h.settle().execute(&payment).await.unwrap(), Settlement::Duplicate);

        assert_eq!(h.repo.ledger().await.len(), 1);
        assert_eq!(h.repo.notification_count().await, 2);
    }

    #[tokio::test]
    async fn failure_notifies_the_buyer_only() {
        let h = Harness::new();
        let buyer = h.user("lerato").await;
        let seller = h.user("kagiso").await;
        let order = h.order(&buyer, &seller).await;

        let settlement = h
            .settle()
            .execute(&escrow_payment(&order, PaymentStatus::Cancelled))
            .await
            .unwrap();
        assert_eq!(settlement, Settlement::NotifiedFailure);

        let stored = h.repo.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::AwaitingPayment);
        assert!(h.repo.ledger().await.is_empty());
        assert_eq!(h.titles(buyer.user_id).await, ["Payment Failed"]);
        assert!(h.titles(seller.user_id).await.is_empty());
    }

    #[tokio::test]
    async fn unknown_order_is_ignored() {
        let h = Harness::new();
        let payment = PaymentNotification::new(
            PaymentProvider::PayFast,
            order_reference(OrderId::new()),
            None,
            PaymentStatus::Success,
            Cents(150_000),
        );
        assert_eq!(h.settle().execute(&payment).await.unwrap(), Settlement::Ignored);
        assert!(h.repo.ledger().await.is_empty());
        assert_eq!(h.repo.notification_count().await, 0);
    }

    #[tokio::test]
    async fn pending_changes_nothing() {
        let h = Harness::new();
        let buyer = h.user("lerato").await;
        let seller = h.user("kagiso").await;
        let order = h.order(&buyer, &seller).await;

        let settlement = h
            .settle()
            .execute(&escrow_payment(&order, PaymentStatus::Pending))
            .await
            .unwrap();
        assert_eq!(settlement, Settlement::Pending);
        assert!(h.repo.ledger().await.is_empty());
        assert_eq!(h.repo.notification_count().await, 0);
    }

    #[tokio::test]
    async fn underpaid_order_stays_unpaid() {
        let h = Harness::new();
        let buyer = h.user("lerato").await;
        let seller = h.user("kagiso").await;
        let order = h.order(&buyer, &seller).await;
        let mut payment = escrow_payment(&order, PaymentStatus::Success);
        payment.amount = Cents(1_000);

        assert_eq!(h.settle().execute(&payment).await.unwrap(), Settlement::Ignored);
        let stored = h.repo.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::AwaitingPayment);
    }

    #[tokio::test]
    async fn milestone_on_a_running_order_is_funded() {
        let h = Harness::new();
        let buyer = h.user("lerato").await;
        let seller = h.user("kagiso").await;
        let order = h.order(&buyer, &seller).await;
        h.settle()
            .execute(&escrow_payment(&order, PaymentStatus::Success))
            .await
            .unwrap();

        let milestone = Milestone::plan(&order, &[], "Wireframes", Cents(60_000)).unwrap();
        h.repo.add_milestone(&milestone).await.unwrap();

        let oid = order.id.to_string();
        let mid = milestone.id.to_string();
        let payment = PaymentNotification::new(
            PaymentProvider::PayFast,
            order_reference(order.id),
            Some("1089300".into()),
            PaymentStatus::Success,
            Cents(60_000),
        )
        .with_custom_fields(Some(&oid), Some(&mid));

        assert_eq!(h.settle().execute(&payment).await.unwrap(), Settlement::Applied);
        let funded = h.repo.find_milestone(milestone.id).await.unwrap().unwrap();
        assert_eq!(funded.status, MilestoneStatus::Funded);
        assert_eq!(h.repo.ledger().await.len(), 2);
        assert_eq!(
            h.titles(seller.user_id).await,
            ["New Order Started", "Milestone Funded"]
        );
    }

    #[tokio::test]
    async fn unrecognized_reference_is_acknowledged_without_changes() {
        let h = Harness::new();
        let payment = PaymentNotification::new(
            PaymentProvider::PayFast,
            "XYZ-1",
            None,
            PaymentStatus::Success,
            Cents(5_000),
        );
        assert_eq!(h.settle().execute(&payment).await.unwrap(), Settlement::Ignored);
        assert!(h.repo.ledger().await.is_empty());
        assert_eq!(h.repo.subscription_count().await, 0);
    }
}

// ============================================================================
// Webhook handling
// ============================================================================

mod webhook_tests {
    use super::*;

    #[tokio::test]
    async fn signed_payfast_itn_settles_a_subscription() {
        let h = Harness::new();
        let user = h.user("zanele").await;
        let uid = user.user_id.to_string();
        let reference = subscription_reference();
        let payload = h.payfast_itn(&[
            ("m_payment_id", reference.as_str()),
            ("pf_payment_id", "1089250"),
            ("payment_status", "COMPLETE"),
            ("item_name", "Zomieks Pro Monthly plan"),
            ("amount_gross", "99.00"),
            ("custom_str1", uid.as_str()),
            ("custom_str2", "monthly"),
            ("merchant_id", "10000100"),
        ]);

        let outcome = h
            .webhooks()
            .execute(PaymentProvider::PayFast, &payload, &WebhookContext::default())
            .await;
        assert_eq!(outcome, WebhookOutcome::Acknowledged(Some(Settlement::Applied)));
        assert_eq!(h.subscription(user.user_id).await.unwrap().plan, Plan::Monthly);
    }

    #[tokio::test]
    async fn unverifiable_signature_is_rejected_without_changes() {
        let h = Harness::new();
        let user = h.user("zanele").await;
        let uid = user.user_id.to_string();
        let reference = subscription_reference();
        let signed = h.payfast_itn(&[
            ("m_payment_id", reference.as_str()),
            ("payment_status", "COMPLETE"),
            ("amount_gross", "99.00"),
            ("custom_str1", uid.as_str()),
            ("custom_str2", "monthly"),
            ("merchant_id", "10000100"),
        ]);
        let forged = WebhookPayload::from_pairs(signed.fields().iter().map(|(k, v)| {
            if k == "custom_str2" {
                (k.clone(), "annual".to_string())
            } else {
                (k.clone(), v.clone())
            }
        }));

        let outcome = h
            .webhooks()
            .execute(PaymentProvider::PayFast, &forged, &WebhookContext::default())
            .await;
        assert_eq!(outcome, WebhookOutcome::Rejected("signature mismatch".into()));
        assert!(h.repo.ledger().await.is_empty());
        assert_eq!(h.repo.notification_count().await, 0);
        assert_eq!(h.subscription(user.user_id).await.unwrap().plan, Plan::Free);
    }

    #[tokio::test]
    async fn verified_but_unparseable_is_acknowledged() {
        let h = Harness::new();
        let payload = h.payfast_itn(&[
            ("m_payment_id", "SUB-0123456789ABCDEF"),
            ("payment_status", "REFUNDED"),
            ("amount_gross", "99.00"),
            ("merchant_id", "10000100"),
        ]);
        let outcome = h
            .webhooks()
            .execute(PaymentProvider::PayFast, &payload, &WebhookContext::default())
            .await;
        assert_eq!(outcome, WebhookOutcome::Acknowledged(None));
    }
}

// ============================================================================
// Initiation
// ============================================================================

mod initiate_tests {
    use super::*;

    #[tokio::test]
    async fn buyer_pays_the_full_order() {
        let h = Harness::new();
        let buyer = h.user("lerato").await;
        let seller = h.user("kagiso").await;
        let order = h.order(&buyer, &seller).await;

        let checkout = h.initiate().order_checkout(&buyer, order.id, None).await.unwrap();
        assert!(checkout.reference.starts_with(&format!("ORD-{}-", order.id)));
        assert_eq!(checkout.amount, Cents(150_000));
        assert_eq!(checkout.item_name, "Logo design");
    }

    #[tokio::test]
    async fn only_the_buyer_may_pay() {
        let h = Harness::new();
        let buyer = h.user("lerato").await;
        let seller = h.user("kagiso").await;
        let outsider = h.user("mpho").await;
        let order = h.order(&buyer, &seller).await;

        let err = h.initiate().order_checkout(&seller, order.id, None).await.unwrap_err();
        assert!(matches!(err, PaymentError::Forbidden(_)));
        let err = h.initiate().order_checkout(&outsider, order.id, None).await.unwrap_err();
        assert!(matches!(err, PaymentError::NotFound("Order")));
    }

    #[tokio::test]
    async fn started_orders_only_take_milestone_payments() {
        let h = Harness::new();
        let buyer = h.user("lerato").await;
        let seller = h.user("kagiso").await;
        let order = h.order(&buyer, &seller).await;
        h.settle()
            .execute(&escrow_payment(&order, PaymentStatus::Success))
            .await
            .unwrap();

        let err = h.initiate().order_checkout(&buyer, order.id, None).await.unwrap_err();
        assert!(matches!(err, PaymentError::Conflict(_)));

        let milestone = Milestone::plan(&order, &[], "Wireframes", Cents(60_000)).unwrap();
        h.repo.add_milestone(&milestone).await.unwrap();
        let checkout = h
            .initiate()
            .order_checkout(&buyer, order.id, Some(milestone.id))
            .await
            .unwrap();
        assert_eq!(checkout.amount, Cents(60_000));
        assert_eq!(checkout.item_name, "Logo design: Wireframes");

        let err = h
            .initiate()
            .order_checkout(&buyer, order.id, Some(MilestoneId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::NotFound("Milestone")));
    }

    #[tokio::test]
    async fn subscriptions_are_paid_plans_only() {
        let h = Harness::new();
        let user = h.user("zanele").await;

        let checkout = h.initiate().subscription_checkout(&user, Plan::Annual).unwrap();
        assert!(checkout.reference.starts_with("SUB-"));
        assert_eq!(checkout.amount, Cents(99_900));

        let err = h.initiate().subscription_checkout(&user, Plan::Free).unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
    }
}
