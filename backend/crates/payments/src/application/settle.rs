//! Payment Settlement
//!
//! Applies one verified, parsed notification: classify it once, then settle
//! a subscription or an escrow funding. The ledger insert and the state
//! change share a transaction keyed by `(provider, reference)`, so a
//! redelivered webhook settles to [`Settlement::Duplicate`].

use std::sync::Arc;

use chrono::Utc;
use kernel::id::{MilestoneId, OrderId, UserId};
use marketplace::NotificationEmitter;
use marketplace::models::{LedgerEntry, Notification, Order, Plan, Renewal, TransactionKind};
use marketplace::store::{EscrowWrite, LedgerRepository, LedgerWrite, OrderRepository};

use crate::domain::PaymentStore;
use crate::domain::notification::{PaymentKind, PaymentNotification, PaymentStatus};
use crate::error::PaymentResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Ledger row written and state changed
    Applied,
    /// The reference was settled before
    Duplicate,
    /// Unrecognized, unknown order, or underpaid; nothing changed
    Ignored,
    /// Failed or cancelled payment; only the payer was notified
    NotifiedFailure,
    /// Still processing at the gateway
    Pending,
}

pub struct SettlePaymentUseCase<R>
where
    R: PaymentStore,
{
    repo: Arc<R>,
    notifier: NotificationEmitter<R>,
}

impl<R> SettlePaymentUseCase<R>
where
    R: PaymentStore,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            notifier: NotificationEmitter::new(repo.clone()),
            repo,
        }
    }

    pub async fn execute(&self, notification: &PaymentNotification) -> PaymentResult<Settlement> {
        let Some(kind) = PaymentKind::classify(notification) else {
            tracing::warn!(
                provider = %notification.provider,
                reference = %notification.reference,
                "Unrecognized payment reference"
            );
            return Ok(Settlement::Ignored);
        };

        if notification.status == PaymentStatus::Pending {
            tracing::info!(
                provider = %notification.provider,
                reference = %notification.reference,
                "Payment pending at gateway"
            );
            return Ok(Settlement::Pending);
        }

        match kind {
            PaymentKind::Subscription { user_id, plan } => {
                self.settle_subscription(notification, user_id, plan).await
            }
            PaymentKind::EscrowFunding {
                order_id,
                milestone_id,
            } => self.settle_escrow(notification, order_id, milestone_id).await,
        }
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    async fn settle_subscription(
        &self,
        notification: &PaymentNotification,
        user_id: UserId,
        plan: Plan,
    ) -> PaymentResult<Settlement> {
        if notification.status != PaymentStatus::Success {
            self.notifier
                .emit(
                    Notification::new(
                        user_id,
                        "Subscription Payment Failed",
                        format!(
                            "Your {} payment was {}. Your plan has not changed.",
                            plan.display_name(),
                            notification.status
                        ),
                    )
                    .with_link("/subscription")
                    .by_email(),
                )
                .await;
            return Ok(Settlement::NotifiedFailure);
        }

        if notification.amount < plan.price() {
            tracing::warn!(
                reference = %notification.reference,
                paid = %notification.amount,
                price = %plan.price(),
                "Subscription payment below plan price"
            );
            return Ok(Settlement::Ignored);
        }

        let now = Utc::now();
        let renewal = Renewal::settle(user_id, plan, now, notification.reference.clone())?;
        let entry = LedgerEntry::completed(
            user_id,
            TransactionKind::Subscription,
            notification.provider,
            notification.reference.clone(),
            notification.transaction_id.clone(),
            notification.amount,
            now,
        );

        match self.repo.record_subscription_payment(&entry, &renewal).await? {
            LedgerWrite::Duplicate => {
                tracing::info!(
                    reference = %notification.reference,
                    "Subscription payment already settled"
                );
                Ok(Settlement::Duplicate)
            }
            LedgerWrite::Applied => {
                tracing::info!(
                    user_id = %user_id,
                    plan = %plan,
                    period_end = %renewal.period_end,
                    "Subscription activated"
                );
                self.notifier
                    .emit(
                        Notification::new(
                            user_id,
                            "Subscription Activated",
                            format!(
                                "Your {} plan is active until {}.",
                                plan.display_name(),
                                renewal.period_end.format("%-d %B %Y")
                            ),
                        )
                        .with_link("/subscription")
                        .by_email(),
                    )
                    .await;
                Ok(Settlement::Applied)
            }
        }
    }

    // ========================================================================
    // Escrow
    // ========================================================================

    async fn settle_escrow(
        &self,
        notification: &PaymentNotification,
        order_id: OrderId,
        milestone_id: Option<MilestoneId>,
    ) -> PaymentResult<Settlement> {
        let Some(order) = self.repo.find_order(order_id).await? else {
            tracing::warn!(
                order_id = %order_id,
                reference = %notification.reference,
                "Payment for unknown order"
            );
            return Ok(Settlement::Ignored);
        };

        if notification.status != PaymentStatus::Success {
            self.notifier
                .emit(
                    Notification::new(
                        order.buyer_id,
                        "Payment Failed",
                        format!(
                            "Your payment for \"{}\" was {}. You can try again from the order page.",
                            order.title, notification.status
                        ),
                    )
                    .with_link(order_link(&order))
                    .by_email(),
                )
                .await;
            return Ok(Settlement::NotifiedFailure);
        }

        let expected = match milestone_id {
            None => order.amount,
            Some(milestone_id) => match self.repo.find_milestone(milestone_id).await? {
                Some(milestone) if milestone.order_id == order.id => milestone.amount,
                _ => {
                    tracing::warn!(
                        order_id = %order.id,
                        milestone_id = %milestone_id,
                        "Payment for unknown milestone"
                    );
                    return Ok(Settlement::Ignored);
                }
            },
        };
        if notification.amount < expected {
            tracing::warn!(
                order_id = %order.id,
                paid = %notification.amount,
                expected = %expected,
                "Escrow payment below the amount due"
            );
            return Ok(Settlement::Ignored);
        }

        let now = Utc::now();
        let entry = LedgerEntry::completed(
            order.buyer_id,
            TransactionKind::EscrowFund,
            notification.provider,
            notification.reference.clone(),
            notification.transaction_id.clone(),
            notification.amount,
            now,
        )
        .for_order(order.id, milestone_id);

        let order_started = match self
            .repo
            .record_escrow_funding(&entry, order.id, milestone_id)
            .await?
        {
            EscrowWrite::Duplicate => {
                tracing::info!(
                    reference = %notification.reference,
                    "Escrow payment already settled"
                );
                return Ok(Settlement::Duplicate);
            }
            EscrowWrite::Applied { order_started } => order_started,
        };

        if !order_started && milestone_id.is_none() {
            tracing::warn!(
                order_id = %order.id,
                status = %order.status,
                "Escrow funded for an order that was not awaiting payment"
            );
        } else {
            tracing::info!(order_id = %order.id, order_started, "Escrow funded");
        }

        self.notifier
            .emit(
                Notification::new(
                    order.buyer_id,
                    "Payment Successful",
                    format!(
                        "Your payment of {} for \"{}\" is held in escrow.",
                        notification.amount, order.title
                    ),
                )
                .with_link(order_link(&order))
                .by_email(),
            )
            .await;

        if order_started {
            self.notifier
                .emit(
                    Notification::new(
                        order.seller_id,
                        "New Order Started",
                        format!("\"{}\" has been paid and you can start working.", order.title),
                    )
                    .with_link(order_link(&order))
                    .by_email(),
                )
                .await;
        } else if milestone_id.is_some() {
            self.notifier
                .emit(
                    Notification::new(
                        order.seller_id,
                        "Milestone Funded",
                        format!(
                            "A milestone of {} on \"{}\" is now held in escrow.",
                            notification.amount, order.title
                        ),
                    )
                    .with_link(order_link(&order)),
                )
                .await;
        }

        Ok(Settlement::Applied)
    }
}

fn order_link(order: &Order) -> String {
    format!("/orders/{}", order.id)
}
