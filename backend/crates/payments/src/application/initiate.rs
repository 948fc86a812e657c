//! Payment Initiation
//!
//! Builds the [`Checkout`] for an order (or one of its milestones) or a
//! plan upgrade. The presentation layer hands it to a gateway adapter.

use std::sync::Arc;

use auth::Identity;
use kernel::id::{MilestoneId, OrderId};
use marketplace::models::{OrderStatus, Plan};
use marketplace::store::OrderRepository;

use crate::domain::PaymentStore;
use crate::domain::gateway::{BuyerContact, Checkout};
use crate::domain::notification::PaymentKind;
use crate::domain::reference::{order_reference, subscription_reference};
use crate::error::{PaymentError, PaymentResult};

/// Gateways cap the item name at 100 characters
const ITEM_NAME_MAX: usize = 100;

impl From<&Identity> for BuyerContact {
    fn from(identity: &Identity) -> Self {
        Self {
            email: identity.email.clone(),
            name: identity.user_name.clone(),
        }
    }
}

pub struct InitiatePaymentUseCase<R>
where
    R: PaymentStore,
{
    repo: Arc<R>,
}

impl<R> InitiatePaymentUseCase<R>
where
    R: PaymentStore,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Escrow for a whole order awaiting payment, or for a pending
    /// milestone of an order that is awaiting payment or in progress.
    pub async fn order_checkout(
        &self,
        identity: &Identity,
        order_id: OrderId,
        milestone_id: Option<MilestoneId>,
    ) -> PaymentResult<Checkout> {
        let order = self
            .repo
            .find_order(order_id)
            .await?
            .ok_or(PaymentError::NotFound("Order"))?;

        if order.buyer_id != identity.user_id {
            if order.is_party(identity.user_id) {
                return Err(PaymentError::Forbidden("Only the buyer can pay for an order".into()));
            }
            return Err(PaymentError::NotFound("Order"));
        }

        let (amount, item_name) = match milestone_id {
            None => {
                if order.status != OrderStatus::AwaitingPayment {
                    return Err(PaymentError::Conflict("Order is not awaiting payment".into()));
                }
                (order.amount, order.title.clone())
            }
            Some(milestone_id) => {
                let milestone = self
                    .repo
                    .find_milestone(milestone_id)
                    .await?
                    .filter(|m| m.order_id == order.id)
                    .ok_or(PaymentError::NotFound("Milestone"))?;
                if milestone.is_funded() {
                    return Err(PaymentError::Conflict("Milestone is already funded".into()));
                }
                if !matches!(
                    order.status,
                    OrderStatus::AwaitingPayment | OrderStatus::InProgress
                ) {
                    return Err(PaymentError::Conflict(format!(
                        "Milestones cannot be funded on a {} order",
                        order.status
                    )));
                }
                (milestone.amount, format!("{}: {}", order.title, milestone.title))
            }
        };

        Ok(Checkout {
            reference: order_reference(order.id),
            amount,
            item_name: truncate(&item_name),
            kind: PaymentKind::EscrowFunding {
                order_id: order.id,
                milestone_id,
            },
        })
    }

    pub fn subscription_checkout(&self, identity: &Identity, plan: Plan) -> PaymentResult<Checkout> {
        if !plan.is_paid() {
            return Err(PaymentError::validation("The free plan cannot be purchased"));
        }
        Ok(Checkout {
            reference: subscription_reference(),
            amount: plan.price(),
            item_name: format!("Zomieks {} plan", plan.display_name()),
            kind: PaymentKind::Subscription {
                user_id: identity.user_id,
                plan,
            },
        })
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(ITEM_NAME_MAX).collect()
}
