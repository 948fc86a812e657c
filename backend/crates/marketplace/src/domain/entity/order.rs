//! Order Entity
//!
//! Orders come from a service purchase or an accepted bid. Funds are held
//! in escrow by the payment gateway; the order only starts once the escrow
//! webhook confirms them.
//!
//! ```text
//! awaiting_payment -> in_progress -> delivered -> completed
//!        |                ^  |          |  |
//!        v                |  +----------+--+--> disputed -> completed | cancelled
//!    cancelled            +-- revision -+
//! ```

use chrono::{DateTime, Utc};
use derive_more::Display;
use kernel::id::{BidId, MilestoneId, OrderId, ProjectId, ServiceId, UserId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::value_object::{Cents, bounded_text};
use crate::error::{MarketplaceError, MarketplaceResult};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[display("awaiting_payment")]
    AwaitingPayment,
    #[display("in_progress")]
    InProgress,
    #[display("delivered")]
    Delivered,
    #[display("completed")]
    Completed,
    #[display("cancelled")]
    Cancelled,
    #[display("disputed")]
    Disputed,
}

impl OrderStatus {
    pub const fn code(&self) -> &'static str {
        match self {
            OrderStatus::AwaitingPayment => "awaiting_payment",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Disputed => "disputed",
        }
    }

    pub const fn is_closed(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (AwaitingPayment, InProgress)
                | (AwaitingPayment, Cancelled)
                | (InProgress, Delivered)
                | (InProgress, Disputed)
                | (Delivered, InProgress)
                | (Delivered, Completed)
                | (Delivered, Disputed)
                | (Disputed, Completed)
                | (Disputed, Cancelled)
        )
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "awaiting_payment" => Ok(OrderStatus::AwaitingPayment),
            "in_progress" => Ok(OrderStatus::InProgress),
            "delivered" => Ok(OrderStatus::Delivered),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "disputed" => Ok(OrderStatus::Disputed),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// Where an order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderOrigin {
    Service(ServiceId),
    Bid { project_id: ProjectId, bid_id: BidId },
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub origin: OrderOrigin,
    pub title: String,
    pub requirements: Option<String>,
    pub amount: Cents,
    pub status: OrderStatus,
    pub delivery_message: Option<String>,
    pub dispute_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        buyer_id: UserId,
        seller_id: UserId,
        origin: OrderOrigin,
        title: String,
        requirements: Option<String>,
        amount: Cents,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            buyer_id,
            seller_id,
            origin,
            title,
            requirements,
            amount,
            status: OrderStatus::AwaitingPayment,
            delivery_message: None,
            dispute_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_party(&self, user_id: UserId) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }

    /// The other party of the order, if `user_id` is one of them.
    pub fn counterpart(&self, user_id: UserId) -> Option<UserId> {
        if user_id == self.buyer_id {
            Some(self.seller_id)
        } else if user_id == self.seller_id {
            Some(self.buyer_id)
        } else {
            None
        }
    }

    fn transition(&mut self, next: OrderStatus) -> MarketplaceResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(MarketplaceError::conflict(format!(
                "Order cannot move from {} to {next}",
                self.status
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Escrow confirmed by the gateway.
    pub fn start(&mut self) -> MarketplaceResult<()> {
        if self.status != OrderStatus::AwaitingPayment {
            return Err(MarketplaceError::conflict("Order is not awaiting payment"));
        }
        self.transition(OrderStatus::InProgress)
    }

    pub fn deliver(&mut self, message: &str) -> MarketplaceResult<()> {
        let message = bounded_text("Delivery message", message, 1, 5000)?;
        if self.status != OrderStatus::InProgress {
            return Err(MarketplaceError::conflict("Only orders in progress can be delivered"));
        }
        self.transition(OrderStatus::Delivered)?;
        self.delivery_message = Some(message);
        Ok(())
    }

    pub fn request_revision(&mut self) -> MarketplaceResult<()> {
        if self.status != OrderStatus::Delivered {
            return Err(MarketplaceError::conflict(
                "Revisions can only be requested on delivered orders",
            ));
        }
        self.transition(OrderStatus::InProgress)
    }

    pub fn complete(&mut self) -> MarketplaceResult<()> {
        if self.status != OrderStatus::Delivered {
            return Err(MarketplaceError::conflict("Only delivered orders can be completed"));
        }
        self.transition(OrderStatus::Completed)
    }

    pub fn cancel(&mut self) -> MarketplaceResult<()> {
        if self.status != OrderStatus::AwaitingPayment {
            return Err(MarketplaceError::conflict(
                "Only orders awaiting payment can be cancelled",
            ));
        }
        self.transition(OrderStatus::Cancelled)
    }

    pub fn dispute(&mut self, reason: &str) -> MarketplaceResult<()> {
        let reason = bounded_text("Dispute reason", reason, 10, 2000)?;
        self.transition(OrderStatus::Disputed)?;
        self.dispute_reason = Some(reason);
        Ok(())
    }

    pub fn resolve(&mut self, outcome: DisputeOutcome) -> MarketplaceResult<()> {
        if self.status != OrderStatus::Disputed {
            return Err(MarketplaceError::conflict("Order is not under dispute"));
        }
        self.transition(match outcome {
            DisputeOutcome::Complete => OrderStatus::Completed,
            DisputeOutcome::Cancel => OrderStatus::Cancelled,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeOutcome {
    Complete,
    Cancel,
}

// ============================================================================
// Milestones
// ============================================================================

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    #[display("pending")]
    Pending,
    #[display("funded")]
    Funded,
}

impl MilestoneStatus {
    pub const fn code(&self) -> &'static str {
        match self {
            MilestoneStatus::Pending => "pending",
            MilestoneStatus::Funded => "funded",
        }
    }
}

impl FromStr for MilestoneStatus {
    type Err = String;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "pending" => Ok(MilestoneStatus::Pending),
            "funded" => Ok(MilestoneStatus::Funded),
            other => Err(format!("unknown milestone status: {other}")),
        }
    }
}

/// A separately funded slice of an order's amount.
#[derive(Debug, Clone)]
pub struct Milestone {
    pub id: MilestoneId,
    pub order_id: OrderId,
    pub title: String,
    pub amount: Cents,
    pub status: MilestoneStatus,
    pub funded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Milestone {
    /// Milestones may never add up to more than the order amount.
    pub fn plan(
        order: &Order,
        existing: &[Milestone],
        title: &str,
        amount: Cents,
    ) -> MarketplaceResult<Self> {
        if order.status.is_closed() || order.status == OrderStatus::Disputed {
            return Err(MarketplaceError::conflict(format!(
                "Milestones cannot be added to a {} order",
                order.status
            )));
        }
        if !amount.is_positive() {
            return Err(MarketplaceError::validation(
                "Milestone amount must be greater than zero",
            ));
        }
        let planned: Cents = existing.iter().map(|m| m.amount).sum();
        if planned + amount > order.amount {
            return Err(MarketplaceError::validation(format!(
                "Milestones would total {} but the order is {}",
                planned + amount,
                order.amount
            )));
        }

        Ok(Self {
            id: MilestoneId::new(),
            order_id: order.id,
            title: bounded_text("Milestone title", title, 3, 120)?,
            amount,
            status: MilestoneStatus::Pending,
            funded_at: None,
            created_at: Utc::now(),
        })
    }

    pub fn is_funded(&self) -> bool {
        self.status == MilestoneStatus::Funded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order::new(
            UserId::new(),
            UserId::new(),
            OrderOrigin::Service(ServiceId::new()),
            "Logo design".into(),
            None,
            Cents(100_000),
        )
    }

    #[test]
    fn happy_path() {
        let mut order = order();
        assert!(order.deliver("done").is_err());
        order.start().unwrap();
        order.deliver("Files attached").unwrap();
        order.request_revision().unwrap();
        assert_eq!(order.status, OrderStatus::InProgress);
        order.deliver("Second round").unwrap();
        order.complete().unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.delivery_message.as_deref(), Some("Second round"));
    }

    #[test]
    fn cancel_only_before_payment() {
        let mut order = order();
        order.cancel().unwrap();
        assert!(order.start().is_err());

        let mut order = self::order();
        order.start().unwrap();
        assert!(matches!(order.cancel(), Err(MarketplaceError::Conflict(_))));
    }

    #[test]
    fn disputes_resolve_either_way() {
        let mut order = order();
        assert!(order.dispute("Seller stopped responding").is_err());
        order.start().unwrap();
        order.dispute("Seller stopped responding").unwrap();
        assert!(order.complete().is_err());
        order.resolve(DisputeOutcome::Cancel).unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(order.resolve(DisputeOutcome::Complete).is_err());
    }

    #[test]
    fn milestones_cannot_exceed_order_amount() {
        let order = order();
        let first = Milestone::plan(&order, &[], "Wireframes", Cents(60_000)).unwrap();
        let second = Milestone::plan(&order, &[first.clone()], "Build", Cents(40_000)).unwrap();
        let err = Milestone::plan(&order, &[first, second], "Extra", Cents(1)).unwrap_err();
        assert!(matches!(err, MarketplaceError::Validation(_)));
    }

    #[test]
    fn counterpart() {
        let order = order();
        assert_eq!(order.counterpart(order.buyer_id), Some(order.seller_id));
        assert_eq!(order.counterpart(UserId::new()), None);
    }
}
