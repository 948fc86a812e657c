//! Order Use Cases
//!
//! Every status change is written with a compare-and-set on the previous
//! status, so two racing requests cannot both succeed.

use std::sync::Arc;

use auth::Identity;
use kernel::id::{OrderId, ServiceId};
use kernel::pagination::{Page, PageRequest};

use crate::application::notifications::NotificationEmitter;
use crate::domain::entity::{Milestone, Notification, Order, OrderOrigin};
use crate::domain::repository::{
    NotificationRepository, OrderRepository, OrderRole, ServiceRepository,
};
use crate::domain::value_object::{Cents, bounded_text};
use crate::error::{MarketplaceError, MarketplaceResult};

/// Which party may perform an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Party {
    Buyer,
    Seller,
    Either,
}

pub struct OrderUseCase<R>
where
    R: OrderRepository + ServiceRepository + NotificationRepository,
{
    repo: Arc<R>,
    notifier: NotificationEmitter<R>,
}

impl<R> OrderUseCase<R>
where
    R: OrderRepository + ServiceRepository + NotificationRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            notifier: NotificationEmitter::new(repo.clone()),
            repo,
        }
    }

    pub async fn order_service(
        &self,
        identity: &Identity,
        service_id: ServiceId,
        requirements: Option<String>,
    ) -> MarketplaceResult<Order> {
        let service = self
            .repo
            .find_service(service_id)
            .await?
            .ok_or(MarketplaceError::NotFound("Service"))?;
        if !service.is_orderable() {
            return Err(MarketplaceError::conflict("Service is not available for orders"));
        }
        if identity.is(service.seller_id) {
            return Err(MarketplaceError::forbidden("You cannot order your own service"));
        }

        let requirements = requirements
            .filter(|r| !r.trim().is_empty())
            .map(|r| bounded_text("Requirements", &r, 1, 5000))
            .transpose()?;

        let order = Order::new(
            identity.user_id,
            service.seller_id,
            OrderOrigin::Service(service.id),
            service.title.clone(),
            requirements,
            service.price,
        );
        self.repo.create_order(&order).await?;

        tracing::info!(order_id = %order.id, service_id = %service.id, "Order placed");
        Ok(order)
    }

    pub async fn get(&self, identity: &Identity, id: OrderId) -> MarketplaceResult<(Order, Vec<Milestone>)> {
        let order = self.find(id).await?;
        if !order.is_party(identity.user_id) && !identity.is_moderator_or_admin() {
            return Err(MarketplaceError::forbidden("You are not a party to this order"));
        }
        let milestones = self.repo.list_milestones(id).await?;
        Ok((order, milestones))
    }

    pub async fn list(
        &self,
        identity: &Identity,
        role: OrderRole,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Order>> {
        self.repo.list_orders(identity.user_id, role, page).await
    }

    pub async fn add_milestone(
        &self,
        identity: &Identity,
        id: OrderId,
        title: &str,
        amount: Cents,
    ) -> MarketplaceResult<Milestone> {
        let order = self.find(id).await?;
        authorize(identity, &order, Party::Buyer)?;

        let existing = self.repo.list_milestones(id).await?;
        let milestone = Milestone::plan(&order, &existing, title, amount)?;
        self.repo.add_milestone(&milestone).await?;

        tracing::debug!(order_id = %id, milestone_id = %milestone.id, "Milestone added");
        Ok(milestone)
    }

    pub async fn deliver(&self, identity: &Identity, id: OrderId, message: &str) -> MarketplaceResult<Order> {
        let order = self
            .transition(identity, id, Party::Seller, |o| o.deliver(message))
            .await?;
        self.notify(
            &order,
            order.buyer_id,
            "Order Delivered",
            format!("\"{}\" has been delivered. Review and complete the order.", order.title),
        )
        .await;
        Ok(order)
    }

    pub async fn request_revision(&self, identity: &Identity, id: OrderId) -> MarketplaceResult<Order> {
        let order = self
            .transition(identity, id, Party::Buyer, Order::request_revision)
            .await?;
        self.notify(
            &order,
            order.seller_id,
            "Revision Requested",
            format!("The buyer asked for changes to \"{}\".", order.title),
        )
        .await;
        Ok(order)
    }

    pub async fn complete(&self, identity: &Identity, id: OrderId) -> MarketplaceResult<Order> {
        let order = self
            .transition(identity, id, Party::Buyer, Order::complete)
            .await?;
        self.notify(
            &order,
            order.seller_id,
            "Order Completed",
            format!("\"{}\" was marked complete.", order.title),
        )
        .await;
        Ok(order)
    }

    pub async fn cancel(&self, identity: &Identity, id: OrderId) -> MarketplaceResult<Order> {
        let order = self
            .transition(identity, id, Party::Buyer, Order::cancel)
            .await?;
        self.notify(
            &order,
            order.seller_id,
            "Order Cancelled",
            format!("The buyer cancelled \"{}\" before payment.", order.title),
        )
        .await;
        Ok(order)
    }

    pub async fn dispute(&self, identity: &Identity, id: OrderId, reason: &str) -> MarketplaceResult<Order> {
        let order = self
            .transition(identity, id, Party::Either, |o| o.dispute(reason))
            .await?;
        if let Some(other) = order.counterpart(identity.user_id) {
            self.notify(
                &order,
                other,
                "Order Disputed",
                format!("A dispute was opened on \"{}\". A moderator will review it.", order.title),
            )
            .await;
        }
        tracing::warn!(order_id = %id, opened_by = %identity.user_id, "Order disputed");
        Ok(order)
    }

    async fn transition<F>(
        &self,
        identity: &Identity,
        id: OrderId,
        party: Party,
        change: F,
    ) -> MarketplaceResult<Order>
    where
        F: FnOnce(&mut Order) -> MarketplaceResult<()>,
    {
        let mut order = self.find(id).await?;
        authorize(identity, &order, party)?;

        let expected = order.status;
        change(&mut order)?;
        if !self.repo.save_order(&order, expected).await? {
            return Err(MarketplaceError::conflict(
                "Order was changed by someone else, reload and try again",
            ));
        }

        tracing::info!(order_id = %id, from = %expected, to = %order.status, "Order status changed");
        Ok(order)
    }

    async fn notify(&self, order: &Order, user_id: kernel::id::UserId, title: &str, body: String) {
        self.notifier
            .emit(Notification::new(user_id, title, body).with_link(format!("/orders/{}", order.id)))
            .await;
    }

    async fn find(&self, id: OrderId) -> MarketplaceResult<Order> {
        self.repo
            .find_order(id)
            .await?
            .ok_or(MarketplaceError::NotFound("Order"))
    }
}

fn authorize(identity: &Identity, order: &Order, party: Party) -> MarketplaceResult<()> {
    let allowed = match party {
        Party::Buyer => identity.is(order.buyer_id),
        Party::Seller => identity.is(order.seller_id),
        Party::Either => order.is_party(identity.user_id),
    };
    if allowed {
        return Ok(());
    }
    Err(MarketplaceError::forbidden(match party {
        Party::Buyer => "Only the buyer can do this",
        Party::Seller => "Only the seller can do this",
        Party::Either => "You are not a party to this order",
    }))
}
