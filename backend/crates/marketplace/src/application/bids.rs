//! Bidding Use Cases
//!
//! Freelancers bid on open projects within their plan's bid quota. The
//! client accepts one bid, which closes bidding and opens an order that
//! waits for escrow funding.

use std::sync::Arc;

use auth::Identity;
use chrono::Utc;
use kernel::id::{BidId, ProjectId};
use kernel::pagination::{Page, PageRequest};

use crate::application::config::MarketplaceConfig;
use crate::application::notifications::NotificationEmitter;
use crate::domain::entity::{Bid, BidStatus, Notification, Order, OrderOrigin};
use crate::domain::repository::{
    BidRepository, NotificationRepository, ProjectRepository, SubscriptionRepository,
};
use crate::domain::value_object::Cents;
use crate::error::{MarketplaceError, MarketplaceResult};

pub struct PlaceBidInput {
    pub project_id: ProjectId,
    pub amount: Cents,
    pub delivery_days: i32,
    pub proposal: String,
}

pub struct BidUseCase<R>
where
    R: BidRepository + ProjectRepository + SubscriptionRepository + NotificationRepository,
{
    repo: Arc<R>,
    config: Arc<MarketplaceConfig>,
    notifier: NotificationEmitter<R>,
}

impl<R> BidUseCase<R>
where
    R: BidRepository + ProjectRepository + SubscriptionRepository + NotificationRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<MarketplaceConfig>) -> Self {
        Self {
            notifier: NotificationEmitter::new(repo.clone()),
            repo,
            config,
        }
    }

    pub async fn place(&self, identity: &Identity, input: PlaceBidInput) -> MarketplaceResult<Bid> {
        let project = self
            .repo
            .find_project(input.project_id)
            .await?
            .ok_or(MarketplaceError::NotFound("Project"))?;

        let bid = Bid::place(
            &project,
            identity.user_id,
            input.amount,
            input.delivery_days,
            &input.proposal,
        )?;

        let subscription = self.repo.find_subscription(identity.user_id).await?;
        let limit = self.config.limits_at(subscription.as_ref(), Utc::now()).bids;
        if !self.repo.insert_bid_within_quota(&bid, limit).await? {
            return Err(MarketplaceError::LimitReached {
                what: "bids",
                limit: limit.unwrap_or_default(),
            });
        }

        tracing::info!(bid_id = %bid.id, project_id = %project.id, "Bid placed");
        self.notifier
            .emit(
                Notification::new(
                    project.client_id,
                    "New Bid",
                    format!("{} bid {} on \"{}\"", identity.user_name, bid.amount, project.title),
                )
                .with_link(format!("/projects/{}", project.id)),
            )
            .await;

        Ok(bid)
    }

    pub async fn withdraw(&self, identity: &Identity, id: BidId) -> MarketplaceResult<Bid> {
        let mut bid = self.find(id).await?;
        if !identity.is(bid.freelancer_id) {
            return Err(MarketplaceError::forbidden("You did not place this bid"));
        }
        bid.withdraw()?;
        self.repo.update_bid(&bid).await?;
        Ok(bid)
    }

    /// The project owner and moderators see every bid, anyone else only
    /// their own.
    pub async fn list_for_project(
        &self,
        identity: &Identity,
        project_id: ProjectId,
    ) -> MarketplaceResult<Vec<Bid>> {
        let project = self
            .repo
            .find_project(project_id)
            .await?
            .ok_or(MarketplaceError::NotFound("Project"))?;

        let bids = self.repo.list_bids_for_project(project_id).await?;
        if identity.is(project.client_id) || identity.is_moderator_or_admin() {
            return Ok(bids);
        }
        Ok(bids
            .into_iter()
            .filter(|b| identity.is(b.freelancer_id))
            .collect())
    }

    pub async fn mine(&self, identity: &Identity, page: PageRequest) -> MarketplaceResult<Page<Bid>> {
        self.repo.list_bids_by_freelancer(identity.user_id, page).await
    }

    pub async fn accept(&self, identity: &Identity, id: BidId) -> MarketplaceResult<Order> {
        let bid = self.find(id).await?;
        let project = self
            .repo
            .find_project(bid.project_id)
            .await?
            .ok_or(MarketplaceError::NotFound("Project"))?;

        if !identity.is(project.client_id) {
            return Err(MarketplaceError::forbidden("Only the project owner can accept bids"));
        }
        if bid.status != BidStatus::Pending {
            return Err(MarketplaceError::conflict(format!("Bid is {}", bid.status)));
        }
        if !project.is_open() {
            return Err(MarketplaceError::conflict("Project is no longer open"));
        }

        let order = Order::new(
            project.client_id,
            bid.freelancer_id,
            OrderOrigin::Bid {
                project_id: project.id,
                bid_id: bid.id,
            },
            project.title.clone(),
            Some(project.description.clone()),
            bid.amount,
        );

        if !self.repo.award_bid(&project, &bid, &order).await? {
            return Err(MarketplaceError::conflict("Project is no longer open"));
        }

        tracing::info!(
            bid_id = %bid.id,
            project_id = %project.id,
            order_id = %order.id,
            "Bid accepted"
        );
        self.notifier
            .emit(
                Notification::new(
                    bid.freelancer_id,
                    "Bid Accepted",
                    format!(
                        "Your bid on \"{}\" was accepted. Work starts once the client funds escrow.",
                        project.title
                    ),
                )
                .with_link(format!("/orders/{}", order.id))
                .by_email(),
            )
            .await;

        Ok(order)
    }

    async fn find(&self, id: BidId) -> MarketplaceResult<Bid> {
        self.repo
            .find_bid(id)
            .await?
            .ok_or(MarketplaceError::NotFound("Bid"))
    }
}
