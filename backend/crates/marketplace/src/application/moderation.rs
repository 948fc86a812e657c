//! Marketplace Moderation
//!
//! Listing takedowns and dispute resolution for moderators, platform
//! statistics for admins.

use std::sync::Arc;

use auth::Identity;
use kernel::id::{OrderId, ServiceId};

use crate::application::notifications::NotificationEmitter;
use crate::domain::entity::{DisputeOutcome, Notification, Order, Service};
use crate::domain::repository::{
    NotificationRepository, OrderRepository, PlatformStats, ServiceRepository, StatsRepository,
};
use crate::domain::value_object::bounded_text;
use crate::error::{MarketplaceError, MarketplaceResult};

pub struct MarketplaceModerationUseCase<R>
where
    R: ServiceRepository + OrderRepository + NotificationRepository + StatsRepository,
{
    repo: Arc<R>,
    notifier: NotificationEmitter<R>,
}

impl<R> MarketplaceModerationUseCase<R>
where
    R: ServiceRepository + OrderRepository + NotificationRepository + StatsRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            notifier: NotificationEmitter::new(repo.clone()),
            repo,
        }
    }

    pub async fn remove_service(
        &self,
        identity: &Identity,
        id: ServiceId,
        reason: &str,
    ) -> MarketplaceResult<Service> {
        require_moderator(identity)?;
        let reason = bounded_text("Reason", reason, 1, 500)?;
        let mut service = self
            .repo
            .find_service(id)
            .await?
            .ok_or(MarketplaceError::NotFound("Service"))?;
        service.remove(Some(reason.clone()))?;
        self.repo.retire_service(&service).await?;

        tracing::warn!(service_id = %id, moderator = %identity.user_id, reason = %reason, "Service removed by moderator");
        self.notifier
            .emit(
                Notification::new(
                    service.seller_id,
                    "Service Removed",
                    format!("\"{}\" was removed by a moderator. Reason: {reason}", service.title),
                )
                .by_email(),
            )
            .await;

        Ok(service)
    }

    pub async fn resolve_dispute(
        &self,
        identity: &Identity,
        id: OrderId,
        outcome: DisputeOutcome,
        note: Option<String>,
    ) -> MarketplaceResult<Order> {
        require_moderator(identity)?;
        let mut order = self
            .repo
            .find_order(id)
            .await?
            .ok_or(MarketplaceError::NotFound("Order"))?;

        let expected = order.status;
        order.resolve(outcome)?;
        if !self.repo.save_order(&order, expected).await? {
            return Err(MarketplaceError::conflict(
                "Order was changed by someone else, reload and try again",
            ));
        }

        tracing::info!(order_id = %id, outcome = ?outcome, moderator = %identity.user_id, "Dispute resolved");

        let verdict = match outcome {
            DisputeOutcome::Complete => "completed",
            DisputeOutcome::Cancel => "cancelled",
        };
        let note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .map(|n| format!(" Note: {n}"))
            .unwrap_or_default();
        for user_id in [order.buyer_id, order.seller_id] {
            self.notifier
                .emit(
                    Notification::new(
                        user_id,
                        "Dispute Resolved",
                        format!("The dispute on \"{}\" was resolved: order {verdict}.{note}", order.title),
                    )
                    .with_link(format!("/orders/{}", order.id))
                    .by_email(),
                )
                .await;
        }

        Ok(order)
    }

    pub async fn platform_stats(&self, identity: &Identity) -> MarketplaceResult<PlatformStats> {
        if !identity.is_admin() {
            return Err(MarketplaceError::forbidden("Admin access required"));
        }
        self.repo.platform_stats().await
    }
}

fn require_moderator(identity: &Identity) -> MarketplaceResult<()> {
    if identity.is_moderator_or_admin() {
        Ok(())
    } else {
        Err(MarketplaceError::forbidden("Moderator access required"))
    }
}
