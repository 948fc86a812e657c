//! Service Listing Use Cases
//!
//! Sellers need a verified identity to list, and every new listing counts
//! against the plan's service quota until it is removed.

use std::sync::Arc;

use auth::Identity;
use chrono::Utc;
use kernel::id::ServiceId;
use kernel::pagination::{Page, PageRequest};

use crate::application::config::MarketplaceConfig;
use crate::domain::entity::{Service, ServiceDraft, ServiceStatus};
use crate::domain::repository::{
    CategoryRepository, ServiceQuery, ServiceRepository, SubscriptionRepository,
};
use crate::error::{MarketplaceError, MarketplaceResult};

pub struct ServiceUseCase<R>
where
    R: ServiceRepository + CategoryRepository + SubscriptionRepository,
{
    repo: Arc<R>,
    config: Arc<MarketplaceConfig>,
}

impl<R> ServiceUseCase<R>
where
    R: ServiceRepository + CategoryRepository + SubscriptionRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<MarketplaceConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn create(&self, identity: &Identity, draft: ServiceDraft) -> MarketplaceResult<Service> {
        if !identity.identity_verified {
            return Err(MarketplaceError::VerificationRequired);
        }
        self.ensure_category(&draft).await?;

        let subscription = self.repo.find_subscription(identity.user_id).await?;
        let limit = self
            .config
            .limits_at(subscription.as_ref(), Utc::now())
            .services;

        let service = Service::new(identity.user_id, draft);
        if !self.repo.insert_service_within_quota(&service, limit).await? {
            return Err(MarketplaceError::LimitReached {
                what: "active services",
                limit: limit.unwrap_or_default(),
            });
        }

        tracing::info!(service_id = %service.id, seller_id = %identity.user_id, "Service listed");
        Ok(service)
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: ServiceId,
        draft: ServiceDraft,
    ) -> MarketplaceResult<Service> {
        let mut service = self.owned(identity, id).await?;
        if service.status == ServiceStatus::Removed {
            return Err(MarketplaceError::conflict("Service has been removed"));
        }
        self.ensure_category(&draft).await?;
        service.apply(draft);
        self.repo.update_service(&service).await?;
        Ok(service)
    }

    pub async fn set_paused(
        &self,
        identity: &Identity,
        id: ServiceId,
        paused: bool,
    ) -> MarketplaceResult<Service> {
        let mut service = self.owned(identity, id).await?;
        service.set_paused(paused)?;
        self.repo.update_service(&service).await?;

        tracing::debug!(service_id = %id, paused, "Service visibility changed");
        Ok(service)
    }

    /// Soft delete by the owner
    pub async fn delete(&self, identity: &Identity, id: ServiceId) -> MarketplaceResult<()> {
        let mut service = self.owned(identity, id).await?;
        service.remove(None)?;
        self.repo.retire_service(&service).await?;

        tracing::info!(service_id = %id, "Service removed by seller");
        Ok(())
    }

    /// Removed listings are gone for everyone. Paused ones are visible to
    /// the owner and moderators only.
    pub async fn get(&self, viewer: Option<&Identity>, id: ServiceId) -> MarketplaceResult<Service> {
        let service = self
            .repo
            .find_service(id)
            .await?
            .filter(|s| s.status != ServiceStatus::Removed)
            .ok_or(MarketplaceError::NotFound("Service"))?;

        let privileged =
            viewer.is_some_and(|v| v.is(service.seller_id) || v.is_moderator_or_admin());
        if service.status == ServiceStatus::Paused && !privileged {
            return Err(MarketplaceError::NotFound("Service"));
        }
        Ok(service)
    }

    pub async fn list(
        &self,
        mut query: ServiceQuery,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Service>> {
        query.include_paused = false;
        query.search = query
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self.repo.list_services(&query, page).await
    }

    pub async fn mine(&self, identity: &Identity, page: PageRequest) -> MarketplaceResult<Page<Service>> {
        let query = ServiceQuery {
            seller_id: Some(identity.user_id),
            include_paused: true,
            ..Default::default()
        };
        self.repo.list_services(&query, page).await
    }

    async fn owned(&self, identity: &Identity, id: ServiceId) -> MarketplaceResult<Service> {
        let service = self
            .repo
            .find_service(id)
            .await?
            .ok_or(MarketplaceError::NotFound("Service"))?;
        if !identity.is(service.seller_id) {
            return Err(MarketplaceError::forbidden("You do not own this service"));
        }
        Ok(service)
    }

    async fn ensure_category(&self, draft: &ServiceDraft) -> MarketplaceResult<()> {
        if self.repo.find_category(draft.category_id).await?.is_none() {
            return Err(MarketplaceError::validation("Unknown category"));
        }
        Ok(())
    }
}
