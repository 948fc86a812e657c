use std::sync::Arc;

use auth::Identity;
use kernel::id::ServiceId;

use crate::domain::entity::{Service, ServiceStatus};
use crate::domain::repository::{ServiceRepository, ShortlistRepository};
use crate::error::{MarketplaceError, MarketplaceResult};

/// Saved services of a buyer.
pub struct ShortlistUseCase<R>
where
    R: ShortlistRepository + ServiceRepository,
{
    repo: Arc<R>,
}

impl<R> ShortlistUseCase<R>
where
    R: ShortlistRepository + ServiceRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn add(&self, identity: &Identity, service_id: ServiceId) -> MarketplaceResult<()> {
        let exists = self
            .repo
            .find_service(service_id)
            .await?
            .is_some_and(|s| s.status != ServiceStatus::Removed);
        if !exists {
            return Err(MarketplaceError::NotFound("Service"));
        }
        self.repo.add_to_shortlist(identity.user_id, service_id).await
    }

    /// Removing something that is not shortlisted is not an error.
    pub async fn remove(&self, identity: &Identity, service_id: ServiceId) -> MarketplaceResult<()> {
        self.repo
            .remove_from_shortlist(identity.user_id, service_id)
            .await?;
        Ok(())
    }

    pub async fn list(&self, identity: &Identity) -> MarketplaceResult<Vec<Service>> {
        self.repo.list_shortlist(identity.user_id).await
    }
}
