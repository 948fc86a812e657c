use std::sync::Arc;

use auth::Identity;
use kernel::id::OutsourcingRequestId;
use kernel::pagination::{Page, PageRequest};

use crate::application::notifications::NotificationEmitter;
use crate::domain::entity::{Notification, OutsourcingRequest, OutsourcingStatus};
use crate::domain::repository::{NotificationRepository, OutsourcingRepository};
use crate::domain::value_object::Cents;
use crate::error::{MarketplaceError, MarketplaceResult};

pub struct OutsourcingUseCase<R>
where
    R: OutsourcingRepository + NotificationRepository,
{
    repo: Arc<R>,
    notifier: NotificationEmitter<R>,
}

impl<R> OutsourcingUseCase<R>
where
    R: OutsourcingRepository + NotificationRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            notifier: NotificationEmitter::new(repo.clone()),
            repo,
        }
    }

    pub async fn submit(
        &self,
        identity: &Identity,
        title: &str,
        description: &str,
        budget: Cents,
    ) -> MarketplaceResult<OutsourcingRequest> {
        let request = OutsourcingRequest::submit(identity.user_id, title, description, budget)?;
        self.repo.create_outsourcing_request(&request).await?;

        tracing::info!(request_id = %request.id, "Outsourcing request submitted");
        Ok(request)
    }

    pub async fn mine(
        &self,
        identity: &Identity,
        page: PageRequest,
    ) -> MarketplaceResult<Page<OutsourcingRequest>> {
        self.repo
            .list_outsourcing_requests(Some(identity.user_id), None, page)
            .await
    }

    /// Moderator queue
    pub async fn list(
        &self,
        identity: &Identity,
        status: Option<OutsourcingStatus>,
        page: PageRequest,
    ) -> MarketplaceResult<Page<OutsourcingRequest>> {
        require_moderator(identity)?;
        self.repo.list_outsourcing_requests(None, status, page).await
    }

    pub async fn review(
        &self,
        identity: &Identity,
        id: OutsourcingRequestId,
        status: OutsourcingStatus,
        notes: Option<String>,
    ) -> MarketplaceResult<OutsourcingRequest> {
        require_moderator(identity)?;
        let mut request = self
            .repo
            .find_outsourcing_request(id)
            .await?
            .ok_or(MarketplaceError::NotFound("Outsourcing request"))?;
        request.review(status, notes)?;
        self.repo.update_outsourcing_request(&request).await?;

        tracing::info!(request_id = %id, status = %status, reviewer = %identity.user_id, "Outsourcing request reviewed");
        self.notifier
            .emit(
                Notification::new(
                    request.requester_id,
                    "Outsourcing Request Updated",
                    format!("Your request \"{}\" is now {}", request.title, status),
                )
                .with_link("/outsourcing")
                .by_email(),
            )
            .await;

        Ok(request)
    }
}

fn require_moderator(identity: &Identity) -> MarketplaceResult<()> {
    if identity.is_moderator_or_admin() {
        Ok(())
    } else {
        Err(MarketplaceError::forbidden("Moderator access required"))
    }
}
