//! Notifications
//!
//! [`NotificationEmitter`] is what other use cases call: a failed insert is
//! logged and swallowed so it never fails the action that triggered it.
//! [`NotificationUseCase`] serves the user's own notification feed.

use std::sync::Arc;

use auth::Identity;
use kernel::id::NotificationId;
use kernel::pagination::{Page, PageRequest};

use crate::domain::entity::Notification;
use crate::domain::repository::NotificationRepository;
use crate::error::{MarketplaceError, MarketplaceResult};

pub struct NotificationEmitter<N>
where
    N: NotificationRepository,
{
    repo: Arc<N>,
}

impl<N> Clone for NotificationEmitter<N>
where
    N: NotificationRepository,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<N> NotificationEmitter<N>
where
    N: NotificationRepository,
{
    pub fn new(repo: Arc<N>) -> Self {
        Self { repo }
    }

    pub async fn emit(&self, notification: Notification) {
        if let Err(e) = self.repo.insert_notification(&notification).await {
            tracing::warn!(
                user_id = %notification.user_id,
                title = %notification.title,
                error = %e,
                "Failed to store notification"
            );
        }
    }
}

pub struct NotificationUseCase<N>
where
    N: NotificationRepository,
{
    repo: Arc<N>,
}

impl<N> NotificationUseCase<N>
where
    N: NotificationRepository,
{
    pub fn new(repo: Arc<N>) -> Self {
        Self { repo }
    }

    pub async fn list(
        &self,
        identity: &Identity,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Notification>> {
        self.repo.list_notifications(identity.user_id, page).await
    }

    pub async fn unread_count(&self, identity: &Identity) -> MarketplaceResult<i64> {
        self.repo.count_unread_notifications(identity.user_id).await
    }

    pub async fn mark_read(&self, identity: &Identity, id: NotificationId) -> MarketplaceResult<()> {
        if !self.repo.mark_notification_read(identity.user_id, id).await? {
            return Err(MarketplaceError::NotFound("Notification"));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, identity: &Identity) -> MarketplaceResult<u64> {
        self.repo.mark_all_notifications_read(identity.user_id).await
    }
}
