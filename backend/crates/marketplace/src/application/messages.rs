use std::sync::Arc;

use auth::Identity;
use kernel::id::{OrderId, UserId};
use kernel::pagination::{Page, PageRequest};

use crate::application::notifications::NotificationEmitter;
use crate::domain::entity::{Conversation, Message, Notification};
use crate::domain::repository::{MessageRepository, NotificationRepository, OrderRepository};
use crate::error::{MarketplaceError, MarketplaceResult};

/// Direct messages between users, optionally tied to an order.
pub struct MessageUseCase<R>
where
    R: MessageRepository + OrderRepository + NotificationRepository,
{
    repo: Arc<R>,
    notifier: NotificationEmitter<R>,
}

impl<R> MessageUseCase<R>
where
    R: MessageRepository + OrderRepository + NotificationRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            notifier: NotificationEmitter::new(repo.clone()),
            repo,
        }
    }

    pub async fn send(
        &self,
        identity: &Identity,
        recipient_id: UserId,
        body: &str,
        order_id: Option<OrderId>,
    ) -> MarketplaceResult<Message> {
        let message = Message::new(identity.user_id, recipient_id, order_id, body)?;

        if !self.repo.user_exists(recipient_id).await? {
            return Err(MarketplaceError::NotFound("Recipient"));
        }
        // Order threads are only for the two parties of that order
        if let Some(order_id) = order_id {
            let order = self
                .repo
                .find_order(order_id)
                .await?
                .ok_or(MarketplaceError::NotFound("Order"))?;
            if order.counterpart(identity.user_id) != Some(recipient_id) {
                return Err(MarketplaceError::forbidden(
                    "Order messages can only be sent between the buyer and the seller",
                ));
            }
        }

        self.repo.insert_message(&message).await?;
        self.notifier
            .emit(
                Notification::new(
                    recipient_id,
                    "New Message",
                    format!("{} sent you a message", identity.user_name),
                )
                .with_link(format!("/messages/{}", identity.user_id)),
            )
            .await;

        Ok(message)
    }

    /// Opening a conversation marks the inbound side as read.
    pub async fn conversation(
        &self,
        identity: &Identity,
        other_id: UserId,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Message>> {
        let messages = self
            .repo
            .conversation(identity.user_id, other_id, page)
            .await?;
        let read = self
            .repo
            .mark_conversation_read(identity.user_id, other_id)
            .await?;
        if read > 0 {
            tracing::debug!(user_id = %identity.user_id, other_id = %other_id, read, "Messages read");
        }
        Ok(messages)
    }

    pub async fn inbox(&self, identity: &Identity) -> MarketplaceResult<Vec<Conversation>> {
        self.repo.inbox(identity.user_id).await
    }
}
