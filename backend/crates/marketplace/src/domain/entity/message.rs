use chrono::{DateTime, Utc};
use kernel::id::{MessageId, OrderId, UserId};

use crate::domain::value_object::bounded_text;
use crate::error::{MarketplaceError, MarketplaceResult};

pub const MAX_MESSAGE_CHARS: usize = 5000;

#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub order_id: Option<OrderId>,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        sender_id: UserId,
        recipient_id: UserId,
        order_id: Option<OrderId>,
        body: &str,
    ) -> MarketplaceResult<Self> {
        if sender_id == recipient_id {
            return Err(MarketplaceError::validation("You cannot message yourself"));
        }
        Ok(Self {
            id: MessageId::new(),
            sender_id,
            recipient_id,
            order_id,
            body: bounded_text("Message", body, 1, MAX_MESSAGE_CHARS)?,
            is_read: false,
            created_at: Utc::now(),
        })
    }

    /// The other participant from `user_id`'s point of view.
    pub fn counterpart(&self, user_id: UserId) -> UserId {
        if self.sender_id == user_id {
            self.recipient_id
        } else {
            self.sender_id
        }
    }
}

/// One row of the inbox: the latest message exchanged with a counterpart.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub counterpart_id: UserId,
    pub last_message: Message,
    pub unread_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_self_and_empty() {
        let me = UserId::new();
        assert!(Message::new(me, me, None, "hi").is_err());
        assert!(Message::new(me, UserId::new(), None, "   ").is_err());
        assert!(Message::new(me, UserId::new(), None, &"x".repeat(5001)).is_err());

        let msg = Message::new(me, UserId::new(), None, " Sawubona ").unwrap();
        assert_eq!(msg.body, "Sawubona");
        assert_eq!(msg.counterpart(me), msg.recipient_id);
    }
}
