use chrono::{DateTime, Utc};
use kernel::id::{NotificationId, UserId};

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub send_email: bool,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: UserId, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            title: title.into(),
            body: body.into(),
            link: None,
            send_email: false,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Flag the row for the mailer. Delivery itself happens elsewhere.
    pub fn by_email(mut self) -> Self {
        self.send_email = true;
        self
    }
}
