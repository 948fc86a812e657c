use chrono::{DateTime, Utc};
use kernel::id::{MessageId, NotificationId, OrderId, OutsourcingRequestId, UserId};
use kernel::pagination::{Page, PageRequest};
use uuid::Uuid;

use super::{PgMarketplaceRepository, decode};
use crate::domain::entity::{
    Conversation, Message, Notification, OutsourcingRequest, OutsourcingStatus,
};
use crate::domain::repository::{
    MessageRepository, NotificationRepository, OutsourcingRepository,
};
use crate::domain::value_object::Cents;
use crate::error::MarketplaceResult;

const MESSAGE_COLUMNS: &str = "id, sender_id, recipient_id, order_id, body, is_read, created_at";

const NOTIFICATION_COLUMNS: &str = "id, user_id, title, body, link, send_email, is_read, created_at";

const OUTSOURCING_COLUMNS: &str = r#"
    id,
    requester_id,
    title,
    description,
    budget_cents,
    status,
    reviewer_notes,
    created_at,
    updated_at
"#;

// ============================================================================
// Messages
// ============================================================================

impl MessageRepository for PgMarketplaceRepository {
    async fn user_exists(&self, user_id: UserId) -> MarketplaceResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND NOT is_suspended)",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_message(&self, message: &Message) -> MarketplaceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, sender_id, recipient_id, order_id, body, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(message.sender_id.as_uuid())
        .bind(message.recipient_id.as_uuid())
        .bind(message.order_id.map(Uuid::from))
        .bind(&message.body)
        .bind(message.is_read)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn conversation(
        &self,
        user_id: UserId,
        other_id: UserId,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Message>> {
        const FILTER: &str = r#"
            (sender_id = $1 AND recipient_id = $2) OR (sender_id = $2 AND recipient_id = $1)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM messages WHERE {FILTER}"))
            .bind(user_id.as_uuid())
            .bind(other_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE {FILTER} ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(user_id.as_uuid())
            .bind(other_id.as_uuid())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let items = rows.into_iter().map(MessageRow::into_entity).collect();
        Ok(Page::new(items, total, page))
    }

    async fn mark_conversation_read(&self, user_id: UserId, other_id: UserId) -> MarketplaceResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_read = TRUE
            WHERE recipient_id = $1 AND sender_id = $2 AND NOT is_read
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(other_id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn inbox(&self, user_id: UserId) -> MarketplaceResult<Vec<Conversation>> {
        let rows = sqlx::query_as::<_, InboxRow>(
            r#"
            WITH thread AS (
                SELECT m.*,
                       CASE WHEN m.sender_id = $1 THEN m.recipient_id ELSE m.sender_id END
                           AS counterpart_id
                FROM messages m
                WHERE m.sender_id = $1 OR m.recipient_id = $1
            ),
            latest AS (
                SELECT DISTINCT ON (counterpart_id) *
                FROM thread
                ORDER BY counterpart_id, created_at DESC
            )
            SELECT l.id,
                   l.sender_id,
                   l.recipient_id,
                   l.order_id,
                   l.body,
                   l.is_read,
                   l.created_at,
                   l.counterpart_id,
                   (SELECT COUNT(*)
                    FROM messages u
                    WHERE u.recipient_id = $1
                      AND u.sender_id = l.counterpart_id
                      AND NOT u.is_read) AS unread_count
            FROM latest l
            ORDER BY l.created_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Conversation {
                counterpart_id: UserId::from_uuid(row.counterpart_id),
                unread_count: row.unread_count,
                last_message: row.message.into_entity(),
            })
            .collect())
    }
}

// ============================================================================
// Notifications
// ============================================================================

impl NotificationRepository for PgMarketplaceRepository {
    async fn insert_notification(&self, notification: &Notification) -> MarketplaceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, title, body, link, send_email, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(notification.id.as_uuid())
        .bind(notification.user_id.as_uuid())
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.link)
        .bind(notification.send_email)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Notification>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(user_id.as_uuid())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let items = rows.into_iter().map(NotificationRow::into_entity).collect();
        Ok(Page::new(items, total, page))
    }

    async fn count_unread_notifications(&self, user_id: UserId) -> MarketplaceResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn mark_notification_read(
        &self,
        user_id: UserId,
        id: NotificationId,
    ) -> MarketplaceResult<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_all_notifications_read(&self, user_id: UserId) -> MarketplaceResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

// ============================================================================
// Outsourcing
// ============================================================================

impl OutsourcingRepository for PgMarketplaceRepository {
    async fn create_outsourcing_request(&self, request: &OutsourcingRequest) -> MarketplaceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO outsourcing_requests (
                id, requester_id, title, description, budget_cents, status,
                reviewer_notes, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(request.id.as_uuid())
        .bind(request.requester_id.as_uuid())
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.budget.value())
        .bind(request.status.code())
        .bind(&request.reviewer_notes)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_outsourcing_request(
        &self,
        id: OutsourcingRequestId,
    ) -> MarketplaceResult<Option<OutsourcingRequest>> {
        let sql = format!("SELECT {OUTSOURCING_COLUMNS} FROM outsourcing_requests WHERE id = $1");
        let row = sqlx::query_as::<_, OutsourcingRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(OutsourcingRow::into_entity).transpose()
    }

    async fn update_outsourcing_request(&self, request: &OutsourcingRequest) -> MarketplaceResult<()> {
        sqlx::query(
            r#"
            UPDATE outsourcing_requests
            SET status = $2, reviewer_notes = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(request.id.as_uuid())
        .bind(request.status.code())
        .bind(&request.reviewer_notes)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_outsourcing_requests(
        &self,
        requester_id: Option<UserId>,
        status: Option<OutsourcingStatus>,
        page: PageRequest,
    ) -> MarketplaceResult<Page<OutsourcingRequest>> {
        const FILTER: &str = r#"
            ($1::UUID IS NULL OR requester_id = $1)
            AND ($2::TEXT IS NULL OR status = $2)
        "#;
        let status = status.map(|s| s.code());

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM outsourcing_requests WHERE {FILTER}"
        ))
        .bind(requester_id.map(Uuid::from))
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "SELECT {OUTSOURCING_COLUMNS} FROM outsourcing_requests WHERE {FILTER} ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, OutsourcingRow>(&sql)
            .bind(requester_id.map(Uuid::from))
            .bind(status)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(OutsourcingRow::into_entity)
            .collect::<MarketplaceResult<Vec<_>>>()?;
        Ok(Page::new(items, total, page))
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    sender_id: Uuid,
    recipient_id: Uuid,
    order_id: Option<Uuid>,
    body: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_entity(self) -> Message {
        Message {
            id: MessageId::from_uuid(self.id),
            sender_id: UserId::from_uuid(self.sender_id),
            recipient_id: UserId::from_uuid(self.recipient_id),
            order_id: self.order_id.map(OrderId::from_uuid),
            body: self.body,
            is_read: self.is_read,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct InboxRow {
    #[sqlx(flatten)]
    message: MessageRow,
    counterpart_id: Uuid,
    unread_count: i64,
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    body: String,
    link: Option<String>,
    send_email: bool,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_entity(self) -> Notification {
        Notification {
            id: NotificationId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            title: self.title,
            body: self.body,
            link: self.link,
            send_email: self.send_email,
            is_read: self.is_read,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OutsourcingRow {
    id: Uuid,
    requester_id: Uuid,
    title: String,
    description: String,
    budget_cents: i64,
    status: String,
    reviewer_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OutsourcingRow {
    fn into_entity(self) -> MarketplaceResult<OutsourcingRequest> {
        Ok(OutsourcingRequest {
            id: OutsourcingRequestId::from_uuid(self.id),
            requester_id: UserId::from_uuid(self.requester_id),
            title: self.title,
            description: self.description,
            budget: Cents(self.budget_cents),
            status: decode("outsourcing_requests.status", &self.status)?,
            reviewer_notes: self.reviewer_notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
