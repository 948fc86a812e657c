use chrono::{DateTime, Utc};
use kernel::id::{BidId, MilestoneId, OrderId, ProjectId, ServiceId, UserId};
use kernel::pagination::{Page, PageRequest};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::{PgMarketplaceRepository, decode};
use crate::domain::entity::{Milestone, Order, OrderOrigin, OrderStatus};
use crate::domain::repository::{OrderRepository, OrderRole};
use crate::domain::value_object::Cents;
use crate::error::{MarketplaceError, MarketplaceResult};

const ORDER_COLUMNS: &str = r#"
    id,
    buyer_id,
    seller_id,
    service_id,
    project_id,
    bid_id,
    title,
    requirements,
    amount_cents,
    status,
    delivery_message,
    dispute_reason,
    created_at,
    updated_at
"#;

const MILESTONE_COLUMNS: &str = "id, order_id, title, amount_cents, status, funded_at, created_at";

pub(super) async fn insert_order(
    tx: &mut Transaction<'_, Postgres>,
    order: &Order,
) -> MarketplaceResult<()> {
    let (service_id, project_id, bid_id) = match order.origin {
        OrderOrigin::Service(id) => (Some(id.into_uuid()), None, None),
        OrderOrigin::Bid { project_id, bid_id } => {
            (None, Some(project_id.into_uuid()), Some(bid_id.into_uuid()))
        }
    };

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, buyer_id, seller_id, service_id, project_id, bid_id, title,
            requirements, amount_cents, status, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(order.id.as_uuid())
    .bind(order.buyer_id.as_uuid())
    .bind(order.seller_id.as_uuid())
    .bind(service_id)
    .bind(project_id)
    .bind(bid_id)
    .bind(&order.title)
    .bind(&order.requirements)
    .bind(order.amount.value())
    .bind(order.status.code())
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

impl OrderRepository for PgMarketplaceRepository {
    async fn create_order(&self, order: &Order) -> MarketplaceResult<()> {
        let mut tx = self.pool.begin().await?;
        insert_order(&mut tx, order).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_order(&self, id: OrderId) -> MarketplaceResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(OrderRow::into_entity).transpose()
    }

    async fn save_order(&self, order: &Order, expected: OrderStatus) -> MarketplaceResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2,
                delivery_message = $3,
                dispute_reason = $4,
                updated_at = $5
            WHERE id = $1 AND status = $6
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.status.code())
        .bind(&order.delivery_message)
        .bind(&order.dispute_reason)
        .bind(order.updated_at)
        .bind(expected.code())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_orders(
        &self,
        user_id: UserId,
        role: OrderRole,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Order>> {
        let filter = match role {
            OrderRole::Buyer => "buyer_id = $1",
            OrderRole::Seller => "seller_id = $1",
            OrderRole::Any => "(buyer_id = $1 OR seller_id = $1)",
        };

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders WHERE {filter}"))
            .bind(user_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {filter} ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id.as_uuid())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(OrderRow::into_entity)
            .collect::<MarketplaceResult<Vec<_>>>()?;
        Ok(Page::new(items, total, page))
    }

    async fn add_milestone(&self, milestone: &Milestone) -> MarketplaceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO milestones (id, order_id, title, amount_cents, status, funded_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(milestone.id.as_uuid())
        .bind(milestone.order_id.as_uuid())
        .bind(&milestone.title)
        .bind(milestone.amount.value())
        .bind(milestone.status.code())
        .bind(milestone.funded_at)
        .bind(milestone.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_milestone(&self, id: MilestoneId) -> MarketplaceResult<Option<Milestone>> {
        let sql = format!("SELECT {MILESTONE_COLUMNS} FROM milestones WHERE id = $1");
        let row = sqlx::query_as::<_, MilestoneRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(MilestoneRow::into_entity).transpose()
    }

    async fn list_milestones(&self, order_id: OrderId) -> MarketplaceResult<Vec<Milestone>> {
        let sql = format!(
            "SELECT {MILESTONE_COLUMNS} FROM milestones WHERE order_id = $1 ORDER BY created_at"
        );
        let rows = sqlx::query_as::<_, MilestoneRow>(&sql)
            .bind(order_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(MilestoneRow::into_entity).collect()
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    buyer_id: Uuid,
    seller_id: Uuid,
    service_id: Option<Uuid>,
    project_id: Option<Uuid>,
    bid_id: Option<Uuid>,
    title: String,
    requirements: Option<String>,
    amount_cents: i64,
    status: String,
    delivery_message: Option<String>,
    dispute_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_entity(self) -> MarketplaceResult<Order> {
        let origin = match (self.service_id, self.project_id, self.bid_id) {
            (Some(service_id), _, _) => OrderOrigin::Service(ServiceId::from_uuid(service_id)),
            (None, Some(project_id), Some(bid_id)) => OrderOrigin::Bid {
                project_id: ProjectId::from_uuid(project_id),
                bid_id: BidId::from_uuid(bid_id),
            },
            _ => {
                return Err(MarketplaceError::Internal(format!(
                    "order {} has no service or bid",
                    self.id
                )));
            }
        };

        Ok(Order {
            id: OrderId::from_uuid(self.id),
            buyer_id: UserId::from_uuid(self.buyer_id),
            seller_id: UserId::from_uuid(self.seller_id),
            origin,
            title: self.title,
            requirements: self.requirements,
            amount: Cents(self.amount_cents),
            status: decode("orders.status", &self.status)?,
            delivery_message: self.delivery_message,
            dispute_reason: self.dispute_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MilestoneRow {
    id: Uuid,
    order_id: Uuid,
    title: String,
    amount_cents: i64,
    status: String,
    funded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl MilestoneRow {
    fn into_entity(self) -> MarketplaceResult<Milestone> {
        Ok(Milestone {
            id: MilestoneId::from_uuid(self.id),
            order_id: OrderId::from_uuid(self.order_id),
            title: self.title,
            amount: Cents(self.amount_cents),
            status: decode("milestones.status", &self.status)?,
            funded_at: self.funded_at,
            created_at: self.created_at,
        })
    }
}
