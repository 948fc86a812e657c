//! Subscriptions, the payment ledger and platform statistics.
//!
//! Ledger writes insert with `ON CONFLICT (provider, provider_reference)
//! DO NOTHING` and only apply the state change when the row was new, all
//! inside one transaction. A redelivered webhook therefore changes nothing.

use chrono::{DateTime, Utc};
use kernel::id::{MilestoneId, OrderId, SubscriptionId, TransactionId, UserId};
use kernel::pagination::{Page, PageRequest};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::{PgMarketplaceRepository, decode};
use crate::domain::entity::{LedgerEntry, Renewal, Subscription};
use crate::domain::repository::{
    EscrowWrite, LedgerRepository, LedgerWrite, PlatformStats, StatsRepository,
    SubscriptionRepository,
};
use crate::domain::value_object::Cents;
use crate::error::MarketplaceResult;

const LEDGER_COLUMNS: &str = r#"
    id,
    user_id,
    order_id,
    milestone_id,
    kind,
    provider,
    provider_reference,
    provider_transaction_id,
    status,
    amount_cents,
    created_at,
    completed_at
"#;

/// `false` when the reference is already in the ledger
async fn insert_ledger_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry: &LedgerEntry,
) -> MarketplaceResult<bool> {
    let inserted = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO transactions (
            id, user_id, order_id, milestone_id, kind, provider, provider_reference,
            provider_transaction_id, status, amount_cents, created_at, completed_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (provider, provider_reference) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(entry.id.as_uuid())
    .bind(entry.user_id.as_uuid())
    .bind(entry.order_id.map(Uuid::from))
    .bind(entry.milestone_id.map(Uuid::from))
    .bind(entry.kind.code())
    .bind(entry.provider.code())
    .bind(&entry.provider_reference)
    .bind(&entry.provider_transaction_id)
    .bind(entry.status.code())
    .bind(entry.amount.value())
    .bind(entry.created_at)
    .bind(entry.completed_at)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(inserted.is_some())
}

impl SubscriptionRepository for PgMarketplaceRepository {
    async fn find_subscription(&self, user_id: UserId) -> MarketplaceResult<Option<Subscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, user_id, plan, status, bids_used, services_used, period_start,
                   period_end, payment_reference, created_at, updated_at
            FROM subscriptions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(SubscriptionRow::into_entity).transpose()
    }
}

impl LedgerRepository for PgMarketplaceRepository {
    async fn record_subscription_payment(
        &self,
        entry: &LedgerEntry,
        renewal: &Renewal,
    ) -> MarketplaceResult<LedgerWrite> {
        let mut tx = self.pool.begin().await?;
        if !insert_ledger_entry(&mut tx, entry).await? {
            return Ok(LedgerWrite::Duplicate);
        }

        // One row per user: update in place, insert only if missing
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, plan, status, bids_used, services_used, period_start,
                period_end, payment_reference, created_at, updated_at
            ) VALUES ($1, $2, $3, 'active', 0, 0, $4, $5, $6, $4, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET plan = EXCLUDED.plan,
                status = 'active',
                bids_used = 0,
                period_start = EXCLUDED.period_start,
                period_end = EXCLUDED.period_end,
                payment_reference = EXCLUDED.payment_reference,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(renewal.user_id.as_uuid())
        .bind(renewal.plan.code())
        .bind(renewal.period_start)
        .bind(renewal.period_end)
        .bind(&renewal.payment_reference)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(LedgerWrite::Applied)
    }

    async fn record_escrow_funding(
        &self,
        entry: &LedgerEntry,
        order_id: OrderId,
        milestone_id: Option<MilestoneId>,
    ) -> MarketplaceResult<EscrowWrite> {
        let mut tx = self.pool.begin().await?;
        if !insert_ledger_entry(&mut tx, entry).await? {
            return Ok(EscrowWrite::Duplicate);
        }

        let started = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'in_progress', updated_at = $2
            WHERE id = $1 AND status = 'awaiting_payment'
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await?;

        if let Some(milestone_id) = milestone_id {
            sqlx::query(
                r#"
                UPDATE milestones
                SET status = 'funded', funded_at = $3
                WHERE id = $1 AND order_id = $2 AND status = 'pending'
                "#,
            )
            .bind(milestone_id.as_uuid())
            .bind(order_id.as_uuid())
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(EscrowWrite::Applied {
            order_started: started.rows_affected() == 1,
        })
    }

    async fn list_ledger(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> MarketplaceResult<Page<LedgerEntry>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {LEDGER_COLUMNS} FROM transactions WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, LedgerRow>(&sql)
            .bind(user_id.as_uuid())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(LedgerRow::into_entity)
            .collect::<MarketplaceResult<Vec<_>>>()?;
        Ok(Page::new(items, total, page))
    }
}

impl StatsRepository for PgMarketplaceRepository {
    async fn platform_stats(&self) -> MarketplaceResult<PlatformStats> {
        let row = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM users WHERE is_suspended) AS suspended_users,
                (SELECT COUNT(*) FROM services WHERE status = 'active') AS active_services,
                (SELECT COUNT(*) FROM projects WHERE status = 'open') AS open_projects,
                (SELECT COUNT(*) FROM orders WHERE status = 'in_progress') AS orders_in_progress,
                (SELECT COUNT(*) FROM orders WHERE status = 'disputed') AS disputed_orders,
                (SELECT COUNT(*) FROM orders WHERE status = 'completed') AS completed_orders,
                (SELECT COUNT(*) FROM outsourcing_requests WHERE status = 'pending')
                    AS pending_outsourcing_requests,
                (SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM transactions
                    WHERE kind = 'escrow_fund' AND status = 'completed') AS escrow_funded_cents,
                (SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM transactions
                    WHERE kind = 'subscription' AND status = 'completed') AS subscription_revenue_cents
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(PlatformStats {
            users: row.users,
            suspended_users: row.suspended_users,
            active_services: row.active_services,
            open_projects: row.open_projects,
            orders_in_progress: row.orders_in_progress,
            disputed_orders: row.disputed_orders,
            completed_orders: row.completed_orders,
            pending_outsourcing_requests: row.pending_outsourcing_requests,
            escrow_funded_cents: row.escrow_funded_cents,
            subscription_revenue_cents: row.subscription_revenue_cents,
        })
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: Uuid,
    plan: String,
    status: String,
    bids_used: i32,
    services_used: i32,
    period_start: DateTime<Utc>,
    period_end: Option<DateTime<Utc>>,
    payment_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SubscriptionRow {
    fn into_entity(self) -> MarketplaceResult<Subscription> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            plan: decode("subscriptions.plan", &self.plan)?,
            status: decode("subscriptions.status", &self.status)?,
            bids_used: self.bids_used,
            services_used: self.services_used,
            period_start: self.period_start,
            period_end: self.period_end,
            payment_reference: self.payment_reference,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LedgerRow {
    id: Uuid,
    user_id: Uuid,
    order_id: Option<Uuid>,
    milestone_id: Option<Uuid>,
    kind: String,
    provider: String,
    provider_reference: String,
    provider_transaction_id: Option<String>,
    status: String,
    amount_cents: i64,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl LedgerRow {
    fn into_entity(self) -> MarketplaceResult<LedgerEntry> {
        Ok(LedgerEntry {
            id: TransactionId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            order_id: self.order_id.map(OrderId::from_uuid),
            milestone_id: self.milestone_id.map(MilestoneId::from_uuid),
            kind: decode("transactions.kind", &self.kind)?,
            provider: decode("transactions.provider", &self.provider)?,
            provider_reference: self.provider_reference,
            provider_transaction_id: self.provider_transaction_id,
            status: decode("transactions.status", &self.status)?,
            amount: Cents(self.amount_cents),
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    users: i64,
    suspended_users: i64,
    active_services: i64,
    open_projects: i64,
    orders_in_progress: i64,
    disputed_orders: i64,
    completed_orders: i64,
    pending_outsourcing_requests: i64,
    escrow_funded_cents: i64,
    subscription_revenue_cents: i64,
}
