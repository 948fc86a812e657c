use chrono::{DateTime, Utc};
use kernel::id::{BidId, CategoryId, ProjectId, UserId};
use kernel::pagination::{Page, PageRequest};
use uuid::Uuid;

use super::catalogue::ensure_subscription;
use super::orders::insert_order;
use super::{PgMarketplaceRepository, conflict_on, decode};
use crate::domain::entity::{Bid, Order, Project};
use crate::domain::repository::{BidRepository, ProjectQuery, ProjectRepository};
use crate::domain::value_object::Cents;
use crate::error::MarketplaceResult;

const PROJECT_COLUMNS: &str = r#"
    id,
    client_id,
    category_id,
    title,
    description,
    budget_min_cents,
    budget_max_cents,
    status,
    created_at,
    updated_at
"#;

const BID_COLUMNS: &str = r#"
    id,
    project_id,
    freelancer_id,
    amount_cents,
    delivery_days,
    proposal,
    status,
    created_at,
    updated_at
"#;

// ============================================================================
// Projects
// ============================================================================

impl ProjectRepository for PgMarketplaceRepository {
    async fn create_project(&self, project: &Project) -> MarketplaceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO projects (
                id, client_id, category_id, title, description,
                budget_min_cents, budget_max_cents, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(project.id.as_uuid())
        .bind(project.client_id.as_uuid())
        .bind(project.category_id.as_uuid())
        .bind(&project.title)
        .bind(&project.description)
        .bind(project.budget_min.value())
        .bind(project.budget_max.value())
        .bind(project.status.code())
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_project(&self, id: ProjectId) -> MarketplaceResult<Option<Project>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        let row = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(ProjectRow::into_entity).transpose()
    }

    async fn update_project(&self, project: &Project) -> MarketplaceResult<()> {
        sqlx::query(
            r#"
            UPDATE projects
            SET category_id = $2,
                title = $3,
                description = $4,
                budget_min_cents = $5,
                budget_max_cents = $6,
                status = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(project.id.as_uuid())
        .bind(project.category_id.as_uuid())
        .bind(&project.title)
        .bind(&project.description)
        .bind(project.budget_min.value())
        .bind(project.budget_max.value())
        .bind(project.status.code())
        .bind(project.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_projects(
        &self,
        query: &ProjectQuery,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Project>> {
        const FILTER: &str = r#"
            ($1::TEXT IS NULL OR status = $1)
            AND ($2::UUID IS NULL OR category_id = $2)
            AND ($3::UUID IS NULL OR client_id = $3)
        "#;
        let status = query.status.map(|s| s.code());

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM projects WHERE {FILTER}"))
            .bind(status)
            .bind(query.category_id.map(Uuid::from))
            .bind(query.client_id.map(Uuid::from))
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE {FILTER} ORDER BY created_at DESC LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(status)
            .bind(query.category_id.map(Uuid::from))
            .bind(query.client_id.map(Uuid::from))
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(ProjectRow::into_entity)
            .collect::<MarketplaceResult<Vec<_>>>()?;
        Ok(Page::new(items, total, page))
    }

    async fn award_bid(&self, project: &Project, bid: &Bid, order: &Order) -> MarketplaceResult<bool> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query(
            r#"
            UPDATE projects
            SET status = 'in_progress', updated_at = now()
            WHERE id = $1 AND status = 'open'
            "#,
        )
        .bind(project.id.as_uuid())
        .execute(&mut *tx)
        .await?;
        if claimed.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE bids
            SET status = CASE WHEN id = $2 THEN 'accepted' ELSE 'rejected' END,
                updated_at = now()
            WHERE project_id = $1 AND (id = $2 OR status = 'pending')
            "#,
        )
        .bind(project.id.as_uuid())
        .bind(bid.id.as_uuid())
        .execute(&mut *tx)
        .await?;

        insert_order(&mut tx, order).await?;

        tx.commit().await?;
        Ok(true)
    }
}

// ============================================================================
// Bids
// ============================================================================

impl BidRepository for PgMarketplaceRepository {
    async fn insert_bid_within_quota(&self, bid: &Bid, limit: Option<u32>) -> MarketplaceResult<bool> {
        let mut tx = self.pool.begin().await?;
        ensure_subscription(&mut tx, bid.freelancer_id).await?;

        let counted = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE subscriptions
            SET bids_used = bids_used + 1, updated_at = now()
            WHERE user_id = $1 AND ($2::INTEGER IS NULL OR bids_used < $2)
            RETURNING id
            "#,
        )
        .bind(bid.freelancer_id.as_uuid())
        .bind(limit.map(|l| l as i32))
        .fetch_optional(&mut *tx)
        .await?;

        if counted.is_none() {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO bids (
                id, project_id, freelancer_id, amount_cents, delivery_days,
                proposal, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(bid.id.as_uuid())
        .bind(bid.project_id.as_uuid())
        .bind(bid.freelancer_id.as_uuid())
        .bind(bid.amount.value())
        .bind(bid.delivery_days)
        .bind(&bid.proposal)
        .bind(bid.status.code())
        .bind(bid.created_at)
        .bind(bid.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(conflict_on(
            "bids_project_id_freelancer_id_key",
            "You have already bid on this project",
        ))?;

        tx.commit().await?;
        Ok(true)
    }

    async fn find_bid(&self, id: BidId) -> MarketplaceResult<Option<Bid>> {
        let sql = format!("SELECT {BID_COLUMNS} FROM bids WHERE id = $1");
        let row = sqlx::query_as::<_, BidRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(BidRow::into_entity).transpose()
    }

    async fn update_bid(&self, bid: &Bid) -> MarketplaceResult<()> {
        sqlx::query("UPDATE bids SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(bid.id.as_uuid())
            .bind(bid.status.code())
            .bind(bid.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_bids_for_project(&self, project_id: ProjectId) -> MarketplaceResult<Vec<Bid>> {
        let sql = format!("SELECT {BID_COLUMNS} FROM bids WHERE project_id = $1 ORDER BY created_at");
        let rows = sqlx::query_as::<_, BidRow>(&sql)
            .bind(project_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(BidRow::into_entity).collect()
    }

    async fn list_bids_by_freelancer(
        &self,
        freelancer_id: UserId,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Bid>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bids WHERE freelancer_id = $1")
            .bind(freelancer_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {BID_COLUMNS} FROM bids WHERE freelancer_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, BidRow>(&sql)
            .bind(freelancer_id.as_uuid())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(BidRow::into_entity)
            .collect::<MarketplaceResult<Vec<_>>>()?;
        Ok(Page::new(items, total, page))
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    client_id: Uuid,
    category_id: Uuid,
    title: String,
    description: String,
    budget_min_cents: i64,
    budget_max_cents: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProjectRow {
    fn into_entity(self) -> MarketplaceResult<Project> {
        Ok(Project {
            id: ProjectId::from_uuid(self.id),
            client_id: UserId::from_uuid(self.client_id),
            category_id: CategoryId::from_uuid(self.category_id),
            title: self.title,
            description: self.description,
            budget_min: Cents(self.budget_min_cents),
            budget_max: Cents(self.budget_max_cents),
            status: decode("projects.status", &self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BidRow {
    id: Uuid,
    project_id: Uuid,
    freelancer_id: Uuid,
    amount_cents: i64,
    delivery_days: i32,
    proposal: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BidRow {
    fn into_entity(self) -> MarketplaceResult<Bid> {
        Ok(Bid {
            id: BidId::from_uuid(self.id),
            project_id: ProjectId::from_uuid(self.project_id),
            freelancer_id: UserId::from_uuid(self.freelancer_id),
            amount: Cents(self.amount_cents),
            delivery_days: self.delivery_days,
            proposal: self.proposal,
            status: decode("bids.status", &self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
