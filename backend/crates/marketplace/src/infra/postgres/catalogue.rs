use chrono::{DateTime, Utc};
use kernel::id::{CategoryId, ServiceId, UserId};
use kernel::pagination::{Page, PageRequest};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::{PgMarketplaceRepository, conflict_on, decode, like_pattern};
use crate::domain::entity::{Category, Service};
use crate::domain::repository::{
    CategoryRepository, ServiceQuery, ServiceRepository, ShortlistRepository,
};
use crate::domain::value_object::{Cents, Slug};
use crate::error::MarketplaceResult;

const SERVICE_COLUMNS: &str = r#"
    s.id,
    s.seller_id,
    s.category_id,
    s.title,
    s.description,
    s.price_cents,
    s.delivery_days,
    s.status,
    s.removed_reason,
    s.created_at,
    s.updated_at
"#;

/// Make sure the user has a subscription row to count against. Rows are
/// created at sign-up, this covers accounts that predate that.
pub(super) async fn ensure_subscription(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
) -> MarketplaceResult<()> {
    sqlx::query(
        r#"
        INSERT INTO subscriptions (id, user_id, plan, status, period_start)
        VALUES ($1, $2, 'free', 'active', now())
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id.as_uuid())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// ============================================================================
// Categories
// ============================================================================

impl CategoryRepository for PgMarketplaceRepository {
    async fn list_categories(&self) -> MarketplaceResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CategoryRow::into_entity).collect())
    }

    async fn find_category(&self, id: CategoryId) -> MarketplaceResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, created_at FROM categories WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(CategoryRow::into_entity))
    }

    async fn create_category(&self, category: &Category) -> MarketplaceResult<()> {
        sqlx::query("INSERT INTO categories (id, name, slug, created_at) VALUES ($1, $2, $3, $4)")
            .bind(category.id.as_uuid())
            .bind(&category.name)
            .bind(category.slug.as_str())
            .bind(category.created_at)
            .execute(&self.pool)
            .await
            .map_err(conflict_on("categories_slug_key", "Category slug is already in use"))?;
        Ok(())
    }
}

// ============================================================================
// Services
// ============================================================================

impl ServiceRepository for PgMarketplaceRepository {
    async fn insert_service_within_quota(
        &self,
        service: &Service,
        limit: Option<u32>,
    ) -> MarketplaceResult<bool> {
        let mut tx = self.pool.begin().await?;
        ensure_subscription(&mut tx, service.seller_id).await?;

        let counted = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE subscriptions
            SET services_used = services_used + 1, updated_at = now()
            WHERE user_id = $1 AND ($2::INTEGER IS NULL OR services_used < $2)
            RETURNING id
            "#,
        )
        .bind(service.seller_id.as_uuid())
        .bind(limit.map(|l| l as i32))
        .fetch_optional(&mut *tx)
        .await?;

        if counted.is_none() {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO services (
                id, seller_id, category_id, title, description, price_cents,
                delivery_days, status, removed_reason, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(service.id.as_uuid())
        .bind(service.seller_id.as_uuid())
        .bind(service.category_id.as_uuid())
        .bind(&service.title)
        .bind(&service.description)
        .bind(service.price.value())
        .bind(service.delivery_days)
        .bind(service.status.code())
        .bind(&service.removed_reason)
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn find_service(&self, id: ServiceId) -> MarketplaceResult<Option<Service>> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services s WHERE s.id = $1");
        let row = sqlx::query_as::<_, ServiceRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(ServiceRow::into_entity).transpose()
    }

    async fn update_service(&self, service: &Service) -> MarketplaceResult<()> {
        sqlx::query(
            r#"
            UPDATE services
            SET category_id = $2,
                title = $3,
                description = $4,
                price_cents = $5,
                delivery_days = $6,
                status = $7,
                removed_reason = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(service.id.as_uuid())
        .bind(service.category_id.as_uuid())
        .bind(&service.title)
        .bind(&service.description)
        .bind(service.price.value())
        .bind(service.delivery_days)
        .bind(service.status.code())
        .bind(&service.removed_reason)
        .bind(service.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn retire_service(&self, service: &Service) -> MarketplaceResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE services SET status = $2, removed_reason = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(service.id.as_uuid())
        .bind(service.status.code())
        .bind(&service.removed_reason)
        .bind(service.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE subscriptions
            SET services_used = GREATEST(services_used - 1, 0), updated_at = now()
            WHERE user_id = $1
            "#,
        )
        .bind(service.seller_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_services(
        &self,
        query: &ServiceQuery,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Service>> {
        const FILTER: &str = r#"
            s.status <> 'removed'
            AND ($1::BOOLEAN OR s.status = 'active')
            AND ($2::UUID IS NULL OR s.category_id = $2)
            AND ($3::UUID IS NULL OR s.seller_id = $3)
            AND ($4::TEXT IS NULL OR s.title ILIKE $4 OR s.description ILIKE $4)
        "#;
        let pattern = query.search.as_deref().map(like_pattern);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM services s WHERE {FILTER}"))
            .bind(query.include_paused)
            .bind(query.category_id.map(Uuid::from))
            .bind(query.seller_id.map(Uuid::from))
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services s WHERE {FILTER} ORDER BY s.created_at DESC LIMIT $5 OFFSET $6"
        );
        let rows = sqlx::query_as::<_, ServiceRow>(&sql)
            .bind(query.include_paused)
            .bind(query.category_id.map(Uuid::from))
            .bind(query.seller_id.map(Uuid::from))
            .bind(&pattern)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(ServiceRow::into_entity)
            .collect::<MarketplaceResult<Vec<_>>>()?;
        Ok(Page::new(items, total, page))
    }
}

// ============================================================================
// Shortlist
// ============================================================================

impl ShortlistRepository for PgMarketplaceRepository {
    async fn add_to_shortlist(&self, user_id: UserId, service_id: ServiceId) -> MarketplaceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO shortlist (user_id, service_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, service_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(service_id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_from_shortlist(
        &self,
        user_id: UserId,
        service_id: ServiceId,
    ) -> MarketplaceResult<bool> {
        let result = sqlx::query("DELETE FROM shortlist WHERE user_id = $1 AND service_id = $2")
            .bind(user_id.as_uuid())
            .bind(service_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_shortlist(&self, user_id: UserId) -> MarketplaceResult<Vec<Service>> {
        let sql = format!(
            r#"
            SELECT {SERVICE_COLUMNS}
            FROM shortlist sl
            JOIN services s ON s.id = sl.service_id
            WHERE sl.user_id = $1 AND s.status <> 'removed'
            ORDER BY sl.created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, ServiceRow>(&sql)
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(ServiceRow::into_entity).collect()
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    slug: String,
    created_at: DateTime<Utc>,
}

impl CategoryRow {
    fn into_entity(self) -> Category {
        Category {
            id: CategoryId::from_uuid(self.id),
            name: self.name,
            slug: Slug::from_db(self.slug),
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ServiceRow {
    id: Uuid,
    seller_id: Uuid,
    category_id: Uuid,
    title: String,
    description: String,
    price_cents: i64,
    delivery_days: i32,
    status: String,
    removed_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ServiceRow {
    fn into_entity(self) -> MarketplaceResult<Service> {
        Ok(Service {
            id: ServiceId::from_uuid(self.id),
            seller_id: UserId::from_uuid(self.seller_id),
            category_id: CategoryId::from_uuid(self.category_id),
            title: self.title,
            description: self.description,
            price: Cents(self.price_cents),
            delivery_days: self.delivery_days,
            status: decode("services.status", &self.status)?,
            removed_reason: self.removed_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
