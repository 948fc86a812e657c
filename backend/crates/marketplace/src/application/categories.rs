use std::sync::Arc;

use auth::Identity;

use crate::domain::entity::Category;
use crate::domain::repository::CategoryRepository;
use crate::domain::value_object::{Slug, bounded_text};
use crate::error::{MarketplaceError, MarketplaceResult};

pub struct CategoryUseCase<R>
where
    R: CategoryRepository,
{
    repo: Arc<R>,
}

impl<R> CategoryUseCase<R>
where
    R: CategoryRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> MarketplaceResult<Vec<Category>> {
        self.repo.list_categories().await
    }

    /// Admin only
    pub async fn create(&self, identity: &Identity, name: &str, slug: &str) -> MarketplaceResult<Category> {
        if !identity.is_admin() {
            return Err(MarketplaceError::forbidden("Only admins can create categories"));
        }
        let category = Category::new(bounded_text("Name", name, 2, 60)?, Slug::new(slug)?);
        self.repo.create_category(&category).await?;

        tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
        Ok(category)
    }
}
