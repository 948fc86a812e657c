use chrono::{DateTime, Utc};
use kernel::id::CategoryId;

use crate::domain::value_object::Slug;

#[derive(Debug, Clone)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: Slug,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name: String, slug: Slug) -> Self {
        Self {
            id: CategoryId::new(),
            name,
            slug,
            created_at: Utc::now(),
        }
    }
}
