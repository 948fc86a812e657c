//! Project Entity
//!
//! A client's brief with a budget range. Freelancers bid while it is open.

use chrono::{DateTime, Utc};
use derive_more::Display;
use kernel::id::{CategoryId, ProjectId, UserId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::value_object::{Cents, bounded_text};
use crate::error::{MarketplaceError, MarketplaceResult};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[display("open")]
    Open,
    #[display("in_progress")]
    InProgress,
    #[display("completed")]
    Completed,
    #[display("cancelled")]
    Cancelled,
}

impl ProjectStatus {
    pub const fn code(&self) -> &'static str {
        match self {
            ProjectStatus::Open => "open",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "open" => Ok(ProjectStatus::Open),
            "in_progress" => Ok(ProjectStatus::InProgress),
            "completed" => Ok(ProjectStatus::Completed),
            "cancelled" => Ok(ProjectStatus::Cancelled),
            other => Err(format!("unknown project status: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Project {
    pub id: ProjectId,
    pub client_id: UserId,
    pub category_id: CategoryId,
    pub title: String,
    pub description: String,
    pub budget_min: Cents,
    pub budget_max: Cents,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ProjectDraft {
    pub category_id: CategoryId,
    pub title: String,
    pub description: String,
    pub budget_min: Cents,
    pub budget_max: Cents,
}

impl ProjectDraft {
    pub fn new(
        category_id: CategoryId,
        title: &str,
        description: &str,
        budget_min: Cents,
        budget_max: Cents,
    ) -> MarketplaceResult<Self> {
        if !budget_min.is_positive() || !budget_max.is_positive() {
            return Err(MarketplaceError::validation("Budget must be greater than zero"));
        }
        if budget_min > budget_max {
            return Err(MarketplaceError::validation(
                "Minimum budget cannot exceed the maximum budget",
            ));
        }
        Ok(Self {
            category_id,
            title: bounded_text("Title", title, 5, 120)?,
            description: bounded_text("Description", description, 20, 10_000)?,
            budget_min,
            budget_max,
        })
    }
}

impl Project {
    pub fn new(client_id: UserId, draft: ProjectDraft) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::new(),
            client_id,
            category_id: draft.category_id,
            title: draft.title,
            description: draft.description,
            budget_min: draft.budget_min,
            budget_max: draft.budget_max,
            status: ProjectStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == ProjectStatus::Open
    }

    pub fn apply(&mut self, draft: ProjectDraft) -> MarketplaceResult<()> {
        self.ensure_open()?;
        self.category_id = draft.category_id;
        self.title = draft.title;
        self.description = draft.description;
        self.budget_min = draft.budget_min;
        self.budget_max = draft.budget_max;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn cancel(&mut self) -> MarketplaceResult<()> {
        self.ensure_open()?;
        self.status = ProjectStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn ensure_open(&self) -> MarketplaceResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(MarketplaceError::conflict(format!(
                "Project is {} and can no longer be changed",
                self.status
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(min: i64, max: i64) -> MarketplaceResult<ProjectDraft> {
        ProjectDraft::new(
            CategoryId::new(),
            "Build a Shopify store",
            "Need a Shopify store for a Durban surf shop, twelve products.",
            Cents(min),
            Cents(max),
        )
    }

    #[test]
    fn budget_rules() {
        assert!(draft(100_000, 300_000).is_ok());
        assert!(draft(100_000, 100_000).is_ok());
        assert!(draft(300_000, 100_000).is_err());
        assert!(draft(0, 100_000).is_err());
    }

    #[test]
    fn only_open_projects_change() {
        let mut project = Project::new(UserId::new(), draft(1000, 2000).unwrap());
        project.cancel().unwrap();
        assert_eq!(project.status, ProjectStatus::Cancelled);
        assert!(project.cancel().is_err());
        assert!(project.apply(draft(1000, 2000).unwrap()).is_err());
    }
}
