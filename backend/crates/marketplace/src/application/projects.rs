use std::sync::Arc;

use auth::Identity;
use kernel::id::{CategoryId, ProjectId};
use kernel::pagination::{Page, PageRequest};

use crate::domain::entity::{Project, ProjectDraft, ProjectStatus};
use crate::domain::repository::{CategoryRepository, ProjectQuery, ProjectRepository};
use crate::error::{MarketplaceError, MarketplaceResult};

/// Client-side project management
pub struct ProjectUseCase<R>
where
    R: ProjectRepository + CategoryRepository,
{
    repo: Arc<R>,
}

impl<R> ProjectUseCase<R>
where
    R: ProjectRepository + CategoryRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, identity: &Identity, draft: ProjectDraft) -> MarketplaceResult<Project> {
        self.ensure_category(draft.category_id).await?;
        let project = Project::new(identity.user_id, draft);
        self.repo.create_project(&project).await?;

        tracing::info!(project_id = %project.id, client_id = %identity.user_id, "Project posted");
        Ok(project)
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: ProjectId,
        draft: ProjectDraft,
    ) -> MarketplaceResult<Project> {
        let mut project = self.owned(identity, id).await?;
        self.ensure_category(draft.category_id).await?;
        project.apply(draft)?;
        self.repo.update_project(&project).await?;
        Ok(project)
    }

    pub async fn cancel(&self, identity: &Identity, id: ProjectId) -> MarketplaceResult<Project> {
        let mut project = self.owned(identity, id).await?;
        project.cancel()?;
        self.repo.update_project(&project).await?;

        tracing::info!(project_id = %id, "Project cancelled");
        Ok(project)
    }

    pub async fn get(&self, id: ProjectId) -> MarketplaceResult<Project> {
        self.repo
            .find_project(id)
            .await?
            .ok_or(MarketplaceError::NotFound("Project"))
    }

    pub async fn list_open(
        &self,
        category_id: Option<CategoryId>,
        page: PageRequest,
    ) -> MarketplaceResult<Page<Project>> {
        let query = ProjectQuery {
            status: Some(ProjectStatus::Open),
            category_id,
            client_id: None,
        };
        self.repo.list_projects(&query, page).await
    }

    pub async fn mine(&self, identity: &Identity, page: PageRequest) -> MarketplaceResult<Page<Project>> {
        let query = ProjectQuery {
            client_id: Some(identity.user_id),
            ..Default::default()
        };
        self.repo.list_projects(&query, page).await
    }

    async fn owned(&self, identity: &Identity, id: ProjectId) -> MarketplaceResult<Project> {
        let project = self.get(id).await?;
        if !identity.is(project.client_id) {
            return Err(MarketplaceError::forbidden("You do not own this project"));
        }
        Ok(project)
    }

    async fn ensure_category(&self, id: CategoryId) -> MarketplaceResult<()> {
        if self.repo.find_category(id).await?.is_none() {
            return Err(MarketplaceError::validation("Unknown category"));
        }
        Ok(())
    }
}
