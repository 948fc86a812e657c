use auth::Identity;
use axum::Extension;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use kernel::id::{BidId, ProjectId};
use kernel::pagination::{Page, PageRequest};

use super::MarketplaceAppState;
use crate::application::{BidUseCase, PlaceBidInput, ProjectUseCase};
use crate::domain::MarketplaceStore;
use crate::domain::entity::ProjectDraft;
use crate::error::MarketplaceResult;
use crate::presentation::dto::{
    BidResponse, ListProjectsQuery, OrderResponse, PlaceBidRequest, ProjectRequest,
    ProjectResponse,
};

fn draft(req: ProjectRequest) -> MarketplaceResult<ProjectDraft> {
    ProjectDraft::new(
        req.category_id,
        &req.title,
        &req.description,
        req.budget_min_cents,
        req.budget_max_cents,
    )
}

// ============================================================================
// Projects
// ============================================================================

/// GET /api/projects
pub async fn list_projects<R>(
    State(state): State<MarketplaceAppState<R>>,
    Query(query): Query<ListProjectsQuery>,
) -> MarketplaceResult<Json<Page<ProjectResponse>>>
where
    R: MarketplaceStore,
{
    let page = ProjectUseCase::new(state.repo.clone())
        .list_open(query.category, query.page())
        .await?;
    Ok(Json(page.map(Into::into)))
}

/// GET /api/projects/{id}
pub async fn get_project<R>(
    State(state): State<MarketplaceAppState<R>>,
    Path(id): Path<ProjectId>,
) -> MarketplaceResult<Json<ProjectResponse>>
where
    R: MarketplaceStore,
{
    let project = ProjectUseCase::new(state.repo.clone()).get(id).await?;
    Ok(Json(project.into()))
}

/// POST /api/projects
pub async fn create_project<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<ProjectRequest>,
) -> MarketplaceResult<impl IntoResponse>
where
    R: MarketplaceStore,
{
    let project = ProjectUseCase::new(state.repo.clone())
        .create(&identity, draft(req)?)
        .await?;
    Ok((StatusCode::CREATED, Json(ProjectResponse::from(project))))
}

/// PUT /api/projects/{id}
pub async fn update_project<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<ProjectId>,
    Json(req): Json<ProjectRequest>,
) -> MarketplaceResult<Json<ProjectResponse>>
where
    R: MarketplaceStore,
{
    let project = ProjectUseCase::new(state.repo.clone())
        .update(&identity, id, draft(req)?)
        .await?;
    Ok(Json(project.into()))
}

/// POST /api/projects/{id}/cancel
pub async fn cancel_project<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<ProjectId>,
) -> MarketplaceResult<Json<ProjectResponse>>
where
    R: MarketplaceStore,
{
    let project = ProjectUseCase::new(state.repo.clone())
        .cancel(&identity, id)
        .await?;
    Ok(Json(project.into()))
}

/// GET /api/me/projects
pub async fn my_projects<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Query(page): Query<PageRequest>,
) -> MarketplaceResult<Json<Page<ProjectResponse>>>
where
    R: MarketplaceStore,
{
    let page = ProjectUseCase::new(state.repo.clone())
        .mine(&identity, page.normalized())
        .await?;
    Ok(Json(page.map(Into::into)))
}

// ============================================================================
// Bids
// ============================================================================

/// GET /api/projects/{id}/bids
pub async fn list_bids<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(project_id): Path<ProjectId>,
) -> MarketplaceResult<Json<Vec<BidResponse>>>
where
    R: MarketplaceStore,
{
    let use_case = BidUseCase::new(state.repo.clone(), state.config.clone());
    let bids = use_case.list_for_project(&identity, project_id).await?;
    Ok(Json(bids.into_iter().map(Into::into).collect()))
}

/// POST /api/projects/{id}/bids
pub async fn place_bid<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(project_id): Path<ProjectId>,
    Json(req): Json<PlaceBidRequest>,
) -> MarketplaceResult<impl IntoResponse>
where
    R: MarketplaceStore,
{
    let use_case = BidUseCase::new(state.repo.clone(), state.config.clone());
    let bid = use_case
        .place(
            &identity,
            PlaceBidInput {
                project_id,
                amount: req.amount_cents,
                delivery_days: req.delivery_days,
                proposal: req.proposal,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(BidResponse::from(bid))))
}

/// POST /api/bids/{id}/withdraw
pub async fn withdraw_bid<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<BidId>,
) -> MarketplaceResult<Json<BidResponse>>
where
    R: MarketplaceStore,
{
    let use_case = BidUseCase::new(state.repo.clone(), state.config.clone());
    let bid = use_case.withdraw(&identity, id).await?;
    Ok(Json(bid.into()))
}

/// POST /api/bids/{id}/accept
///
/// Returns the order created for the winning bid.
pub async fn accept_bid<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<BidId>,
) -> MarketplaceResult<impl IntoResponse>
where
    R: MarketplaceStore,
{
    let use_case = BidUseCase::new(state.repo.clone(), state.config.clone());
    let order = use_case.accept(&identity, id).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

/// GET /api/me/bids
pub async fn my_bids<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Query(page): Query<PageRequest>,
) -> MarketplaceResult<Json<Page<BidResponse>>>
where
    R: MarketplaceStore,
{
    let use_case = BidUseCase::new(state.repo.clone(), state.config.clone());
    let page = use_case.mine(&identity, page.normalized()).await?;
    Ok(Json(page.map(Into::into)))
}
