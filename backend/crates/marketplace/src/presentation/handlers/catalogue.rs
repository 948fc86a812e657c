use auth::Identity;
use axum::Extension;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use kernel::id::ServiceId;
use kernel::pagination::{Page, PageRequest};

use super::MarketplaceAppState;
use crate::application::{CategoryUseCase, ServiceUseCase, ShortlistUseCase};
use crate::domain::MarketplaceStore;
use crate::domain::entity::ServiceDraft;
use crate::domain::repository::ServiceQuery;
use crate::error::MarketplaceResult;
use crate::presentation::dto::{
    CategoryResponse, CreateCategoryRequest, ListServicesQuery, ServiceRequest, ServiceResponse,
};

fn draft(req: ServiceRequest) -> MarketplaceResult<ServiceDraft> {
    ServiceDraft::new(
        req.category_id,
        &req.title,
        &req.description,
        req.price_cents,
        req.delivery_days,
    )
}

// ============================================================================
// Categories
// ============================================================================

/// GET /api/categories
pub async fn list_categories<R>(
    State(state): State<MarketplaceAppState<R>>,
) -> MarketplaceResult<Json<Vec<CategoryResponse>>>
where
    R: MarketplaceStore,
{
    let categories = CategoryUseCase::new(state.repo.clone()).list().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

/// POST /api/categories
pub async fn create_category<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreateCategoryRequest>,
) -> MarketplaceResult<impl IntoResponse>
where
    R: MarketplaceStore,
{
    let category = CategoryUseCase::new(state.repo.clone())
        .create(&identity, &req.name, &req.slug)
        .await?;
    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

// ============================================================================
// Services
// ============================================================================

/// GET /api/services
pub async fn list_services<R>(
    State(state): State<MarketplaceAppState<R>>,
    Query(query): Query<ListServicesQuery>,
) -> MarketplaceResult<Json<Page<ServiceResponse>>>
where
    R: MarketplaceStore,
{
    let use_case = ServiceUseCase::new(state.repo.clone(), state.config.clone());
    let filter = ServiceQuery {
        category_id: query.category,
        search: query.search.clone(),
        ..Default::default()
    };
    let page = use_case.list(filter, query.page()).await?;
    Ok(Json(page.map(Into::into)))
}

/// GET /api/services/{id}
///
/// Public, but the owner and moderators can also see a paused listing.
pub async fn get_service<R>(
    State(state): State<MarketplaceAppState<R>>,
    viewer: Option<Extension<Identity>>,
    Path(id): Path<ServiceId>,
) -> MarketplaceResult<Json<ServiceResponse>>
where
    R: MarketplaceStore,
{
    let use_case = ServiceUseCase::new(state.repo.clone(), state.config.clone());
    let viewer = viewer.map(|Extension(identity)| identity);
    let service = use_case.get(viewer.as_ref(), id).await?;
    Ok(Json(service.into()))
}

/// POST /api/services
pub async fn create_service<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<ServiceRequest>,
) -> MarketplaceResult<impl IntoResponse>
where
    R: MarketplaceStore,
{
    let use_case = ServiceUseCase::new(state.repo.clone(), state.config.clone());
    let service = use_case.create(&identity, draft(req)?).await?;
    Ok((StatusCode::CREATED, Json(ServiceResponse::from(service))))
}

/// PUT /api/services/{id}
pub async fn update_service<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<ServiceId>,
    Json(req): Json<ServiceRequest>,
) -> MarketplaceResult<Json<ServiceResponse>>
where
    R: MarketplaceStore,
{
    let use_case = ServiceUseCase::new(state.repo.clone(), state.config.clone());
    let service = use_case.update(&identity, id, draft(req)?).await?;
    Ok(Json(service.into()))
}

/// POST /api/services/{id}/pause
pub async fn pause_service<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<ServiceId>,
) -> MarketplaceResult<Json<ServiceResponse>>
where
    R: MarketplaceStore,
{
    let use_case = ServiceUseCase::new(state.repo.clone(), state.config.clone());
    let service = use_case.set_paused(&identity, id, true).await?;
    Ok(Json(service.into()))
}

/// POST /api/services/{id}/activate
pub async fn activate_service<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<ServiceId>,
) -> MarketplaceResult<Json<ServiceResponse>>
where
    R: MarketplaceStore,
{
    let use_case = ServiceUseCase::new(state.repo.clone(), state.config.clone());
    let service = use_case.set_paused(&identity, id, false).await?;
    Ok(Json(service.into()))
}

/// DELETE /api/services/{id}
pub async fn delete_service<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<ServiceId>,
) -> MarketplaceResult<StatusCode>
where
    R: MarketplaceStore,
{
    let use_case = ServiceUseCase::new(state.repo.clone(), state.config.clone());
    use_case.delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/me/services
pub async fn my_services<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Query(page): Query<PageRequest>,
) -> MarketplaceResult<Json<Page<ServiceResponse>>>
where
    R: MarketplaceStore,
{
    let use_case = ServiceUseCase::new(state.repo.clone(), state.config.clone());
    let page = use_case.mine(&identity, page.normalized()).await?;
    Ok(Json(page.map(Into::into)))
}

// ============================================================================
// Shortlist
// ============================================================================

/// GET /api/shortlist
pub async fn list_shortlist<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
) -> MarketplaceResult<Json<Vec<ServiceResponse>>>
where
    R: MarketplaceStore,
{
    let services = ShortlistUseCase::new(state.repo.clone())
        .list(&identity)
        .await?;
    Ok(Json(services.into_iter().map(Into::into).collect()))
}

/// PUT /api/shortlist/{service_id}
pub async fn add_to_shortlist<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(service_id): Path<ServiceId>,
) -> MarketplaceResult<StatusCode>
where
    R: MarketplaceStore,
{
    ShortlistUseCase::new(state.repo.clone())
        .add(&identity, service_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/shortlist/{service_id}
pub async fn remove_from_shortlist<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(service_id): Path<ServiceId>,
) -> MarketplaceResult<StatusCode>
where
    R: MarketplaceStore,
{
    ShortlistUseCase::new(state.repo.clone())
        .remove(&identity, service_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
