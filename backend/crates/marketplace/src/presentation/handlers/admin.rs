//! Moderator endpoints. The router puts `require_moderator` in front of
//! all of them; stats additionally need the admin role.

use auth::Identity;
use axum::Extension;
use axum::Json;
use axum::extract::{Path, Query, State};
use kernel::id::{OrderId, OutsourcingRequestId, ServiceId};
use kernel::pagination::Page;

use super::MarketplaceAppState;
use crate::application::{MarketplaceModerationUseCase, OutsourcingUseCase};
use crate::domain::MarketplaceStore;
use crate::domain::repository::PlatformStats;
use crate::error::MarketplaceResult;
use crate::presentation::dto::{
    ListOutsourcingQuery, OrderResponse, OutsourcingResponse, RemoveServiceRequest,
    ResolveDisputeRequest, ReviewOutsourcingRequest, ServiceResponse,
};

/// POST /api/admin/services/{id}/remove
pub async fn remove_service<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<ServiceId>,
    Json(req): Json<RemoveServiceRequest>,
) -> MarketplaceResult<Json<ServiceResponse>>
where
    R: MarketplaceStore,
{
    let service = MarketplaceModerationUseCase::new(state.repo.clone())
        .remove_service(&identity, id, &req.reason)
        .await?;
    Ok(Json(service.into()))
}

/// POST /api/admin/orders/{id}/resolve
pub async fn resolve_dispute<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<OrderId>,
    Json(req): Json<ResolveDisputeRequest>,
) -> MarketplaceResult<Json<OrderResponse>>
where
    R: MarketplaceStore,
{
    let order = MarketplaceModerationUseCase::new(state.repo.clone())
        .resolve_dispute(&identity, id, req.outcome, req.note)
        .await?;
    Ok(Json(order.into()))
}

/// GET /api/admin/outsourcing?status=
pub async fn list_outsourcing<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListOutsourcingQuery>,
) -> MarketplaceResult<Json<Page<OutsourcingResponse>>>
where
    R: MarketplaceStore,
{
    let page = OutsourcingUseCase::new(state.repo.clone())
        .list(&identity, query.status, query.page())
        .await?;
    Ok(Json(page.map(Into::into)))
}

/// POST /api/admin/outsourcing/{id}/review
pub async fn review_outsourcing<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<OutsourcingRequestId>,
    Json(req): Json<ReviewOutsourcingRequest>,
) -> MarketplaceResult<Json<OutsourcingResponse>>
where
    R: MarketplaceStore,
{
    let request = OutsourcingUseCase::new(state.repo.clone())
        .review(&identity, id, req.status, req.notes)
        .await?;
    Ok(Json(request.into()))
}

/// GET /api/admin/stats
pub async fn platform_stats<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
) -> MarketplaceResult<Json<PlatformStats>>
where
    R: MarketplaceStore,
{
    let stats = MarketplaceModerationUseCase::new(state.repo.clone())
        .platform_stats(&identity)
        .await?;
    Ok(Json(stats))
}
