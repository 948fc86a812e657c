use auth::Identity;
use axum::Extension;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use kernel::id::{OrderId, ServiceId};
use kernel::pagination::Page;

use super::MarketplaceAppState;
use crate::application::OrderUseCase;
use crate::domain::MarketplaceStore;
use crate::error::MarketplaceResult;
use crate::presentation::dto::{
    AddMilestoneRequest, DeliverRequest, DisputeRequest, ListOrdersQuery, MilestoneResponse,
    OrderDetailResponse, OrderResponse, OrderServiceRequest,
};

/// POST /api/services/{id}/order
///
/// The order starts in `awaiting_payment`; escrow funding moves it on.
pub async fn order_service<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(service_id): Path<ServiceId>,
    Json(req): Json<OrderServiceRequest>,
) -> MarketplaceResult<impl IntoResponse>
where
    R: MarketplaceStore,
{
    let order = OrderUseCase::new(state.repo.clone())
        .order_service(&identity, service_id, req.requirements)
        .await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

/// GET /api/orders?role=buyer|seller|any
pub async fn list_orders<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListOrdersQuery>,
) -> MarketplaceResult<Json<Page<OrderResponse>>>
where
    R: MarketplaceStore,
{
    let page = OrderUseCase::new(state.repo.clone())
        .list(&identity, query.role, query.page())
        .await?;
    Ok(Json(page.map(Into::into)))
}

/// GET /api/orders/{id}
pub async fn get_order<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<OrderId>,
) -> MarketplaceResult<Json<OrderDetailResponse>>
where
    R: MarketplaceStore,
{
    let (order, milestones) = OrderUseCase::new(state.repo.clone())
        .get(&identity, id)
        .await?;
    Ok(Json(OrderDetailResponse {
        order: order.into(),
        milestones: milestones.into_iter().map(Into::into).collect(),
    }))
}

/// POST /api/orders/{id}/milestones
pub async fn add_milestone<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<OrderId>,
    Json(req): Json<AddMilestoneRequest>,
) -> MarketplaceResult<impl IntoResponse>
where
    R: MarketplaceStore,
{
    let milestone = OrderUseCase::new(state.repo.clone())
        .add_milestone(&identity, id, &req.title, req.amount_cents)
        .await?;
    Ok((StatusCode::CREATED, Json(MilestoneResponse::from(milestone))))
}

// ============================================================================
// Lifecycle
// ============================================================================

/// POST /api/orders/{id}/deliver
pub async fn deliver_order<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<OrderId>,
    Json(req): Json<DeliverRequest>,
) -> MarketplaceResult<Json<OrderResponse>>
where
    R: MarketplaceStore,
{
    let order = OrderUseCase::new(state.repo.clone())
        .deliver(&identity, id, &req.message)
        .await?;
    Ok(Json(order.into()))
}

/// POST /api/orders/{id}/revision
pub async fn request_revision<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<OrderId>,
) -> MarketplaceResult<Json<OrderResponse>>
where
    R: MarketplaceStore,
{
    let order = OrderUseCase::new(state.repo.clone())
        .request_revision(&identity, id)
        .await?;
    Ok(Json(order.into()))
}

/// POST /api/orders/{id}/complete
pub async fn complete_order<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<OrderId>,
) -> MarketplaceResult<Json<OrderResponse>>
where
    R: MarketplaceStore,
{
    let order = OrderUseCase::new(state.repo.clone())
        .complete(&identity, id)
        .await?;
    Ok(Json(order.into()))
}

/// POST /api/orders/{id}/cancel
pub async fn cancel_order<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<OrderId>,
) -> MarketplaceResult<Json<OrderResponse>>
where
    R: MarketplaceStore,
{
    let order = OrderUseCase::new(state.repo.clone())
        .cancel(&identity, id)
        .await?;
    Ok(Json(order.into()))
}

/// POST /api/orders/{id}/dispute
pub async fn dispute_order<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<OrderId>,
    Json(req): Json<DisputeRequest>,
) -> MarketplaceResult<Json<OrderResponse>>
where
    R: MarketplaceStore,
{
    let order = OrderUseCase::new(state.repo.clone())
        .dispute(&identity, id, &req.reason)
        .await?;
    Ok(Json(order.into()))
}
