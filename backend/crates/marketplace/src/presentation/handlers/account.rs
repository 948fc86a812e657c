use auth::Identity;
use axum::Extension;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use kernel::pagination::{Page, PageRequest};

use super::MarketplaceAppState;
use crate::application::{BillingUseCase, OutsourcingUseCase};
use crate::domain::MarketplaceStore;
use crate::error::MarketplaceResult;
use crate::presentation::dto::{
    OutsourcingRequestBody, OutsourcingResponse, SubscriptionResponse, TransactionResponse,
};

/// POST /api/outsourcing
pub async fn submit_outsourcing<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<OutsourcingRequestBody>,
) -> MarketplaceResult<impl IntoResponse>
where
    R: MarketplaceStore,
{
    let request = OutsourcingUseCase::new(state.repo.clone())
        .submit(&identity, &req.title, &req.description, req.budget_cents)
        .await?;
    Ok((StatusCode::CREATED, Json(OutsourcingResponse::from(request))))
}

/// GET /api/outsourcing
pub async fn my_outsourcing<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Query(page): Query<PageRequest>,
) -> MarketplaceResult<Json<Page<OutsourcingResponse>>>
where
    R: MarketplaceStore,
{
    let page = OutsourcingUseCase::new(state.repo.clone())
        .mine(&identity, page.normalized())
        .await?;
    Ok(Json(page.map(Into::into)))
}

/// GET /api/subscription
pub async fn my_subscription<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
) -> MarketplaceResult<Json<SubscriptionResponse>>
where
    R: MarketplaceStore,
{
    let view = BillingUseCase::new(state.repo.clone(), state.config.clone())
        .my_subscription(&identity)
        .await?;
    Ok(Json(view.into()))
}

/// GET /api/transactions
pub async fn my_transactions<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Query(page): Query<PageRequest>,
) -> MarketplaceResult<Json<Page<TransactionResponse>>>
where
    R: MarketplaceStore,
{
    let page = BillingUseCase::new(state.repo.clone(), state.config.clone())
        .my_transactions(&identity, page.normalized())
        .await?;
    Ok(Json(page.map(Into::into)))
}
