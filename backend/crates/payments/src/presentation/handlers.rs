//! HTTP Handlers

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use auth::Identity;
use axum::Extension;
use axum::Json;
use axum::body::{Body, to_bytes};
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use marketplace::models::PaymentProvider;
use platform::client::extract_client_ip;

use crate::application::config::PaymentsConfig;
use crate::application::initiate::InitiatePaymentUseCase;
use crate::application::redirect::{ReturnOutcome, return_path};
use crate::application::webhook::{HandleWebhookUseCase, WebhookOutcome};
use crate::domain::PaymentStore;
use crate::domain::gateway::{BuyerContact, Checkout, WebhookContext};
use crate::domain::notification::WebhookPayload;
use crate::error::{PaymentError, PaymentResult};
use crate::infra::Gateways;
use crate::presentation::dto::{
    InitiatePaymentRequest, InitiatePaymentResponse, SubscribeRequest, WebhookAck,
};

/// Gateways post a few kilobytes at most
const MAX_WEBHOOK_BYTES: usize = 64 * 1024;

/// Shared state for payment handlers
pub struct PaymentsAppState<R>
where
    R: PaymentStore,
{
    pub repo: Arc<R>,
    pub gateways: Arc<Gateways>,
    pub config: Arc<PaymentsConfig>,
}

impl<R> Clone for PaymentsAppState<R>
where
    R: PaymentStore,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            gateways: self.gateways.clone(),
            config: self.config.clone(),
        }
    }
}

fn provider(gateway: &str) -> PaymentResult<PaymentProvider> {
    gateway
        .parse()
        .map_err(|_| PaymentError::UnknownGateway(gateway.to_string()))
}

fn redirect_to_gateway<R>(
    state: &PaymentsAppState<R>,
    provider: PaymentProvider,
    checkout: Checkout,
    identity: &Identity,
) -> PaymentResult<Json<InitiatePaymentResponse>>
where
    R: PaymentStore,
{
    let redirect_url = state.gateways.initiate(
        provider,
        &checkout,
        &BuyerContact::from(identity),
        &state.config.public_base_url,
    )?;
    tracing::info!(
        provider = %provider,
        reference = %checkout.reference,
        amount = %checkout.amount,
        user_id = %identity.user_id,
        "Payment initiated"
    );
    Ok(Json(InitiatePaymentResponse {
        success: true,
        redirect_url,
        reference: checkout.reference,
    }))
}

// ============================================================================
// Initiation
// ============================================================================

/// POST /api/payments/{gateway}/initiate
pub async fn initiate_order_payment<R>(
    State(state): State<PaymentsAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(gateway): Path<String>,
    Json(req): Json<InitiatePaymentRequest>,
) -> PaymentResult<Json<InitiatePaymentResponse>>
where
    R: PaymentStore,
{
    let provider = provider(&gateway)?;
    let checkout = InitiatePaymentUseCase::new(state.repo.clone())
        .order_checkout(&identity, req.order_id, req.milestone_id)
        .await?;
    redirect_to_gateway(&state, provider, checkout, &identity)
}

/// POST /api/payments/{gateway}/subscribe
pub async fn subscribe<R>(
    State(state): State<PaymentsAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(gateway): Path<String>,
    Json(req): Json<SubscribeRequest>,
) -> PaymentResult<Json<InitiatePaymentResponse>>
where
    R: PaymentStore,
{
    let provider = provider(&gateway)?;
    let checkout =
        InitiatePaymentUseCase::new(state.repo.clone()).subscription_checkout(&identity, req.plan)?;
    redirect_to_gateway(&state, provider, checkout, &identity)
}

// ============================================================================
// Browser returns
// ============================================================================

/// GET /api/payments/{gateway}/{success|cancel|error}
pub async fn payment_return(
    Path((gateway, outcome)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> PaymentResult<Redirect> {
    let provider = provider(&gateway)?;
    let outcome: ReturnOutcome = outcome
        .parse()
        .map_err(|_| PaymentError::NotFound("Page"))?;

    let target = return_path(outcome, &query);
    tracing::debug!(provider = %provider, outcome = %outcome, target = %target, "Payment return");
    Ok(Redirect::to(&target))
}

// ============================================================================
// Webhooks
// ============================================================================

/// Read the form body and the caller's address; `None` when the body is
/// unreadable or over [`MAX_WEBHOOK_BYTES`].
///
/// The body is kept as bytes so PayFast's field order survives.
async fn read_webhook(
    provider: PaymentProvider,
    request: Request<Body>,
) -> Option<(WebhookPayload, WebhookContext)> {
    let direct_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let source_ip = extract_client_ip(request.headers(), direct_ip);

    let body = match to_bytes(request.into_body(), MAX_WEBHOOK_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(
                provider = %provider,
                source_ip = ?source_ip,
                error = %e,
                "Unreadable webhook body acknowledged without processing"
            );
            return None;
        }
    };

    Some((WebhookPayload::from_form(&body), WebhookContext { source_ip }))
}

async fn handle_webhook<R>(
    state: &PaymentsAppState<R>,
    provider: PaymentProvider,
    request: Request<Body>,
) -> Result<(), Response>
where
    R: PaymentStore,
{
    // Gateways retry anything but a success; an unreadable body never improves
    let Some((payload, context)) = read_webhook(provider, request).await else {
        return Ok(());
    };
    match HandleWebhookUseCase::new(state.repo.clone(), state.gateways.clone())
        .execute(provider, &payload, &context)
        .await
    {
        WebhookOutcome::Rejected(_) => Err(StatusCode::BAD_REQUEST.into_response()),
        WebhookOutcome::Acknowledged(_) => Ok(()),
    }
}

/// POST /api/webhooks/payfast
///
/// PayFast expects a bare 200 with `OK`.
pub async fn payfast_webhook<R>(
    State(state): State<PaymentsAppState<R>>,
    request: Request<Body>,
) -> Response
where
    R: PaymentStore,
{
    match handle_webhook(&state, PaymentProvider::PayFast, request).await {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(rejection) => rejection,
    }
}

/// POST /api/webhooks/ozow
pub async fn ozow_webhook<R>(
    State(state): State<PaymentsAppState<R>>,
    request: Request<Body>,
) -> Response
where
    R: PaymentStore,
{
    match handle_webhook(&state, PaymentProvider::Ozow, request).await {
        Ok(()) => Json(WebhookAck { success: true }).into_response(),
        Err(rejection) => rejection,
    }
}
