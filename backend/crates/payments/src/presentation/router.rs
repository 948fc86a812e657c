//! Payments Router
//!
//! Paths are absolute so the router merges next to the marketplace routes.
//! Webhooks and browser returns are public; initiation needs a session.

use std::sync::Arc;

use auth::RedisSessionStore;
use auth::config::AuthConfig;
use auth::middleware::{SessionLayerState, require_identity};
use auth::store::SessionStore;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use marketplace::PgMarketplaceRepository;

use crate::application::config::PaymentsConfig;
use crate::domain::PaymentStore;
use crate::infra::Gateways;
use crate::presentation::handlers::{self, PaymentsAppState};

/// Payment routes with the PostgreSQL store and Redis sessions
pub fn payments_router(
    repo: PgMarketplaceRepository,
    sessions: RedisSessionStore,
    auth_config: Arc<AuthConfig>,
    config: PaymentsConfig,
) -> Router {
    payments_router_generic(Arc::new(repo), Arc::new(sessions), auth_config, config)
}

/// Payment routes for any store implementation
pub fn payments_router_generic<R, S>(
    repo: Arc<R>,
    sessions: Arc<S>,
    auth_config: Arc<AuthConfig>,
    config: PaymentsConfig,
) -> Router
where
    R: PaymentStore,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let state = PaymentsAppState {
        repo,
        gateways: Arc::new(Gateways::new(&config)),
        config: Arc::new(config),
    };
    let layer_state = SessionLayerState::new(sessions, auth_config);

    let public = Router::new()
        .route(
            "/api/payments/{gateway}/{outcome}",
            get(handlers::payment_return),
        )
        .route("/api/webhooks/payfast", post(handlers::payfast_webhook::<R>))
        .route("/api/webhooks/ozow", post(handlers::ozow_webhook::<R>));

    let protected = Router::new()
        .route(
            "/api/payments/{gateway}/initiate",
            post(handlers::initiate_order_payment::<R>),
        )
        .route(
            "/api/payments/{gateway}/subscribe",
            post(handlers::subscribe::<R>),
        )
        .route_layer(middleware::from_fn_with_state(
            layer_state,
            require_identity::<S>,
        ));

    public.merge(protected).with_state(state)
}
