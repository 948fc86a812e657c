//! Marketplace Router
//!
//! Paths are absolute (`/api/...`) so the router can be merged next to the
//! nested auth and payments routers.

use auth::config::AuthConfig;
use auth::middleware::{SessionLayerState, attach_identity, require_identity, require_moderator};
use auth::store::SessionStore;
use auth::RedisSessionStore;
use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use std::sync::Arc;

use crate::application::config::MarketplaceConfig;
use crate::domain::MarketplaceStore;
use crate::infra::postgres::PgMarketplaceRepository;
use crate::presentation::handlers::{
    MarketplaceAppState, account, admin, catalogue, inbox, orders, projects,
};

/// Marketplace routes with the PostgreSQL repository and Redis sessions
pub fn marketplace_router(
    repo: PgMarketplaceRepository,
    sessions: RedisSessionStore,
    auth_config: Arc<AuthConfig>,
    config: MarketplaceConfig,
) -> Router {
    marketplace_router_generic(
        Arc::new(repo),
        Arc::new(sessions),
        auth_config,
        Arc::new(config),
    )
}

/// Marketplace routes for any store implementation
pub fn marketplace_router_generic<R, S>(
    repo: Arc<R>,
    sessions: Arc<S>,
    auth_config: Arc<AuthConfig>,
    config: Arc<MarketplaceConfig>,
) -> Router
where
    R: MarketplaceStore,
    S: SessionStore + Clone + Send + Sync + 'static,
{
    let layer_state = SessionLayerState::new(sessions, auth_config);
    let state = MarketplaceAppState { repo, config };

    let public = Router::new()
        .route("/api/categories", get(catalogue::list_categories::<R>))
        .route("/api/services", get(catalogue::list_services::<R>))
        .route("/api/services/{id}", get(catalogue::get_service::<R>))
        .route("/api/projects", get(projects::list_projects::<R>))
        .route("/api/projects/{id}", get(projects::get_project::<R>))
        .route_layer(middleware::from_fn_with_state(
            layer_state.clone(),
            attach_identity::<S>,
        ));

    let protected = Router::new()
        // Catalogue
        .route("/api/categories", post(catalogue::create_category::<R>))
        .route("/api/services", post(catalogue::create_service::<R>))
        .route(
            "/api/services/{id}",
            put(catalogue::update_service::<R>).delete(catalogue::delete_service::<R>),
        )
        .route("/api/services/{id}/pause", post(catalogue::pause_service::<R>))
        .route(
            "/api/services/{id}/activate",
            post(catalogue::activate_service::<R>),
        )
        .route("/api/services/{id}/order", post(orders::order_service::<R>))
        .route("/api/me/services", get(catalogue::my_services::<R>))
        .route("/api/shortlist", get(catalogue::list_shortlist::<R>))
        .route(
            "/api/shortlist/{service_id}",
            put(catalogue::add_to_shortlist::<R>).delete(catalogue::remove_from_shortlist::<R>),
        )
        // Projects and bids
        .route("/api/projects", post(projects::create_project::<R>))
        .route("/api/projects/{id}", put(projects::update_project::<R>))
        .route("/api/projects/{id}/cancel", post(projects::cancel_project::<R>))
        .route(
            "/api/projects/{id}/bids",
            get(projects::list_bids::<R>).post(projects::place_bid::<R>),
        )
        .route("/api/bids/{id}/withdraw", post(projects::withdraw_bid::<R>))
        .route("/api/bids/{id}/accept", post(projects::accept_bid::<R>))
        .route("/api/me/projects", get(projects::my_projects::<R>))
        .route("/api/me/bids", get(projects::my_bids::<R>))
        // Orders
        .route("/api/orders", get(orders::list_orders::<R>))
        .route("/api/orders/{id}", get(orders::get_order::<R>))
        .route("/api/orders/{id}/milestones", post(orders::add_milestone::<R>))
        .route("/api/orders/{id}/deliver", post(orders::deliver_order::<R>))
        .route("/api/orders/{id}/revision", post(orders::request_revision::<R>))
        .route("/api/orders/{id}/complete", post(orders::complete_order::<R>))
        .route("/api/orders/{id}/cancel", post(orders::cancel_order::<R>))
        .route("/api/orders/{id}/dispute", post(orders::dispute_order::<R>))
        // Messages and notifications
        .route(
            "/api/messages",
            get(inbox::inbox::<R>).post(inbox::send_message::<R>),
        )
        .route("/api/messages/{user_id}", get(inbox::conversation::<R>))
        .route(
            "/api/notifications",
            get(inbox::list_notifications::<R>).post(inbox::update_notifications::<R>),
        )
        // Account
        .route(
            "/api/outsourcing",
            get(account::my_outsourcing::<R>).post(account::submit_outsourcing::<R>),
        )
        .route("/api/subscription", get(account::my_subscription::<R>))
        .route("/api/transactions", get(account::my_transactions::<R>))
        .route_layer(middleware::from_fn_with_state(
            layer_state.clone(),
            require_identity::<S>,
        ));

    // Layers run outermost-last: identity first, then the role check
    let moderation = Router::new()
        .route(
            "/api/admin/services/{id}/remove",
            post(admin::remove_service::<R>),
        )
        .route(
            "/api/admin/orders/{id}/resolve",
            post(admin::resolve_dispute::<R>),
        )
        .route("/api/admin/outsourcing", get(admin::list_outsourcing::<R>))
        .route(
            "/api/admin/outsourcing/{id}/review",
            post(admin::review_outsourcing::<R>),
        )
        .route("/api/admin/stats", get(admin::platform_stats::<R>))
        .route_layer(middleware::from_fn(require_moderator))
        .route_layer(middleware::from_fn_with_state(
            layer_state,
            require_identity::<S>,
        ));

    public.merge(protected).merge(moderation).with_state(state)
}
