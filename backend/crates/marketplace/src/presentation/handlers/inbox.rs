//! Messages and notifications

use auth::Identity;
use axum::Extension;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::id::UserId;
use kernel::pagination::{Page, PageRequest};

use super::MarketplaceAppState;
use crate::application::{MessageUseCase, NotificationUseCase};
use crate::domain::MarketplaceStore;
use crate::error::{MarketplaceError, MarketplaceResult};
use crate::presentation::dto::{
    ConversationResponse, MarkedReadResponse, MessageResponse, NotificationAction,
    NotificationActionRequest, NotificationResponse, NotificationsQuery, SendMessageRequest,
    UnreadCountResponse,
};

// ============================================================================
// Messages
// ============================================================================

/// POST /api/messages
pub async fn send_message<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<SendMessageRequest>,
) -> MarketplaceResult<impl IntoResponse>
where
    R: MarketplaceStore,
{
    let message = MessageUseCase::new(state.repo.clone())
        .send(&identity, req.recipient_id, &req.body, req.order_id)
        .await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

/// GET /api/messages
pub async fn inbox<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
) -> MarketplaceResult<Json<Vec<ConversationResponse>>>
where
    R: MarketplaceStore,
{
    let conversations = MessageUseCase::new(state.repo.clone())
        .inbox(&identity)
        .await?;
    Ok(Json(conversations.into_iter().map(Into::into).collect()))
}

/// GET /api/messages/{user_id}
pub async fn conversation<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Path(other_id): Path<UserId>,
    Query(page): Query<PageRequest>,
) -> MarketplaceResult<Json<Page<MessageResponse>>>
where
    R: MarketplaceStore,
{
    let page = MessageUseCase::new(state.repo.clone())
        .conversation(&identity, other_id, page.normalized())
        .await?;
    Ok(Json(page.map(Into::into)))
}

// ============================================================================
// Notifications
// ============================================================================

/// GET /api/notifications
///
/// `?count=true` returns only the unread count.
pub async fn list_notifications<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<NotificationsQuery>,
) -> MarketplaceResult<Response>
where
    R: MarketplaceStore,
{
    let use_case = NotificationUseCase::new(state.repo.clone());
    if query.count {
        let count = use_case.unread_count(&identity).await?;
        return Ok(Json(UnreadCountResponse { count }).into_response());
    }

    let page = use_case.list(&identity, query.page()).await?;
    Ok(Json(page.map(NotificationResponse::from)).into_response())
}

/// POST /api/notifications
pub async fn update_notifications<R>(
    State(state): State<MarketplaceAppState<R>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<NotificationActionRequest>,
) -> MarketplaceResult<Json<MarkedReadResponse>>
where
    R: MarketplaceStore,
{
    let use_case = NotificationUseCase::new(state.repo.clone());
    let marked = match req.action {
        NotificationAction::MarkRead => {
            let id = req.notification_id.ok_or_else(|| {
                MarketplaceError::validation("notificationId is required for mark_read")
            })?;
            use_case.mark_read(&identity, id).await?;
            1
        }
        NotificationAction::MarkAllRead => use_case.mark_all_read(&identity).await?,
    };
    Ok(Json(MarkedReadResponse {
        success: true,
        marked,
    }))
}
