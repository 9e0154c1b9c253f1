//! Notification endpoints.
//!
//! Notifications are private to their recipient: the actor in the query or
//! body is the only member whose inbox is touched.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{success, ActorQuery, ApiResult};
use crate::models::{MarkReadRequest, Notification, UnreadCount};
use crate::AppState;

/// GET /api/notifications - The actor's inbox, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<Vec<Notification>> {
    let snapshot = state.repo.snapshot().await?;
    snapshot.org.get(&query.actor)?;
    let notifications = state.repo.list_notifications(&query.actor).await?;
    success(notifications)
}

/// GET /api/notifications/unread-count - How many are unread.
pub async fn unread_count(
    State(state): State<AppState>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<UnreadCount> {
    let snapshot = state.repo.snapshot().await?;
    snapshot.org.get(&query.actor)?;
    let count = state.repo.unread_count(&query.actor).await?;
    success(UnreadCount { count })
}

/// POST /api/notifications/{id}/read - Mark one notification read.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<MarkReadRequest>,
) -> ApiResult<()> {
    state.repo.mark_read(&request.actor_id, &id).await?;
    success(())
}

/// POST /api/notifications/read-all - Mark the whole inbox read.
pub async fn mark_all_read(
    State(state): State<AppState>,
    Json(request): Json<MarkReadRequest>,
) -> ApiResult<UnreadCount> {
    let flipped = state.repo.mark_all_read(&request.actor_id).await?;
    success(UnreadCount { count: flipped })
}
