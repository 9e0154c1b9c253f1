//! Member API endpoints: registration, profile, hierarchy placement.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;

use super::{require, success, ActorQuery, ApiResult};
use crate::errors::AppError;
use crate::hierarchy::PATH_SEP;
use crate::models::{
    ActorRequest, Member, Notification, RegisterMemberRequest, ReparentRequest,
    UpdateMemberRequest,
};
use crate::notify::{NotificationKind, RecipientResolver};
use crate::permissions::AccessLevel;
use crate::AppState;

/// POST /api/members - Register a new member into the hierarchy.
///
/// Registering a root requires Admin; registering under a parent requires
/// edit rights on that parent. The very first member bootstraps the
/// organization and is exempt from the gate.
pub async fn register_member(
    State(state): State<AppState>,
    Json(request): Json<RegisterMemberRequest>,
) -> ApiResult<Member> {
    if request.id.trim().is_empty() || request.id.contains(PATH_SEP) {
        return Err(AppError::Validation(
            "Member id must be non-empty and must not contain '/'".to_string(),
        ));
    }
    if request.display_name.trim().is_empty() {
        return Err(AppError::Validation(
            "Display name is required".to_string(),
        ));
    }

    let _structural = state.org_lock.lock().await;
    let mut snapshot = state.repo.snapshot().await?;
    let bootstrap = snapshot.org.is_empty();
    if !bootstrap {
        let resolver = snapshot.resolver(&state.policy);
        match request.parent_id.as_deref() {
            Some(parent) => require(
                resolver.can_edit(&request.actor_id, parent)?,
                "register a member under this parent",
            )?,
            None => require(
                snapshot.org.get(&request.actor_id)?.access_level == AccessLevel::Admin,
                "register a root member",
            )?,
        }
        // No granting a level above one's own.
        require(
            request.access_level >= snapshot.org.get(&request.actor_id)?.access_level,
            "register a member more privileged than yourself",
        )?;
    }

    let placement = snapshot.org.insert(
        request.id.clone(),
        request.display_name.clone(),
        request.access_level,
        request.parent_id.as_deref(),
    )?;
    let member = state
        .repo
        .create_member(
            &placement,
            &request.display_name,
            request.email.as_deref(),
            request.access_level,
        )
        .await?;

    if !bootstrap {
        let resolver = snapshot.resolver(&state.policy);
        let recipients =
            RecipientResolver::new(&resolver).recipients_for(&request.actor_id, &request.id)?;
        let message = format!("{} joined the organization", request.display_name);
        let notifications = build_notifications(
            recipients,
            NotificationKind::MemberRegistered,
            &request.id,
            &message,
        );
        state.repo.create_notifications(&notifications).await?;
    }

    tracing::info!(member = %request.id, "member registered");
    success(member)
}

/// GET /api/members - List the members the actor may view.
pub async fn list_members(
    State(state): State<AppState>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<Vec<Member>> {
    let snapshot = state.repo.snapshot().await?;
    let viewable = snapshot.resolver(&state.policy).viewable_members(&query.actor)?;
    let members = state
        .repo
        .list_members()
        .await?
        .into_iter()
        .filter(|m| viewable.contains(&m.id))
        .collect();
    success(members)
}

/// GET /api/members/{id} - Get a single member.
pub async fn get_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<Member> {
    let snapshot = state.repo.snapshot().await?;
    require(
        snapshot.resolver(&state.policy).can_view(&query.actor, &id)?,
        "view this member",
    )?;
    let member = state
        .repo
        .get_member(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))?;
    success(member)
}

/// PUT /api/members/{id} - Update a member's profile.
pub async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateMemberRequest>,
) -> ApiResult<Member> {
    let snapshot = state.repo.snapshot().await?;
    require(
        snapshot.resolver(&state.policy).can_edit(&request.actor_id, &id)?,
        "edit this member",
    )?;
    if let Some(level) = request.access_level {
        require(
            level >= snapshot.org.get(&request.actor_id)?.access_level,
            "grant a level above your own",
        )?;
    }
    let member = state
        .repo
        .update_member(
            &id,
            request.display_name.as_deref(),
            request.email.as_deref(),
            request.access_level,
            request.active,
        )
        .await?;
    success(member)
}

/// PUT /api/members/{id}/parent - Move a member under a new superior.
///
/// Requires edit rights on the member and on the new parent; moving a member
/// to the root level is Admin-only. Descendant paths follow in the same
/// transaction.
pub async fn reparent_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ReparentRequest>,
) -> ApiResult<Member> {
    let _structural = state.org_lock.lock().await;
    let mut snapshot = state.repo.snapshot().await?;
    {
        let resolver = snapshot.resolver(&state.policy);
        require(resolver.can_edit(&request.actor_id, &id)?, "move this member")?;
        match request.parent_id.as_deref() {
            Some(parent) => require(
                resolver.can_edit(&request.actor_id, parent)?,
                "place a member under this parent",
            )?,
            None => require(
                snapshot.org.get(&request.actor_id)?.access_level == AccessLevel::Admin,
                "move a member to the root level",
            )?,
        }
    }

    let updates = snapshot.org.attach(&id, request.parent_id.as_deref())?;
    state.repo.apply_reparent(&updates).await?;

    let member = state
        .repo
        .get_member(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))?;
    tracing::info!(member = %id, parent = ?request.parent_id, moved = updates.len(), "member reparented");
    success(member)
}

/// DELETE /api/members/{id} - Remove a member.
///
/// Their direct reports are reattached to the removed member's superior.
pub async fn delete_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> ApiResult<()> {
    let _structural = state.org_lock.lock().await;
    let mut snapshot = state.repo.snapshot().await?;
    require(
        snapshot.resolver(&state.policy).can_edit(&request.actor_id, &id)?,
        "delete this member",
    )?;
    if request.actor_id == id {
        return Err(AppError::Validation(
            "Members cannot delete themselves".to_string(),
        ));
    }

    let updates = snapshot.org.remove_and_reconnect(&id)?;
    state.repo.delete_member(&id, &updates).await?;
    tracing::info!(member = %id, reattached = updates.len(), "member deleted");
    success(())
}

/// GET /api/members/{id}/subtree - The member and everyone below them,
/// limited to what the actor may view.
pub async fn member_subtree(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<Vec<Member>> {
    let snapshot = state.repo.snapshot().await?;
    let resolver = snapshot.resolver(&state.policy);
    require(resolver.can_view(&query.actor, &id)?, "view this member")?;

    let viewable = resolver.viewable_members(&query.actor)?;
    let subtree: std::collections::HashSet<String> = snapshot
        .org
        .subtree_of(&id)?
        .into_iter()
        .map(|n| n.id.clone())
        .collect();
    let members = state
        .repo
        .list_members()
        .await?
        .into_iter()
        .filter(|m| subtree.contains(&m.id) && viewable.contains(&m.id))
        .collect();
    success(members)
}

/// GET /api/members/{id}/ancestors - The member's chain of command,
/// nearest superior first.
pub async fn member_ancestors(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<Vec<Member>> {
    let snapshot = state.repo.snapshot().await?;
    require(
        snapshot.resolver(&state.policy).can_view(&query.actor, &id)?,
        "view this member",
    )?;

    let chain: Vec<String> = snapshot
        .org
        .ancestors_of(&id)?
        .into_iter()
        .map(|n| n.id.clone())
        .collect();
    let all = state.repo.list_members().await?;
    let mut members = Vec::with_capacity(chain.len());
    for ancestor_id in &chain {
        if let Some(m) = all.iter().find(|m| &m.id == ancestor_id) {
            members.push(m.clone());
        }
    }
    success(members)
}

/// Build notification rows for one fan-out batch.
pub(super) fn build_notifications(
    recipients: impl IntoIterator<Item = String>,
    kind: NotificationKind,
    subject_id: &str,
    message: &str,
) -> Vec<Notification> {
    let now = Utc::now().to_rfc3339();
    recipients
        .into_iter()
        .map(|recipient_id| Notification {
            id: uuid::Uuid::new_v4().to_string(),
            recipient_id,
            kind: kind.as_str().to_string(),
            subject_id: subject_id.to_string(),
            message: message.to_string(),
            read: false,
            created_at: now.clone(),
        })
        .collect()
}
