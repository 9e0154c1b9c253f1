//! Activity and weekly target endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{members::build_notifications, require, success, ActorQuery, ApiResult};
use crate::errors::AppError;
use crate::models::{
    Activity, ActorRequest, CreateActivityRequest, SetTargetRequest, WeeklyTarget,
};
use crate::notify::{NotificationKind, RecipientResolver};
use crate::AppState;

/// POST /api/activities - Log an activity for a member.
///
/// Logging for someone else requires edit rights on them. Each logged
/// activity fans out an `activity_added` notification.
pub async fn create_activity(
    State(state): State<AppState>,
    Json(request): Json<CreateActivityRequest>,
) -> ApiResult<Activity> {
    if request.count <= 0 {
        return Err(AppError::Validation(
            "Activity count must be positive".to_string(),
        ));
    }
    validate_week_start(&request.week_start)?;

    let snapshot = state.repo.snapshot().await?;
    let resolver = snapshot.resolver(&state.policy);
    require(
        resolver.can_edit(&request.actor_id, &request.member_id)?,
        "log activities for this member",
    )?;

    let activity = state
        .repo
        .create_activity(
            &request.member_id,
            request.kind,
            request.count,
            &request.week_start,
            request.note.as_deref(),
            &request.actor_id,
        )
        .await?;

    let recipients = RecipientResolver::new(&resolver)
        .recipients_for(&request.actor_id, &request.member_id)?;
    let subject_name = &snapshot.org.get(&request.member_id)?.display_name;
    let message = format!(
        "{} logged {} {}(s) for week {}",
        subject_name,
        request.count,
        request.kind.as_str(),
        request.week_start
    );
    let notifications = build_notifications(
        recipients,
        NotificationKind::ActivityAdded,
        &request.member_id,
        &message,
    );
    state.repo.create_notifications(&notifications).await?;

    success(activity)
}

/// GET /api/activities - Activities of every member the actor may view.
pub async fn list_activities(
    State(state): State<AppState>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<Vec<Activity>> {
    let snapshot = state.repo.snapshot().await?;
    let viewable = snapshot.resolver(&state.policy).viewable_members(&query.actor)?;
    let activities = state
        .repo
        .list_activities()
        .await?
        .into_iter()
        .filter(|a| viewable.contains(&a.member_id))
        .collect();
    success(activities)
}

/// GET /api/members/{id}/activities - One member's activities.
pub async fn member_activities(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<Vec<Activity>> {
    let snapshot = state.repo.snapshot().await?;
    require(
        snapshot.resolver(&state.policy).can_view(&query.actor, &member_id)?,
        "view this member's activities",
    )?;
    let activities = state.repo.list_activities_for_member(&member_id).await?;
    success(activities)
}

/// DELETE /api/activities/{id} - Remove a logged activity.
///
/// Requires edit rights on the member the record belongs to.
pub async fn delete_activity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> ApiResult<()> {
    let activity = state
        .repo
        .get_activity(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", id)))?;
    let snapshot = state.repo.snapshot().await?;
    require(
        snapshot
            .resolver(&state.policy)
            .can_edit(&request.actor_id, &activity.member_id)?,
        "delete this member's activities",
    )?;
    state.repo.delete_activity(&id).await?;
    success(())
}

/// POST /api/targets - Set a weekly target for a member.
///
/// Setting the same (member, kind, week) again overwrites the old value.
pub async fn set_target(
    State(state): State<AppState>,
    Json(request): Json<SetTargetRequest>,
) -> ApiResult<WeeklyTarget> {
    if request.target < 0 {
        return Err(AppError::Validation(
            "Target must not be negative".to_string(),
        ));
    }
    validate_week_start(&request.week_start)?;

    let snapshot = state.repo.snapshot().await?;
    require(
        snapshot
            .resolver(&state.policy)
            .can_edit(&request.actor_id, &request.member_id)?,
        "set targets for this member",
    )?;
    let target = state
        .repo
        .set_target(
            &request.member_id,
            request.kind,
            &request.week_start,
            request.target,
        )
        .await?;
    success(target)
}

/// GET /api/targets/{memberId} - One member's weekly targets.
pub async fn member_targets(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<Vec<WeeklyTarget>> {
    let snapshot = state.repo.snapshot().await?;
    require(
        snapshot.resolver(&state.policy).can_view(&query.actor, &member_id)?,
        "view this member's targets",
    )?;
    let targets = state.repo.list_targets_for_member(&member_id).await?;
    success(targets)
}

/// Week starts are plain ISO dates.
fn validate_week_start(week_start: &str) -> Result<(), AppError> {
    chrono::NaiveDate::parse_from_str(week_start, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("weekStart must be a YYYY-MM-DD date".to_string()))?;
    Ok(())
}
