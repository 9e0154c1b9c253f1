//! Pocket API endpoints: sub-groups within a team.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{require, success, ActorQuery, ApiResult};
use crate::errors::AppError;
use crate::models::{
    ActorRequest, AddPocketMemberRequest, CreatePocketRequest, MovePocketMemberRequest, Pocket,
    PocketMembership, RemovePocketMemberRequest, SetPocketLeadRequest, UpdatePocketRequest,
};
use crate::AppState;

/// POST /api/pockets - Create a pocket inside a team.
pub async fn create_pocket(
    State(state): State<AppState>,
    Json(request): Json<CreatePocketRequest>,
) -> ApiResult<Pocket> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Pocket name is required".to_string()));
    }
    let snapshot = state.repo.snapshot().await?;
    require(
        snapshot
            .resolver(&state.policy)
            .can_edit_team(&request.actor_id, &request.team_id)?,
        "manage this team's pockets",
    )?;
    let pocket = state.repo.create_pocket(&request.team_id, &request.name).await?;
    success(pocket)
}

/// GET /api/teams/{id}/pockets - List a team's pockets.
pub async fn list_pockets(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<Vec<Pocket>> {
    let snapshot = state.repo.snapshot().await?;
    require(
        snapshot.resolver(&state.policy).can_view_team(&query.actor, &team_id)?,
        "view this team",
    )?;
    let pockets = state.repo.list_pockets(&team_id).await?;
    success(pockets)
}

/// GET /api/pockets/{id} - Pocket detail with memberships.
pub async fn get_pocket(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<(Pocket, Vec<PocketMembership>)> {
    let snapshot = state.repo.snapshot().await?;
    let team_id = snapshot.memberships.pocket(&id)?.team_id.clone();
    require(
        snapshot.resolver(&state.policy).can_view_team(&query.actor, &team_id)?,
        "view this team",
    )?;
    let pocket = state
        .repo
        .get_pocket(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pocket {} not found", id)))?;
    let members = state.repo.pocket_memberships(&id).await?;
    success((pocket, members))
}

/// PUT /api/pockets/{id} - Rename or archive a pocket.
pub async fn update_pocket(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdatePocketRequest>,
) -> ApiResult<Pocket> {
    let snapshot = state.repo.snapshot().await?;
    let team_id = snapshot.memberships.pocket(&id)?.team_id.clone();
    require(
        snapshot.resolver(&state.policy).can_edit_team(&request.actor_id, &team_id)?,
        "manage this team's pockets",
    )?;
    let pocket = state
        .repo
        .update_pocket(&id, request.name.as_deref(), request.active)
        .await?;
    success(pocket)
}

/// DELETE /api/pockets/{id} - Delete a pocket and its memberships.
pub async fn delete_pocket(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> ApiResult<()> {
    let snapshot = state.repo.snapshot().await?;
    let team_id = snapshot.memberships.pocket(&id)?.team_id.clone();
    require(
        snapshot.resolver(&state.policy).can_edit_team(&request.actor_id, &team_id)?,
        "manage this team's pockets",
    )?;
    state.repo.delete_pocket(&id).await?;
    success(())
}

/// POST /api/pockets/{id}/members - Add a member to a pocket.
///
/// The member must already belong to the pocket's team; their pocket role
/// is the role they hold in that team.
pub async fn add_pocket_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AddPocketMemberRequest>,
) -> ApiResult<PocketMembership> {
    let snapshot = state.repo.snapshot().await?;
    let team_id = snapshot.memberships.pocket(&id)?.team_id.clone();
    require(
        snapshot.resolver(&state.policy).can_edit_team(&request.actor_id, &team_id)?,
        "manage this team's pockets",
    )?;
    if !snapshot
        .memberships
        .is_member_of_team(&request.member_id, &team_id)
    {
        return Err(AppError::Validation(format!(
            "Member {} is not in team {}",
            request.member_id, team_id
        )));
    }
    snapshot
        .memberships
        .validate_join_pocket(&request.member_id, &id)?;
    let membership = state
        .repo
        .add_pocket_member(&id, &team_id, &request.member_id, request.role)
        .await?;
    success(membership)
}

/// DELETE /api/pockets/{id}/members - Remove a member from a pocket.
pub async fn remove_pocket_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RemovePocketMemberRequest>,
) -> ApiResult<()> {
    let snapshot = state.repo.snapshot().await?;
    let team_id = snapshot.memberships.pocket(&id)?.team_id.clone();
    require(
        snapshot.resolver(&state.policy).can_edit_team(&request.actor_id, &team_id)?,
        "manage this team's pockets",
    )?;
    state
        .repo
        .remove_pocket_member(&id, &request.member_id)
        .await?;
    success(())
}

/// POST /api/pockets/move-member - Move a member between two pockets of the
/// same team. Lead status does not follow the member.
pub async fn move_pocket_member(
    State(state): State<AppState>,
    Json(request): Json<MovePocketMemberRequest>,
) -> ApiResult<PocketMembership> {
    let snapshot = state.repo.snapshot().await?;
    snapshot.memberships.validate_pocket_move(
        &request.member_id,
        &request.from_pocket_id,
        &request.to_pocket_id,
    )?;
    let team_id = snapshot
        .memberships
        .pocket(&request.to_pocket_id)?
        .team_id
        .clone();
    require(
        snapshot.resolver(&state.policy).can_edit_team(&request.actor_id, &team_id)?,
        "manage this team's pockets",
    )?;
    let role = snapshot
        .memberships
        .role_of(&request.member_id, &team_id)
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Member {} is not in team {}",
                request.member_id, team_id
            ))
        })?;

    let membership = state
        .repo
        .move_pocket_member(
            &request.member_id,
            &request.from_pocket_id,
            &request.to_pocket_id,
            &team_id,
            role,
        )
        .await?;
    tracing::info!(
        member = %request.member_id,
        from = %request.from_pocket_id,
        to = %request.to_pocket_id,
        "member moved between pockets"
    );
    success(membership)
}

/// POST /api/pockets/{id}/lead - Assign the pocket lead.
///
/// Assignment is explicit, requires the member to be in the pocket, and is
/// rejected while another lead exists.
pub async fn set_pocket_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SetPocketLeadRequest>,
) -> ApiResult<()> {
    let snapshot = state.repo.snapshot().await?;
    let team_id = snapshot.memberships.pocket(&id)?.team_id.clone();
    require(
        snapshot.resolver(&state.policy).can_edit_team(&request.actor_id, &team_id)?,
        "manage this team's pockets",
    )?;
    snapshot
        .memberships
        .validate_set_lead(&request.member_id, &id)?;
    state.repo.set_pocket_lead(&id, &request.member_id).await?;
    tracing::info!(pocket = %id, lead = %request.member_id, "pocket lead assigned");
    success(())
}
