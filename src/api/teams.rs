//! Team API endpoints: CRUD, membership, and cross-team moves.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{require, success, ActorQuery, ApiResult};
use crate::errors::AppError;
use crate::models::{
    ActorRequest, AddTeamMemberRequest, CreateTeamRequest, MoveTeamMemberRequest,
    RemoveTeamMemberRequest, Team, TeamDetail, TeamMembership, UpdateTeamRequest,
};
use crate::AppState;

/// POST /api/teams - Create a team.
pub async fn create_team(
    State(state): State<AppState>,
    Json(request): Json<CreateTeamRequest>,
) -> ApiResult<Team> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Team name is required".to_string()));
    }
    let snapshot = state.repo.snapshot().await?;
    let resolver = snapshot.resolver(&state.policy);
    require(resolver.can_create_team(&request.actor_id)?, "create a team")?;

    // Default owner is the actor; an explicit owner must exist and be
    // someone the actor may edit.
    let owner = request.owner_id.as_deref().unwrap_or(&request.actor_id);
    if owner != request.actor_id {
        require(
            resolver.can_edit(&request.actor_id, owner)?,
            "assign this member as team owner",
        )?;
    }

    let team = state.repo.create_team(&request.name, owner).await?;
    tracing::info!(team = %team.id, owner = %owner, "team created");
    success(team)
}

/// GET /api/teams - List the teams the actor may view.
pub async fn list_teams(
    State(state): State<AppState>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<Vec<Team>> {
    let snapshot = state.repo.snapshot().await?;
    let viewable = snapshot.resolver(&state.policy).viewable_teams(&query.actor)?;
    let teams = state
        .repo
        .list_teams()
        .await?
        .into_iter()
        .filter(|t| viewable.contains(&t.id))
        .collect();
    success(teams)
}

/// GET /api/teams/{id} - Team detail with memberships.
pub async fn get_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<TeamDetail> {
    let snapshot = state.repo.snapshot().await?;
    require(
        snapshot.resolver(&state.policy).can_view_team(&query.actor, &id)?,
        "view this team",
    )?;
    let team = state
        .repo
        .get_team(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Team {} not found", id)))?;
    let members = state.repo.team_memberships(&id).await?;
    success(TeamDetail { team, members })
}

/// PUT /api/teams/{id} - Rename a team or transfer ownership.
pub async fn update_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTeamRequest>,
) -> ApiResult<Team> {
    let snapshot = state.repo.snapshot().await?;
    let resolver = snapshot.resolver(&state.policy);
    require(resolver.can_edit_team(&request.actor_id, &id)?, "edit this team")?;
    if let Some(new_owner) = request.owner_id.as_deref() {
        snapshot.org.get(new_owner)?;
    }
    let team = state
        .repo
        .update_team(&id, request.name.as_deref(), request.owner_id.as_deref())
        .await?;
    success(team)
}

/// DELETE /api/teams/{id} - Delete a team with its pockets and memberships.
pub async fn delete_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ActorRequest>,
) -> ApiResult<()> {
    let snapshot = state.repo.snapshot().await?;
    require(
        snapshot.resolver(&state.policy).can_edit_team(&request.actor_id, &id)?,
        "delete this team",
    )?;
    state.repo.delete_team(&id).await?;
    tracing::info!(team = %id, "team deleted");
    success(())
}

/// POST /api/teams/{id}/members - Add a member to a team.
pub async fn add_team_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AddTeamMemberRequest>,
) -> ApiResult<TeamMembership> {
    let snapshot = state.repo.snapshot().await?;
    require(
        snapshot.resolver(&state.policy).can_edit_team(&request.actor_id, &id)?,
        "manage this team's members",
    )?;
    snapshot.org.get(&request.member_id)?;
    snapshot
        .memberships
        .validate_join_team(&request.member_id, &id)?;
    let membership = state
        .repo
        .add_team_member(&id, &request.member_id, request.role)
        .await?;
    success(membership)
}

/// DELETE /api/teams/{id}/members - Remove a member from a team.
pub async fn remove_team_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RemoveTeamMemberRequest>,
) -> ApiResult<()> {
    let snapshot = state.repo.snapshot().await?;
    require(
        snapshot.resolver(&state.policy).can_edit_team(&request.actor_id, &id)?,
        "manage this team's members",
    )?;
    state
        .repo
        .remove_team_member(&id, &request.member_id)
        .await?;
    success(())
}

/// POST /api/teams/move-member - Move a member from one team to another
/// in a single step. Requires edit rights on both teams.
pub async fn move_team_member(
    State(state): State<AppState>,
    Json(request): Json<MoveTeamMemberRequest>,
) -> ApiResult<TeamMembership> {
    let snapshot = state.repo.snapshot().await?;
    let resolver = snapshot.resolver(&state.policy);
    require(
        resolver.can_edit_team(&request.actor_id, &request.from_team_id)?,
        "manage the source team's members",
    )?;
    require(
        resolver.can_edit_team(&request.actor_id, &request.to_team_id)?,
        "manage the target team's members",
    )?;
    snapshot.memberships.validate_team_move(
        &request.member_id,
        &request.from_team_id,
        &request.to_team_id,
    )?;

    let membership = state
        .repo
        .move_team_member(
            &request.member_id,
            &request.from_team_id,
            &request.to_team_id,
            request.role,
        )
        .await?;
    tracing::info!(
        member = %request.member_id,
        from = %request.from_team_id,
        to = %request.to_team_id,
        "member moved between teams"
    );
    success(membership)
}
