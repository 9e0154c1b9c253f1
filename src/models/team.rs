//! Team model: a named group of members with per-membership roles.

use serde::{Deserialize, Serialize};

use crate::permissions::AccessLevel;

/// A sales team.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub created_at: String,
}

/// A member's membership in a team, with the role they hold there.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMembership {
    pub team_id: String,
    pub member_id: String,
    pub role: AccessLevel,
    pub joined_at: String,
}

/// Request body for creating a team.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    pub actor_id: String,
    pub name: String,
    /// Defaults to the actor.
    #[serde(default)]
    pub owner_id: Option<String>,
}

/// Request body for renaming a team or transferring ownership.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeamRequest {
    pub actor_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

/// Request body for adding a member to a team.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTeamMemberRequest {
    pub actor_id: String,
    pub member_id: String,
    pub role: AccessLevel,
}

/// Request body for removing a member from a team.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveTeamMemberRequest {
    pub actor_id: String,
    pub member_id: String,
}

/// Request body for moving a member from one team to another in one step.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTeamMemberRequest {
    pub actor_id: String,
    pub member_id: String,
    pub from_team_id: String,
    pub to_team_id: String,
    pub role: AccessLevel,
}

/// A team with its memberships expanded, returned by the detail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDetail {
    #[serde(flatten)]
    pub team: Team,
    pub members: Vec<TeamMembership>,
}
