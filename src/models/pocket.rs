//! Pocket model: a working sub-group inside one team.

use serde::{Deserialize, Serialize};

use crate::permissions::AccessLevel;

/// A pocket within a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pocket {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub active: bool,
    pub created_at: String,
}

/// A member's membership in a pocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PocketMembership {
    pub pocket_id: String,
    pub team_id: String,
    pub member_id: String,
    pub role: AccessLevel,
    pub is_lead: bool,
    pub joined_at: String,
}

/// Request body for creating a pocket inside a team.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePocketRequest {
    pub actor_id: String,
    pub team_id: String,
    pub name: String,
}

/// Request body for renaming or archiving a pocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePocketRequest {
    pub actor_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// Request body for adding a member to a pocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPocketMemberRequest {
    pub actor_id: String,
    pub member_id: String,
    pub role: AccessLevel,
}

/// Request body for removing a member from a pocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovePocketMemberRequest {
    pub actor_id: String,
    pub member_id: String,
}

/// Request body for moving a member between two pockets of the same team.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovePocketMemberRequest {
    pub actor_id: String,
    pub member_id: String,
    pub from_pocket_id: String,
    pub to_pocket_id: String,
}

/// Request body for assigning a pocket lead.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPocketLeadRequest {
    pub actor_id: String,
    pub member_id: String,
}
