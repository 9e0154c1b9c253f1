//! Member model: a person in the reporting hierarchy.

use serde::{Deserialize, Serialize};

use crate::permissions::AccessLevel;

/// A member of the field organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub access_level: AccessLevel,
    pub active: bool,
    /// Id of the member this one reports to; `None` for a root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Materialized ancestor chain, `/r1/.../self/`.
    pub path: String,
    pub depth: i64,
    pub created_at: String,
}

/// Request body for registering a new member.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMemberRequest {
    pub actor_id: String,
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub access_level: AccessLevel,
    /// Omitted or null makes the new member a root.
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Request body for updating a member's profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    pub actor_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub access_level: Option<AccessLevel>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// Request body for moving a member under a new superior.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReparentRequest {
    pub actor_id: String,
    /// Omitted or null moves the member to the root level.
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Request body carrying only the acting member. Used by delete endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorRequest {
    pub actor_id: String,
}
