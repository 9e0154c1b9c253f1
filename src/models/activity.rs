//! Activity and weekly target models.

use serde::{Deserialize, Serialize};

/// What kind of field activity was logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Contact,
    Plan,
    Visit,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Contact => "contact",
            ActivityKind::Plan => "plan",
            ActivityKind::Visit => "visit",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "contact" => Some(ActivityKind::Contact),
            "plan" => Some(ActivityKind::Plan),
            "visit" => Some(ActivityKind::Visit),
            _ => None,
        }
    }
}

/// One logged activity for a member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub member_id: String,
    pub kind: ActivityKind,
    pub count: i64,
    /// Monday of the ISO week the activity belongs to, `YYYY-MM-DD`.
    pub week_start: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Who logged it; usually the member, sometimes their leader.
    pub recorded_by: String,
    pub created_at: String,
}

/// Request body for logging an activity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivityRequest {
    pub actor_id: String,
    pub member_id: String,
    pub kind: ActivityKind,
    pub count: i64,
    pub week_start: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Per-member weekly target for one activity kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTarget {
    pub member_id: String,
    pub kind: ActivityKind,
    pub week_start: String,
    pub target: i64,
    pub updated_at: String,
}

/// Request body for setting a weekly target. Setting the same
/// (member, kind, week) again overwrites the previous value.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTargetRequest {
    pub actor_id: String,
    pub member_id: String,
    pub kind: ActivityKind,
    pub week_start: String,
    pub target: i64,
}
