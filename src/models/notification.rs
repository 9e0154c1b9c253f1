//! Notification model.

use serde::{Deserialize, Serialize};

/// A notification delivered to one recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    /// `activity_added` or `member_registered`.
    pub kind: String,
    /// Member the event is about.
    pub subject_id: String,
    pub message: String,
    pub read: bool,
    pub created_at: String,
}

/// Request body for marking notifications read.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub actor_id: String,
}

/// Unread notification count for a member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub count: i64,
}
