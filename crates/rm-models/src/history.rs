//! Activity history log
//!
//! Append-only trail of who did what. Approvals record the requester as
//! performer; rejections and direct admin actions record the acting user.

use chrono::{DateTime, Utc};
use rm_core::traits::{Entity, Id, Identifiable, Timestamped};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Resource,
    Project,
    Assignment,
    Request,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "RESOURCE",
            Self::Project => "PROJECT",
            Self::Assignment => "ASSIGNMENT",
            Self::Request => "REQUEST",
        }
    }
}

/// One activity log row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryLog {
    pub id: Option<Id>,
    pub entity_kind: EntityKind,
    /// Short verb tag, e.g. "ASSIGN", "EXTEND", "REJECT", "AUTO_CLOSE"
    pub action: String,
    pub description: String,
    pub performed_by: Id,
    pub timestamp: DateTime<Utc>,
}

impl HistoryLog {
    pub fn record(
        entity_kind: EntityKind,
        action: impl Into<String>,
        description: impl Into<String>,
        performed_by: Id,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            entity_kind,
            action: action.into(),
            description: description.into(),
            performed_by,
            timestamp,
        }
    }
}

impl Identifiable for HistoryLog {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Timestamped for HistoryLog {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.timestamp)
    }
}

impl Entity for HistoryLog {
    const TABLE_NAME: &'static str = "history_logs";
    const TYPE_NAME: &'static str = "HistoryLog";
}
