//! Request model
//!
//! A request is a proposed mutation awaiting approval. Once it leaves
//! `Pending` it is immutable; rejections carry a mandatory reason that is
//! shown verbatim to the requester.

use chrono::{DateTime, NaiveDate, Utc};
use rm_core::traits::{Entity, Id, Identifiable, Timestamped};
use serde::{Deserialize, Serialize};

/// Request type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    Assign,
    Extend,
    Release,
    Project,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assign => "ASSIGN",
            Self::Extend => "EXTEND",
            Self::Release => "RELEASE",
            Self::Project => "PROJECT",
        }
    }
}

/// Request lifecycle status; `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One line of a project proposal's resource plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanItem {
    pub resource_id: Id,
    pub role: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Type-specific request payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum RequestPayload {
    Assign {
        resource_id: Id,
        project_id: Id,
        role: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    Extend {
        assignment_id: Id,
        new_end_date: NaiveDate,
        /// End date of the assignment at submission time, kept for display
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_end_date: Option<NaiveDate>,
        reason: String,
    },
    Release {
        assignment_id: Id,
        release_date: NaiveDate,
        reason: String,
    },
    Project {
        project_name: String,
        client_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        resource_plan: Vec<PlanItem>,
    },
}

impl RequestPayload {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Assign { .. } => RequestKind::Assign,
            Self::Extend { .. } => RequestKind::Extend,
            Self::Release { .. } => RequestKind::Release,
            Self::Project { .. } => RequestKind::Project,
        }
    }

    /// The assignment this request targets, for the one-pending-per-assignment
    /// guard. Assign and Project requests target none.
    pub fn assignment_id(&self) -> Option<Id> {
        match self {
            Self::Extend { assignment_id, .. } | Self::Release { assignment_id, .. } => {
                Some(*assignment_id)
            }
            _ => None,
        }
    }
}

/// Request entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: Option<Id>,

    #[serde(default)]
    pub status: RequestStatus,

    pub requester_id: Id,

    /// Set only when status is `Rejected`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,

    pub created_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub payload: RequestPayload,
}

impl Request {
    pub fn pending(requester_id: Id, payload: RequestPayload) -> Self {
        Self {
            id: None,
            status: RequestStatus::Pending,
            requester_id,
            rejection_reason: None,
            created_at: None,
            payload,
        }
    }

    pub fn kind(&self) -> RequestKind {
        self.payload.kind()
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

impl Identifiable for Request {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Timestamped for Request {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

impl Entity for Request {
    const TABLE_NAME: &'static str = "requests";
    const TYPE_NAME: &'static str = "Request";
}

/// Filters for request listings
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub kind: Option<RequestKind>,
    pub requester_id: Option<Id>,
    /// When set, only requests in a terminal state are returned
    #[serde(default)]
    pub terminal_only: bool,
}

impl RequestFilter {
    pub fn matches(&self, request: &Request) -> bool {
        if let Some(status) = self.status {
            if request.status != status {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if request.kind() != kind {
                return false;
            }
        }
        if let Some(requester_id) = self.requester_id {
            if request.requester_id != requester_id {
                return false;
            }
        }
        if self.terminal_only && !request.status.is_terminal() {
            return false;
        }
        true
    }
}
