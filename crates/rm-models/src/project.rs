//! Project model
//!
//! Projects own a stored status; member counts are derived from active
//! assignments at query time. `Closed` is terminal.

use chrono::{DateTime, Utc};
use rm_core::traits::{Entity, Id, Identifiable, Timestamped};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Stored project status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Ongoing,
    Hold,
    Closed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ongoing => "ONGOING",
            Self::Hold => "HOLD",
            Self::Closed => "CLOSED",
        }
    }

    /// Closed projects never reopen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn can_transition_to(&self, next: ProjectStatus) -> bool {
        if self.is_terminal() {
            return *self == next;
        }
        true
    }
}

/// Project entity
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Option<Id>,

    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[validate(length(min = 1, max = 255))]
    pub client_name: String,

    /// Owning delivery manager
    pub manager_id: Id,

    #[serde(default)]
    pub status: ProjectStatus,

    pub created_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn new(name: impl Into<String>, client_name: impl Into<String>, manager_id: Id) -> Self {
        Self {
            id: None,
            name: name.into(),
            client_name: client_name.into(),
            manager_id,
            status: ProjectStatus::Ongoing,
            created_at: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status.is_terminal()
    }
}

impl Identifiable for Project {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Timestamped for Project {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

impl Entity for Project {
    const TABLE_NAME: &'static str = "projects";
    const TYPE_NAME: &'static str = "Project";
}

/// DTO for creating a project
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectDto {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[validate(length(min = 1, max = 255))]
    pub client_name: String,

    pub manager_id: Id,
}

impl From<CreateProjectDto> for Project {
    fn from(dto: CreateProjectDto) -> Self {
        Project::new(dto.name, dto.client_name, dto.manager_id)
    }
}

/// DTO for updating a project
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectDto {
    pub name: Option<String>,
    pub client_name: Option<String>,
    pub manager_id: Option<Id>,
    pub status: Option<ProjectStatus>,
}

impl UpdateProjectDto {
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(ref name) = self.name {
            project.name = name.clone();
        }
        if let Some(ref client) = self.client_name {
            project.client_name = client.clone();
        }
        if let Some(manager_id) = self.manager_id {
            project.manager_id = manager_id;
        }
        if let Some(status) = self.status {
            project.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_defaults_to_ongoing() {
        let p = Project::new("Billing Revamp", "Acme Corp", 3);
        assert_eq!(p.status, ProjectStatus::Ongoing);
        assert!(!p.is_closed());
    }

    #[test]
    fn test_closed_is_terminal() {
        assert!(ProjectStatus::Closed.is_terminal());
        assert!(!ProjectStatus::Closed.can_transition_to(ProjectStatus::Ongoing));
        assert!(!ProjectStatus::Closed.can_transition_to(ProjectStatus::Hold));
        // A no-op "transition" to the same status is tolerated.
        assert!(ProjectStatus::Closed.can_transition_to(ProjectStatus::Closed));
    }

    #[test]
    fn test_open_statuses_move_freely() {
        assert!(ProjectStatus::Ongoing.can_transition_to(ProjectStatus::Hold));
        assert!(ProjectStatus::Hold.can_transition_to(ProjectStatus::Ongoing));
        assert!(ProjectStatus::Ongoing.can_transition_to(ProjectStatus::Closed));
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&ProjectStatus::Ongoing).unwrap(),
            "\"ONGOING\""
        );
        let parsed: ProjectStatus = serde_json::from_str("\"CLOSED\"").unwrap();
        assert_eq!(parsed, ProjectStatus::Closed);
    }
}
