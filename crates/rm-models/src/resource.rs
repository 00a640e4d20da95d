//! Resource model
//!
//! A resource is a staff member who can be assigned to projects. Its
//! availability status is never stored; it is derived from the resource's
//! assignments at query time.

use chrono::{DateTime, Utc};
use rm_core::traits::{Entity, Id, Identifiable, Timestamped};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Derived availability status of a resource as of some date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    Available,
    Assigned,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Assigned => "ASSIGNED",
        }
    }
}

/// Resource entity
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: Option<Id>,

    /// Display name
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    /// Sequential employee label (e.g. "EMP007")
    pub employee_code: String,

    #[validate(email)]
    pub email: String,

    pub created_at: Option<DateTime<Utc>>,
}

impl Resource {
    pub fn new(name: impl Into<String>, employee_code: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            employee_code: employee_code.into(),
            email: email.into(),
            created_at: None,
        }
    }

    /// Sequential employee code label for the n-th resource.
    pub fn employee_code_for(sequence: i64) -> String {
        format!("EMP{:03}", sequence)
    }
}

impl Identifiable for Resource {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Timestamped for Resource {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

impl Entity for Resource {
    const TABLE_NAME: &'static str = "resources";
    const TYPE_NAME: &'static str = "Resource";
}

/// DTO for creating a resource
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateResourceDto {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[validate(email)]
    pub email: String,
}

/// DTO for updating a resource
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResourceDto {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UpdateResourceDto {
    pub fn apply_to(&self, resource: &mut Resource) {
        if let Some(ref name) = self.name {
            resource.name = name.clone();
        }
        if let Some(ref email) = self.email {
            resource.email = email.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_new() {
        let r = Resource::new("Ada Lovelace", "EMP001", "ada@example.com");
        assert_eq!(r.name, "Ada Lovelace");
        assert!(r.is_new_record());
    }

    #[test]
    fn test_employee_code_padding() {
        assert_eq!(Resource::employee_code_for(1), "EMP001");
        assert_eq!(Resource::employee_code_for(42), "EMP042");
        assert_eq!(Resource::employee_code_for(1234), "EMP1234");
    }

    #[test]
    fn test_update_applies_only_given_fields() {
        let mut r = Resource::new("Ada", "EMP001", "ada@example.com");
        let dto = UpdateResourceDto {
            name: Some("Ada L.".into()),
            email: None,
        };
        dto.apply_to(&mut r);
        assert_eq!(r.name, "Ada L.");
        assert_eq!(r.email, "ada@example.com");
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ResourceStatus::Available).unwrap(),
            "\"AVAILABLE\""
        );
        assert_eq!(ResourceStatus::Assigned.as_str(), "ASSIGNED");
    }
}
