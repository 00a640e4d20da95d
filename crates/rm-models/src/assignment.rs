//! Assignment model
//!
//! A time-bounded link between one resource and one project with a role
//! label. The inclusive date range drives all availability derivation.

use chrono::NaiveDate;
use rm_core::traits::{Entity, Id, Identifiable, Timestamped};
use rm_core::types::DateRange;
use serde::{Deserialize, Serialize};

/// Assignment lifecycle status
///
/// `Expired` is reached passively by the periodic sweep when the end date
/// elapses without a release; it is never set by a user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    #[default]
    Active,
    Released,
    Expired,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Released => "RELEASED",
            Self::Expired => "EXPIRED",
        }
    }
}

/// Assignment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: Option<Id>,
    pub resource_id: Id,
    pub project_id: Id,

    /// Free-text role category (e.g. "Backend Developer")
    pub role: String,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    #[serde(default)]
    pub status: AssignmentStatus,
}

impl Assignment {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }

    pub fn is_active(&self) -> bool {
        self.status == AssignmentStatus::Active
    }

    /// Whether the assignment occupies the resource on the given date.
    pub fn active_on(&self, date: NaiveDate) -> bool {
        self.is_active() && self.range().contains(date)
    }

    /// Active but past its end date; the sweep turns these into `Expired`.
    pub fn overdue(&self, today: NaiveDate) -> bool {
        self.is_active() && self.end_date < today
    }
}

impl Identifiable for Assignment {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Timestamped for Assignment {
    fn created_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        None
    }
}

impl Entity for Assignment {
    const TABLE_NAME: &'static str = "assignments";
    const TYPE_NAME: &'static str = "Assignment";
}

/// Parameters for creating an assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
    pub resource_id: Id,
    pub project_id: Id,
    pub role: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl NewAssignment {
    pub fn into_assignment(self) -> Assignment {
        Assignment {
            id: None,
            resource_id: self.resource_id,
            project_id: self.project_id,
            role: self.role,
            start_date: self.start_date,
            end_date: self.end_date,
            status: AssignmentStatus::Active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn assignment(status: AssignmentStatus) -> Assignment {
        Assignment {
            id: Some(1),
            resource_id: 1,
            project_id: 1,
            role: "Backend Developer".into(),
            start_date: d(2024, 1, 1),
            end_date: d(2024, 6, 30),
            status,
        }
    }

    #[test]
    fn test_active_on_inside_range() {
        let a = assignment(AssignmentStatus::Active);
        assert!(a.active_on(d(2024, 3, 15)));
        assert!(a.active_on(d(2024, 1, 1)));
        assert!(a.active_on(d(2024, 6, 30)));
    }

    #[test]
    fn test_active_on_outside_range() {
        let a = assignment(AssignmentStatus::Active);
        assert!(!a.active_on(d(2023, 12, 31)));
        assert!(!a.active_on(d(2024, 7, 1)));
    }

    #[test]
    fn test_released_never_occupies() {
        let a = assignment(AssignmentStatus::Released);
        assert!(!a.active_on(d(2024, 3, 15)));
    }

    #[test]
    fn test_overdue() {
        let a = assignment(AssignmentStatus::Active);
        assert!(!a.overdue(d(2024, 6, 30)));
        assert!(a.overdue(d(2024, 7, 1)));
        assert!(!assignment(AssignmentStatus::Released).overdue(d(2024, 7, 1)));
    }

    #[test]
    fn test_new_assignment_starts_active() {
        let a = NewAssignment {
            resource_id: 1,
            project_id: 2,
            role: "QA".into(),
            start_date: d(2024, 1, 1),
            end_date: d(2024, 2, 1),
        }
        .into_assignment();
        assert_eq!(a.status, AssignmentStatus::Active);
        assert!(a.id.is_none());
    }
}
