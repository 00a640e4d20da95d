//! Conflict validator
//!
//! Pure rule checks invoked before any assignment create or mutate,
//! whether the mutation comes from a direct admin action or from approving
//! a request. No side effects; safe to call any number of times. The
//! workflow engine re-runs these against current state at approval time,
//! so staleness (a project closed since submission, a competing approval)
//! is caught.

use chrono::NaiveDate;
use rm_core::error::{ConflictCode, RmError, ValidationErrors};
use rm_core::result::RmResult;
use rm_core::types::DateRange;
use rm_models::{Assignment, PlanItem, Project};

/// Checks for creating an assignment.
///
/// `existing` must be the resource's assignments on the target project;
/// an active one with the same role is a duplicate.
pub fn validate_assign(
    project: &Project,
    role: &str,
    range: DateRange,
    existing: &[Assignment],
) -> RmResult<()> {
    let mut errors = ValidationErrors::new();

    if role.trim().is_empty() {
        errors.add_field_code(ConflictCode::RoleRequired, "role", "must not be blank");
    }
    if !range.is_valid() {
        errors.add_code(
            ConflictCode::InvalidRange,
            "end date must not be before start date",
        );
    }
    if project.is_closed() {
        errors.add_code(
            ConflictCode::ProjectClosed,
            "cannot assign resources to a CLOSED project",
        );
    }
    if existing
        .iter()
        .any(|a| a.is_active() && a.role == role)
    {
        errors.add_code(
            ConflictCode::DuplicateAssignment,
            "resource is already assigned to this project with this role",
        );
    }

    errors.into_result()
}

/// Checks for extending an assignment.
///
/// The new end date must land strictly after the current one; anything
/// else is not an extension.
pub fn validate_extend(
    assignment: &Assignment,
    new_end_date: NaiveDate,
    reason: &str,
) -> RmResult<()> {
    if !assignment.is_active() {
        return Err(stale_assignment(assignment));
    }

    let mut errors = ValidationErrors::new();
    if reason.trim().is_empty() {
        errors.add_field_code(ConflictCode::ReasonRequired, "reason", "must not be blank");
    }
    if new_end_date <= assignment.end_date {
        errors.add_code(
            ConflictCode::NotAnExtension,
            format!(
                "new end date must be after the current end date {}",
                assignment.end_date
            ),
        );
    }
    errors.into_result()
}

/// Checks for releasing an assignment.
///
/// Releasing exactly on the start date is allowed and zeroes the effective
/// duration; before the start date is invalid.
pub fn validate_release(
    assignment: &Assignment,
    release_date: NaiveDate,
    reason: &str,
) -> RmResult<()> {
    if !assignment.is_active() {
        return Err(stale_assignment(assignment));
    }

    let mut errors = ValidationErrors::new();
    if reason.trim().is_empty() {
        errors.add_field_code(ConflictCode::ReasonRequired, "reason", "must not be blank");
    }
    if release_date < assignment.start_date {
        errors.add_code(
            ConflictCode::InvalidRange,
            format!(
                "release date must not be before the assignment start {}",
                assignment.start_date
            ),
        );
    }
    errors.into_result()
}

/// Checks a project proposal's resource plan.
pub fn validate_plan(plan: &[PlanItem]) -> RmResult<()> {
    let mut errors = ValidationErrors::new();
    for (index, item) in plan.iter().enumerate() {
        if item.role.trim().is_empty() {
            errors.add_field_code(
                ConflictCode::RoleRequired,
                format!("resourcePlan[{}].role", index),
                "must not be blank",
            );
        }
        if !DateRange::new(item.start_date, item.end_date).is_valid() {
            errors.add_code(
                ConflictCode::InvalidRange,
                format!("resourcePlan[{}]: end date before start date", index),
            );
        }
    }
    errors.into_result()
}

/// The end date an assignment keeps after a release: the release date,
/// clamped so a late release never pushes the end out.
pub fn effective_release_end(assignment: &Assignment, release_date: NaiveDate) -> NaiveDate {
    assignment.end_date.min(release_date)
}

fn stale_assignment(assignment: &Assignment) -> RmError {
    RmError::state_conflict(format!(
        "assignment {} is {}, not ACTIVE",
        assignment.id.unwrap_or(0),
        assignment.status.as_str()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rm_models::{AssignmentStatus, ProjectStatus};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn project(status: ProjectStatus) -> Project {
        let mut p = Project::new("Billing", "Acme", 1);
        p.id = Some(1);
        p.status = status;
        p
    }

    fn assignment() -> Assignment {
        Assignment {
            id: Some(10),
            resource_id: 1,
            project_id: 1,
            role: "Backend Developer".into(),
            start_date: d(2024, 1, 1),
            end_date: d(2024, 6, 30),
            status: AssignmentStatus::Active,
        }
    }

    #[test]
    fn test_assign_happy_path() {
        let range = DateRange::new(d(2024, 1, 1), d(2024, 6, 30));
        assert!(validate_assign(&project(ProjectStatus::Ongoing), "QA", range, &[]).is_ok());
    }

    #[test]
    fn test_assign_rejects_closed_project() {
        let range = DateRange::new(d(2024, 1, 1), d(2024, 6, 30));
        let err = validate_assign(&project(ProjectStatus::Closed), "QA", range, &[]).unwrap_err();
        assert!(err.has_code(ConflictCode::ProjectClosed));
    }

    #[test]
    fn test_assign_rejects_inverted_range() {
        let range = DateRange::new(d(2024, 6, 30), d(2024, 1, 1));
        let err = validate_assign(&project(ProjectStatus::Ongoing), "QA", range, &[]).unwrap_err();
        assert!(err.has_code(ConflictCode::InvalidRange));
    }

    #[test]
    fn test_assign_rejects_blank_role() {
        let range = DateRange::new(d(2024, 1, 1), d(2024, 6, 30));
        let err =
            validate_assign(&project(ProjectStatus::Ongoing), "  ", range, &[]).unwrap_err();
        assert!(err.has_code(ConflictCode::RoleRequired));
    }

    #[test]
    fn test_assign_rejects_duplicate_active_role() {
        let range = DateRange::new(d(2024, 7, 1), d(2024, 12, 31));
        let existing = vec![assignment()];
        let err = validate_assign(
            &project(ProjectStatus::Ongoing),
            "Backend Developer",
            range,
            &existing,
        )
        .unwrap_err();
        assert!(err.has_code(ConflictCode::DuplicateAssignment));

        // A released assignment with the same role does not block.
        let mut released = assignment();
        released.status = AssignmentStatus::Released;
        assert!(validate_assign(
            &project(ProjectStatus::Ongoing),
            "Backend Developer",
            range,
            &[released],
        )
        .is_ok());
    }

    #[test]
    fn test_extend_requires_later_date() {
        let a = assignment();
        assert!(validate_extend(&a, d(2024, 7, 31), "client extended").is_ok());

        let same = validate_extend(&a, d(2024, 6, 30), "client extended").unwrap_err();
        assert!(same.has_code(ConflictCode::NotAnExtension));

        let earlier = validate_extend(&a, d(2024, 5, 1), "client extended").unwrap_err();
        assert!(earlier.has_code(ConflictCode::NotAnExtension));
    }

    #[test]
    fn test_extend_requires_reason() {
        let err = validate_extend(&assignment(), d(2024, 7, 31), "   ").unwrap_err();
        assert!(err.has_code(ConflictCode::ReasonRequired));
    }

    #[test]
    fn test_extend_stale_assignment_is_state_conflict() {
        let mut a = assignment();
        a.status = AssignmentStatus::Released;
        let err = validate_extend(&a, d(2024, 7, 31), "reason").unwrap_err();
        assert_eq!(err.error_code(), "state_conflict");
    }

    #[test]
    fn test_release_at_start_date_is_valid() {
        let a = assignment();
        assert!(validate_release(&a, d(2024, 1, 1), "rolled off").is_ok());
        assert_eq!(effective_release_end(&a, d(2024, 1, 1)), d(2024, 1, 1));
    }

    #[test]
    fn test_release_before_start_is_invalid() {
        let err = validate_release(&assignment(), d(2023, 12, 31), "rolled off").unwrap_err();
        assert!(err.has_code(ConflictCode::InvalidRange));
    }

    #[test]
    fn test_release_requires_reason() {
        let err = validate_release(&assignment(), d(2024, 3, 1), "").unwrap_err();
        assert!(err.has_code(ConflictCode::ReasonRequired));
    }

    #[test]
    fn test_release_end_clamps_to_existing_end() {
        let a = assignment();
        assert_eq!(effective_release_end(&a, d(2024, 3, 1)), d(2024, 3, 1));
        assert_eq!(effective_release_end(&a, d(2024, 12, 1)), d(2024, 6, 30));
    }

    #[test]
    fn test_plan_validation() {
        let good = vec![PlanItem {
            resource_id: 1,
            role: "QA".into(),
            start_date: d(2024, 1, 1),
            end_date: d(2024, 2, 1),
        }];
        assert!(validate_plan(&good).is_ok());

        let bad = vec![PlanItem {
            resource_id: 1,
            role: "".into(),
            start_date: d(2024, 2, 1),
            end_date: d(2024, 1, 1),
        }];
        let err = validate_plan(&bad).unwrap_err();
        assert!(err.has_code(ConflictCode::RoleRequired));
        assert!(err.has_code(ConflictCode::InvalidRange));
    }

    #[test]
    fn test_validator_is_repeatable() {
        let a = assignment();
        for _ in 0..3 {
            assert!(validate_extend(&a, d(2024, 7, 31), "reason").is_ok());
        }
    }
}
