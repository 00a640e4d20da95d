//! Resource and project ledgers
//!
//! Availability and member counts are never stored; they are derived from
//! assignment rows each time they are read. The pure derivation functions
//! live here so the same rule backs every query path.

mod projects;
mod resources;

pub use projects::{ProjectLedger, ProjectResourceView, ProjectView};
pub use resources::{ResourceFilters, ResourceLedger, ResourceView};

use chrono::NaiveDate;
use rm_models::{Assignment, ResourceStatus};

/// A resource is assigned iff any active assignment covers `as_of`.
pub fn resource_status(assignments: &[Assignment], as_of: NaiveDate) -> ResourceStatus {
    if assignments.iter().any(|a| a.active_on(as_of)) {
        ResourceStatus::Assigned
    } else {
        ResourceStatus::Available
    }
}

/// Count of active assignments; drives the project delete guard.
pub fn member_count(assignments: &[Assignment]) -> usize {
    assignments.iter().filter(|a| a.is_active()).count()
}

/// Role filter: with `as_of`, only the assignment active on that date
/// counts; without, any active assignment with the role matches.
pub fn matches_role(assignments: &[Assignment], role: &str, as_of: Option<NaiveDate>) -> bool {
    assignments.iter().any(|a| {
        let in_scope = match as_of {
            Some(date) => a.active_on(date),
            None => a.is_active(),
        };
        in_scope && a.role.eq_ignore_ascii_case(role)
    })
}
