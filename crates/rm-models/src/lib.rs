//! # rm-models
//!
//! Domain models for Resman RS: resources (staff), projects, time-bounded
//! assignments linking the two, change requests moving through the approval
//! workflow, users (caller identity), and the activity history log.
//!
//! Models here are plain data plus intrinsic predicates; status derivation
//! and workflow rules live in `rm-services`.

pub mod assignment;
pub mod history;
pub mod project;
pub mod request;
pub mod resource;
pub mod user;

pub use assignment::{Assignment, AssignmentStatus, NewAssignment};
pub use history::{EntityKind, HistoryLog};
pub use project::{CreateProjectDto, Project, ProjectStatus, UpdateProjectDto};
pub use request::{
    PlanItem, Request, RequestFilter, RequestKind, RequestPayload, RequestStatus,
};
pub use resource::{CreateResourceDto, Resource, ResourceStatus, UpdateResourceDto};
pub use user::{User, UserRole};
