//! # rm-services
//!
//! Business logic for Resman RS:
//!
//! - The request workflow engine (submit / approve / reject with
//!   role-dependent bypass)
//! - The conflict validator (pure date-range and capacity rules)
//! - Resource and project ledgers with derived availability
//! - The month-grid timeline projector
//! - The periodic expiry sweep
//! - Dashboard aggregates
//!
//! Persistence is abstracted behind [`store::LedgerStore`]; see
//! [`store::memory::MemoryStore`] for the in-process implementation and
//! `rm-db` for PostgreSQL.

pub mod dashboard;
pub mod ledger;
pub mod store;
pub mod sweep;
pub mod timeline;
pub mod validator;
pub mod workflow;

pub use dashboard::{DashboardService, DashboardStats, EndingSoon};
pub use ledger::{
    member_count, resource_status, ProjectLedger, ProjectResourceView, ProjectView,
    ResourceFilters, ResourceLedger, ResourceView,
};
pub use store::{Effect, EffectOutcome, LedgerStore, SweepOutcome};
pub use sweep::ExpirySweep;
pub use timeline::{
    project_timeline, window_start, BarCategory, PositionedBar, TimelineEntry, TimelineService,
    DEFAULT_ROW_CAP, DEFAULT_WINDOW_MONTHS,
};
pub use workflow::{SubmitOutcome, WorkflowEngine};
