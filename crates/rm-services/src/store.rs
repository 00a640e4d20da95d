//! Ledger store abstraction
//!
//! All persistence goes through [`LedgerStore`]. The workflow engine never
//! writes entities piecemeal: every mutation is expressed as an [`Effect`]
//! and the store commits the whole effect (ledger change + request
//! transition + history entry) as one atomic unit, or not at all.
//!
//! Implementations: [`memory::MemoryStore`] (in-process, used by tests and
//! database-less runs) and `rm_db::PgLedgerStore` (PostgreSQL).

pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use rm_core::result::RmResult;
use rm_core::traits::Id;
use rm_models::{
    Assignment, HistoryLog, NewAssignment, PlanItem, Project, Request, RequestFilter, Resource,
    User,
};

/// A fully validated mutation, applied atomically by the store.
///
/// `request_id` is `Some` when the mutation comes from approving a pending
/// request; the store then flips that request to `Approved` in the same
/// transaction and fails with a state conflict if it is no longer pending.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Create an assignment (direct admin assign or ASSIGN approval).
    Assign {
        request_id: Option<Id>,
        new: NewAssignment,
        log: HistoryLog,
    },
    /// Move an assignment's end date forward.
    Extend {
        request_id: Option<Id>,
        assignment_id: Id,
        new_end_date: NaiveDate,
        log: HistoryLog,
    },
    /// End an assignment early (or on its last day). The store clamps the
    /// stored end date to `min(current end, effective_end)` and closes the
    /// project when no active assignments remain, writing `auto_close_log`.
    Release {
        request_id: Option<Id>,
        assignment_id: Id,
        effective_end: NaiveDate,
        log: HistoryLog,
        auto_close_log: HistoryLog,
    },
    /// Create a project together with its planned assignments.
    CreateProject {
        request_id: Option<Id>,
        project: Project,
        plan: Vec<PlanItem>,
        log: HistoryLog,
    },
    /// Reject a pending request, storing the reason verbatim.
    Reject {
        request_id: Id,
        reason: String,
        log: HistoryLog,
    },
}

/// What an applied effect produced.
#[derive(Debug, Clone, Default)]
pub struct EffectOutcome {
    /// The assignment created or mutated, when the effect touched one
    pub assignment: Option<Assignment>,
    /// The project created, for `CreateProject`
    pub project: Option<Project>,
    /// Whether a release closed its project as a side effect
    pub project_closed: bool,
}

/// Counters from one expiry sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub expired_assignments: usize,
    pub closed_projects: usize,
}

/// Persistence seam for ledgers, workflow engine, and sweep.
///
/// Every method is an atomic operation; `apply` in particular re-checks its
/// preconditions against current state inside the transaction, so a stale
/// caller gets a state conflict instead of a lost update.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // -- users ------------------------------------------------------------

    async fn user(&self, id: Id) -> RmResult<User>;
    async fn users(&self) -> RmResult<Vec<User>>;
    async fn insert_user(&self, user: User) -> RmResult<User>;

    // -- resources --------------------------------------------------------

    async fn resource(&self, id: Id) -> RmResult<Resource>;
    async fn resources(&self) -> RmResult<Vec<Resource>>;
    async fn resource_count(&self) -> RmResult<i64>;
    async fn resource_email_exists(&self, email: &str) -> RmResult<bool>;
    async fn insert_resource(&self, resource: Resource) -> RmResult<Resource>;
    async fn update_resource(&self, resource: Resource) -> RmResult<Resource>;
    /// Delete a resource and its dependent rows (assignments, requests,
    /// history). Fails with a capacity conflict while any assignment is
    /// still active.
    async fn delete_resource(&self, id: Id) -> RmResult<()>;

    // -- projects ---------------------------------------------------------

    async fn project(&self, id: Id) -> RmResult<Project>;
    async fn projects(&self) -> RmResult<Vec<Project>>;
    async fn insert_project(&self, project: Project) -> RmResult<Project>;
    async fn update_project(&self, project: Project) -> RmResult<Project>;
    /// Fails with a capacity conflict while the project has active
    /// assignments.
    async fn delete_project(&self, id: Id) -> RmResult<()>;

    // -- assignments ------------------------------------------------------

    async fn assignment(&self, id: Id) -> RmResult<Assignment>;
    async fn assignments(&self) -> RmResult<Vec<Assignment>>;
    async fn assignments_for_resource(&self, resource_id: Id) -> RmResult<Vec<Assignment>>;
    async fn assignments_for_project(&self, project_id: Id) -> RmResult<Vec<Assignment>>;

    // -- requests ---------------------------------------------------------

    async fn request(&self, id: Id) -> RmResult<Request>;
    async fn requests(&self, filter: RequestFilter) -> RmResult<Vec<Request>>;
    /// Insert a pending request. Enforces at most one pending request per
    /// targeted assignment, and no duplicate pending ASSIGN for the same
    /// (resource, project, role); violations are state conflicts.
    async fn insert_request(&self, request: Request) -> RmResult<Request>;

    // -- workflow ---------------------------------------------------------

    async fn apply(&self, effect: Effect) -> RmResult<EffectOutcome>;

    /// Expire active assignments whose end date has passed, skipping any
    /// with a pending EXTEND request, then close projects left with
    /// assignments but none active. Idempotent.
    async fn expire_overdue(&self, today: NaiveDate) -> RmResult<SweepOutcome>;

    // -- history ----------------------------------------------------------

    async fn append_history(&self, entry: HistoryLog) -> RmResult<HistoryLog>;
    async fn history(&self) -> RmResult<Vec<HistoryLog>>;
}
