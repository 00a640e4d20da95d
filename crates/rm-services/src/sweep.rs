//! Expiry sweep
//!
//! Scheduled task that moves active assignments past their end date into
//! `EXPIRED`, unless a pending extension is still being decided, and closes
//! projects whose roster has fully rolled off. Idempotent: re-running on
//! the same day is a no-op.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};

use crate::store::{LedgerStore, SweepOutcome};
use rm_core::result::RmResult;

pub struct ExpirySweep {
    store: Arc<dyn LedgerStore>,
}

impl ExpirySweep {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// One sweep pass for the given day.
    pub async fn run_once(&self, today: chrono::NaiveDate) -> RmResult<SweepOutcome> {
        let outcome = self.store.expire_overdue(today).await?;
        if outcome.expired_assignments > 0 || outcome.closed_projects > 0 {
            info!(
                expired = outcome.expired_assignments,
                closed_projects = outcome.closed_projects,
                "expiry sweep applied changes"
            );
        }
        Ok(outcome)
    }

    /// Periodic loop for the server; ticks until the task is dropped.
    pub async fn run(self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let today = Utc::now().date_naive();
            if let Err(err) = self.run_once(today).await {
                error!("expiry sweep failed: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::Effect;
    use chrono::NaiveDate;
    use rm_models::{
        AssignmentStatus, EntityKind, HistoryLog, NewAssignment, Project, Resource,
    };

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn test_sweep_expires_overdue_and_closes_empty_projects() {
        let store = Arc::new(MemoryStore::new());
        let resource = store
            .insert_resource(Resource::new("Ada", "EMP001", "ada@example.com"))
            .await
            .unwrap();
        let project = store
            .insert_project(Project::new("Billing", "Acme", 1))
            .await
            .unwrap();
        let assignment = store
            .apply(Effect::Assign {
                request_id: None,
                new: NewAssignment {
                    resource_id: resource.id.unwrap(),
                    project_id: project.id.unwrap(),
                    role: "QA".into(),
                    start_date: d(2024, 1, 1),
                    end_date: d(2024, 2, 1),
                },
                log: HistoryLog::record(
                    EntityKind::Assignment,
                    "ASSIGN",
                    "seed",
                    1,
                    Utc::now(),
                ),
            })
            .await
            .unwrap()
            .assignment
            .unwrap();

        let sweep = ExpirySweep::new(store.clone());

        // Before the end date nothing happens.
        let early = sweep.run_once(d(2024, 1, 15)).await.unwrap();
        assert_eq!(early, SweepOutcome::default());

        // On the end date itself the assignment is still honored.
        let on_end = sweep.run_once(d(2024, 2, 1)).await.unwrap();
        assert_eq!(on_end.expired_assignments, 0);

        // The day after, it expires and the emptied project closes.
        let after = sweep.run_once(d(2024, 2, 2)).await.unwrap();
        assert_eq!(after.expired_assignments, 1);
        assert_eq!(after.closed_projects, 1);
        assert_eq!(
            store.assignment(assignment.id.unwrap()).await.unwrap().status,
            AssignmentStatus::Expired
        );
        assert!(store.project(project.id.unwrap()).await.unwrap().is_closed());

        // Idempotent.
        let repeat = sweep.run_once(d(2024, 2, 2)).await.unwrap();
        assert_eq!(repeat, SweepOutcome::default());
    }

    #[tokio::test]
    async fn test_sweep_leaves_fresh_projects_open() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_project(Project::new("New", "Acme", 1))
            .await
            .unwrap();
        let sweep = ExpirySweep::new(store.clone());
        let outcome = sweep.run_once(d(2024, 2, 2)).await.unwrap();
        // A project with no assignments at all is not auto-closed.
        assert_eq!(outcome.closed_projects, 0);
    }
}
