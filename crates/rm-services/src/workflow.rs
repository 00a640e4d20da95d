//! Request workflow engine
//!
//! Single entry point for every mutation of assignment state. The caller's
//! role decides the path: administrators apply immediately (no request row
//! is materialized), everyone else gets a pending request that a later
//! approval re-validates against current state and applies, or a rejection
//! discards with a mandatory reason.
//!
//! Validation and application share one routine, so the direct path and
//! the approval path can never diverge on the business rules.

use std::sync::Arc;

use chrono::Utc;
use rm_core::error::{ConflictCode, RmError, ValidationErrors};
use rm_core::result::RmResult;
use rm_core::traits::{AuthContext, Id};
use rm_core::types::DateRange;
use rm_models::{
    EntityKind, HistoryLog, NewAssignment, Project, Request, RequestFilter, RequestPayload,
};
use tracing::{debug, info};

use crate::store::{Effect, EffectOutcome, LedgerStore};
use crate::validator;

/// What `submit` did with the intent.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Caller had direct authority; the mutation is already applied.
    Applied(EffectOutcome),
    /// A pending request was recorded for later approval.
    Requested(Request),
}

pub struct WorkflowEngine {
    store: Arc<dyn LedgerStore>,
}

impl WorkflowEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Submit a mutation intent.
    ///
    /// Admin callers bypass the queue: the intent is validated and applied
    /// in one step. Other callers get a `PENDING` request; the store
    /// guarantees at most one open request per assignment.
    pub async fn submit(
        &self,
        payload: RequestPayload,
        caller: &dyn AuthContext,
    ) -> RmResult<SubmitOutcome> {
        self.validate(&payload).await?;

        if caller.is_admin() {
            let effect = self
                .build_effect(None, &payload, caller.user_id(), true)
                .await?;
            let outcome = self.store.apply(effect).await?;
            info!(kind = payload.kind().as_str(), "applied direct mutation");
            return Ok(SubmitOutcome::Applied(outcome));
        }

        let payload = self.snapshot(payload).await?;
        let request = self
            .store
            .insert_request(Request::pending(caller.user_id(), payload))
            .await?;
        info!(
            request_id = ?request.id,
            kind = request.kind().as_str(),
            "recorded pending request"
        );
        Ok(SubmitOutcome::Requested(request))
    }

    /// Approve a pending request: re-validate against *current* state and
    /// apply. On validation failure the request stays `PENDING` and the
    /// error is returned to the approver.
    pub async fn approve(&self, request_id: Id, approver: &dyn AuthContext) -> RmResult<Request> {
        if !approver.is_admin() {
            return Err(RmError::forbidden("only administrators can approve requests"));
        }

        let request = self.store.request(request_id).await?;
        if !request.is_pending() {
            return Err(RmError::state_conflict(format!(
                "request {} is {}, not PENDING",
                request_id,
                request.status.as_str()
            )));
        }

        if let Err(err) = self.validate(&request.payload).await {
            debug!(request_id, "approval blocked by validation: {}", err);
            return Err(err);
        }

        let effect = self
            .build_effect(
                Some(request_id),
                &request.payload,
                request.requester_id,
                false,
            )
            .await?;
        self.store.apply(effect).await?;
        info!(request_id, "approved request");
        self.store.request(request_id).await
    }

    /// Reject a pending request with a non-blank reason. No ledger
    /// mutation occurs; the reason is stored verbatim for the requester.
    pub async fn reject(
        &self,
        request_id: Id,
        approver: &dyn AuthContext,
        reason: &str,
    ) -> RmResult<Request> {
        if !approver.is_admin() {
            return Err(RmError::forbidden("only administrators can reject requests"));
        }
        if reason.trim().is_empty() {
            return Err(RmError::validation(
                ConflictCode::ReasonRequired,
                "a rejection reason must be given",
            ));
        }

        let request = self.store.request(request_id).await?;
        if !request.is_pending() {
            return Err(RmError::state_conflict(format!(
                "request {} is {}, not PENDING",
                request_id,
                request.status.as_str()
            )));
        }

        let requester_name = self
            .store
            .user(request.requester_id)
            .await
            .map(|u| u.name)
            .unwrap_or_else(|_| format!("user {}", request.requester_id));

        let log = HistoryLog::record(
            EntityKind::Request,
            "REJECT",
            format!(
                "Rejected {} request by {}",
                request.kind().as_str(),
                requester_name
            ),
            approver.user_id(),
            Utc::now(),
        );
        self.store
            .apply(Effect::Reject {
                request_id,
                reason: reason.trim().to_string(),
                log,
            })
            .await?;
        info!(request_id, "rejected request");
        self.store.request(request_id).await
    }

    pub async fn requests(&self, filter: RequestFilter) -> RmResult<Vec<Request>> {
        self.store.requests(filter).await
    }

    /// Terminal requests only, for the history/read surface.
    pub async fn request_history(&self) -> RmResult<Vec<Request>> {
        self.store
            .requests(RequestFilter {
                terminal_only: true,
                ..Default::default()
            })
            .await
    }

    /// Run the conflict validator for an intent against current state.
    async fn validate(&self, payload: &RequestPayload) -> RmResult<()> {
        match payload {
            RequestPayload::Assign {
                resource_id,
                project_id,
                role,
                start_date,
                end_date,
            } => {
                self.store.resource(*resource_id).await?;
                let project = self.store.project(*project_id).await?;
                let on_project: Vec<_> = self
                    .store
                    .assignments_for_resource(*resource_id)
                    .await?
                    .into_iter()
                    .filter(|a| a.project_id == *project_id)
                    .collect();
                validator::validate_assign(
                    &project,
                    role,
                    DateRange::new(*start_date, *end_date),
                    &on_project,
                )
            }
            RequestPayload::Extend {
                assignment_id,
                new_end_date,
                reason,
                ..
            } => {
                let assignment = self.store.assignment(*assignment_id).await?;
                validator::validate_extend(&assignment, *new_end_date, reason)
            }
            RequestPayload::Release {
                assignment_id,
                release_date,
                reason,
            } => {
                let assignment = self.store.assignment(*assignment_id).await?;
                validator::validate_release(&assignment, *release_date, reason)
            }
            RequestPayload::Project {
                project_name,
                client_name,
                resource_plan,
                ..
            } => {
                let mut errors = ValidationErrors::new();
                if project_name.trim().is_empty() {
                    errors.add("projectName", "must not be blank");
                }
                if client_name.trim().is_empty() {
                    errors.add("clientName", "must not be blank");
                }
                errors.into_result()?;
                for item in resource_plan {
                    self.store.resource(item.resource_id).await?;
                }
                validator::validate_plan(resource_plan)
            }
        }
    }

    /// Freeze display context into the payload at submission time.
    async fn snapshot(&self, payload: RequestPayload) -> RmResult<RequestPayload> {
        match payload {
            RequestPayload::Extend {
                assignment_id,
                new_end_date,
                reason,
                ..
            } => {
                let assignment = self.store.assignment(assignment_id).await?;
                Ok(RequestPayload::Extend {
                    assignment_id,
                    new_end_date,
                    current_end_date: Some(assignment.end_date),
                    reason,
                })
            }
            other => Ok(other),
        }
    }

    /// Translate a validated intent into the atomic effect the store
    /// commits. `performer` is the requester on approvals and the acting
    /// admin on direct mutations.
    async fn build_effect(
        &self,
        request_id: Option<Id>,
        payload: &RequestPayload,
        performer: Id,
        direct: bool,
    ) -> RmResult<Effect> {
        let now = Utc::now();
        match payload {
            RequestPayload::Assign {
                resource_id,
                project_id,
                role,
                start_date,
                end_date,
            } => {
                let resource = self.store.resource(*resource_id).await?;
                let project = self.store.project(*project_id).await?;
                let description = if direct {
                    format!(
                        "Admin directly assigned {} to project {} as {}",
                        resource.name, project.name, role
                    )
                } else {
                    format!(
                        "Assigned {} to project {} as {}",
                        resource.name, project.name, role
                    )
                };
                Ok(Effect::Assign {
                    request_id,
                    new: NewAssignment {
                        resource_id: *resource_id,
                        project_id: *project_id,
                        role: role.clone(),
                        start_date: *start_date,
                        end_date: *end_date,
                    },
                    log: HistoryLog::record(
                        EntityKind::Assignment,
                        "ASSIGN",
                        description,
                        performer,
                        now,
                    ),
                })
            }
            RequestPayload::Extend {
                assignment_id,
                new_end_date,
                reason,
                ..
            } => Ok(Effect::Extend {
                request_id,
                assignment_id: *assignment_id,
                new_end_date: *new_end_date,
                log: HistoryLog::record(
                    EntityKind::Assignment,
                    "EXTEND",
                    format!("Extended assignment until {} - {}", new_end_date, reason),
                    performer,
                    now,
                ),
            }),
            RequestPayload::Release {
                assignment_id,
                release_date,
                reason,
            } => {
                let assignment = self.store.assignment(*assignment_id).await?;
                let effective_end = validator::effective_release_end(&assignment, *release_date);
                Ok(Effect::Release {
                    request_id,
                    assignment_id: *assignment_id,
                    effective_end,
                    log: HistoryLog::record(
                        EntityKind::Assignment,
                        "RELEASE",
                        format!("Released from project on {} - {}", effective_end, reason),
                        performer,
                        now,
                    ),
                    auto_close_log: HistoryLog::record(
                        EntityKind::Project,
                        "AUTO_CLOSE",
                        "Project closed automatically as all resources were released",
                        performer,
                        now,
                    ),
                })
            }
            RequestPayload::Project {
                project_name,
                client_name,
                resource_plan,
                ..
            } => Ok(Effect::CreateProject {
                request_id,
                project: Project::new(project_name.clone(), client_name.clone(), performer),
                plan: resource_plan.clone(),
                log: HistoryLog::record(
                    EntityKind::Project,
                    "CREATE",
                    format!("Created project {} for {}", project_name, client_name),
                    performer,
                    now,
                ),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger;
    use crate::store::memory::MemoryStore;
    use chrono::NaiveDate;
    use rm_core::traits::Caller;
    use rm_models::{
        AssignmentStatus, PlanItem, ProjectStatus, RequestKind, RequestStatus, Resource,
        ResourceStatus, UpdateProjectDto, User, UserRole,
    };

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    struct Fixture {
        engine: WorkflowEngine,
        store: Arc<MemoryStore>,
        admin: Caller,
        manager: Caller,
        resource_id: Id,
        project_id: Id,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let admin = store
            .insert_user(User::new("Root", "root@example.com", UserRole::Admin))
            .await
            .unwrap();
        let manager = store
            .insert_user(User::new("PM", "pm@example.com", UserRole::DevMan))
            .await
            .unwrap();
        let resource = store
            .insert_resource(Resource::new("Ada", "EMP001", "ada@example.com"))
            .await
            .unwrap();
        let project = store
            .insert_project(Project::new("Billing", "Acme", manager.id.unwrap()))
            .await
            .unwrap();

        Fixture {
            engine: WorkflowEngine::new(store.clone()),
            store,
            admin: Caller::admin(admin.id.unwrap()),
            manager: Caller::manager(manager.id.unwrap()),
            resource_id: resource.id.unwrap(),
            project_id: project.id.unwrap(),
        }
    }

    fn assign_payload(f: &Fixture) -> RequestPayload {
        RequestPayload::Assign {
            resource_id: f.resource_id,
            project_id: f.project_id,
            role: "Backend Developer".into(),
            start_date: d(2024, 1, 1),
            end_date: d(2024, 6, 30),
        }
    }

    async fn assigned_fixture() -> (Fixture, Id) {
        let f = fixture().await;
        let outcome = f.engine.submit(assign_payload(&f), &f.admin).await.unwrap();
        let assignment = match outcome {
            SubmitOutcome::Applied(outcome) => outcome.assignment.unwrap(),
            SubmitOutcome::Requested(_) => panic!("admin submit should apply directly"),
        };
        let id = assignment.id.unwrap();
        (f, id)
    }

    #[tokio::test]
    async fn test_admin_bypass_materializes_no_request() {
        let (f, _assignment_id) = assigned_fixture().await;
        let requests = f.engine.requests(RequestFilter::default()).await.unwrap();
        assert!(requests.is_empty());
        assert_eq!(f.store.assignments().await.unwrap().len(), 1);
        // The direct action still leaves an audit trail.
        assert_eq!(f.store.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_manager_submit_queues_pending() {
        let f = fixture().await;
        let outcome = f
            .engine
            .submit(assign_payload(&f), &f.manager)
            .await
            .unwrap();
        let request = match outcome {
            SubmitOutcome::Requested(request) => request,
            SubmitOutcome::Applied(_) => panic!("manager submit must not apply directly"),
        };
        assert_eq!(request.status, RequestStatus::Pending);
        // Nothing hit the ledger yet.
        assert!(f.store.assignments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extend_visible_only_after_approval() {
        let (f, assignment_id) = assigned_fixture().await;

        // Busy mid-assignment, free after the original end.
        let assignments = f.store.assignments_for_resource(f.resource_id).await.unwrap();
        assert_eq!(
            ledger::resource_status(&assignments, d(2024, 3, 15)),
            ResourceStatus::Assigned
        );
        assert_eq!(
            ledger::resource_status(&assignments, d(2024, 7, 15)),
            ResourceStatus::Available
        );

        let outcome = f
            .engine
            .submit(
                RequestPayload::Extend {
                    assignment_id,
                    new_end_date: d(2024, 7, 31),
                    current_end_date: None,
                    reason: "Client extended the milestone".into(),
                },
                &f.manager,
            )
            .await
            .unwrap();
        let request = match outcome {
            SubmitOutcome::Requested(request) => request,
            SubmitOutcome::Applied(_) => panic!("expected pending request"),
        };
        // Submission snapshots the current end date for display.
        assert!(matches!(
            request.payload,
            RequestPayload::Extend { current_end_date: Some(end), .. } if end == d(2024, 6, 30)
        ));

        // Pending request does not change availability.
        let assignments = f.store.assignments_for_resource(f.resource_id).await.unwrap();
        assert_eq!(
            ledger::resource_status(&assignments, d(2024, 7, 15)),
            ResourceStatus::Available
        );

        let approved = f
            .engine
            .approve(request.id.unwrap(), &f.admin)
            .await
            .unwrap();
        assert_eq!(approved.status, RequestStatus::Approved);

        let assignments = f.store.assignments_for_resource(f.resource_id).await.unwrap();
        assert_eq!(
            ledger::resource_status(&assignments, d(2024, 7, 15)),
            ResourceStatus::Assigned
        );
    }

    #[tokio::test]
    async fn test_extend_not_after_current_end_rejected_for_everyone() {
        let (f, assignment_id) = assigned_fixture().await;
        for caller in [&f.admin as &dyn AuthContext, &f.manager] {
            let err = f
                .engine
                .submit(
                    RequestPayload::Extend {
                        assignment_id,
                        new_end_date: d(2024, 6, 30),
                        current_end_date: None,
                        reason: "same date".into(),
                    },
                    caller,
                )
                .await
                .unwrap_err();
            assert!(err.has_code(ConflictCode::NotAnExtension));
        }
    }

    #[tokio::test]
    async fn test_assign_to_closed_project_rejected_on_both_paths() {
        let f = fixture().await;
        let mut project = f.store.project(f.project_id).await.unwrap();
        project.status = ProjectStatus::Closed;
        f.store.update_project(project).await.unwrap();

        let direct = f
            .engine
            .submit(assign_payload(&f), &f.admin)
            .await
            .unwrap_err();
        assert!(direct.has_code(ConflictCode::ProjectClosed));

        let queued = f
            .engine
            .submit(assign_payload(&f), &f.manager)
            .await
            .unwrap_err();
        assert!(queued.has_code(ConflictCode::ProjectClosed));
    }

    #[tokio::test]
    async fn test_approval_revalidates_against_current_state() {
        let f = fixture().await;
        let request = match f
            .engine
            .submit(assign_payload(&f), &f.manager)
            .await
            .unwrap()
        {
            SubmitOutcome::Requested(request) => request,
            SubmitOutcome::Applied(_) => panic!("expected pending request"),
        };

        // Project closes while the request sits in the queue.
        let mut project = f.store.project(f.project_id).await.unwrap();
        project.status = ProjectStatus::Closed;
        f.store.update_project(project).await.unwrap();

        let err = f
            .engine
            .approve(request.id.unwrap(), &f.admin)
            .await
            .unwrap_err();
        assert!(err.has_code(ConflictCode::ProjectClosed));

        // The request was not auto-rejected; it is still pending.
        let reloaded = f.store.request(request.id.unwrap()).await.unwrap();
        assert_eq!(reloaded.status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn test_terminal_requests_are_immutable() {
        let (f, assignment_id) = assigned_fixture().await;
        let request = match f
            .engine
            .submit(
                RequestPayload::Extend {
                    assignment_id,
                    new_end_date: d(2024, 7, 31),
                    current_end_date: None,
                    reason: "phase two".into(),
                },
                &f.manager,
            )
            .await
            .unwrap()
        {
            SubmitOutcome::Requested(request) => request,
            SubmitOutcome::Applied(_) => panic!("expected pending request"),
        };
        let id = request.id.unwrap();

        f.engine.approve(id, &f.admin).await.unwrap();

        let again = f.engine.approve(id, &f.admin).await.unwrap_err();
        assert_eq!(again.error_code(), "state_conflict");
        let reject = f.engine.reject(id, &f.admin, "late").await.unwrap_err();
        assert_eq!(reject.error_code(), "state_conflict");
    }

    #[tokio::test]
    async fn test_reject_requires_reason_and_stores_it() {
        let f = fixture().await;
        let request = match f
            .engine
            .submit(assign_payload(&f), &f.manager)
            .await
            .unwrap()
        {
            SubmitOutcome::Requested(request) => request,
            SubmitOutcome::Applied(_) => panic!("expected pending request"),
        };
        let id = request.id.unwrap();

        let blank = f.engine.reject(id, &f.admin, "   ").await.unwrap_err();
        assert!(blank.has_code(ConflictCode::ReasonRequired));

        let rejected = f
            .engine
            .reject(id, &f.admin, "Budget was cut for Q3")
            .await
            .unwrap();
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(
            rejected.rejection_reason.as_deref(),
            Some("Budget was cut for Q3")
        );
        // No ledger mutation happened.
        assert!(f.store.assignments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_admins_decide() {
        let f = fixture().await;
        let request = match f
            .engine
            .submit(assign_payload(&f), &f.manager)
            .await
            .unwrap()
        {
            SubmitOutcome::Requested(request) => request,
            SubmitOutcome::Applied(_) => panic!("expected pending request"),
        };
        let id = request.id.unwrap();

        let approve = f.engine.approve(id, &f.manager).await.unwrap_err();
        assert_eq!(approve.status_code(), 403);
        let reject = f.engine.reject(id, &f.manager, "no").await.unwrap_err();
        assert_eq!(reject.status_code(), 403);
    }

    #[tokio::test]
    async fn test_second_pending_request_on_same_assignment_conflicts() {
        let (f, assignment_id) = assigned_fixture().await;
        f.engine
            .submit(
                RequestPayload::Extend {
                    assignment_id,
                    new_end_date: d(2024, 7, 31),
                    current_end_date: None,
                    reason: "phase two".into(),
                },
                &f.manager,
            )
            .await
            .unwrap();

        let err = f
            .engine
            .submit(
                RequestPayload::Release {
                    assignment_id,
                    release_date: d(2024, 5, 1),
                    reason: "rolling off".into(),
                },
                &f.manager,
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "state_conflict");
    }

    #[tokio::test]
    async fn test_release_at_start_date_zeroes_duration() {
        let (f, assignment_id) = assigned_fixture().await;
        let outcome = f
            .engine
            .submit(
                RequestPayload::Release {
                    assignment_id,
                    release_date: d(2024, 1, 1),
                    reason: "project descoped".into(),
                },
                &f.admin,
            )
            .await
            .unwrap();
        let assignment = match outcome {
            SubmitOutcome::Applied(outcome) => outcome.assignment.unwrap(),
            SubmitOutcome::Requested(_) => panic!("admin release applies directly"),
        };
        assert_eq!(assignment.status, AssignmentStatus::Released);
        assert_eq!(assignment.start_date, assignment.end_date);
    }

    #[tokio::test]
    async fn test_release_before_start_invalid() {
        let (f, assignment_id) = assigned_fixture().await;
        let err = f
            .engine
            .submit(
                RequestPayload::Release {
                    assignment_id,
                    release_date: d(2023, 12, 31),
                    reason: "impossible".into(),
                },
                &f.admin,
            )
            .await
            .unwrap_err();
        assert!(err.has_code(ConflictCode::InvalidRange));
    }

    #[tokio::test]
    async fn test_project_proposal_approval_creates_project_and_assignments() {
        let f = fixture().await;
        let payload = RequestPayload::Project {
            project_name: "Data Platform".into(),
            client_name: "Globex".into(),
            description: Some("Greenfield build".into()),
            resource_plan: vec![PlanItem {
                resource_id: f.resource_id,
                role: "Data Engineer".into(),
                start_date: d(2024, 2, 1),
                end_date: d(2024, 8, 31),
            }],
        };

        let request = match f.engine.submit(payload, &f.manager).await.unwrap() {
            SubmitOutcome::Requested(request) => request,
            SubmitOutcome::Applied(_) => panic!("expected pending request"),
        };
        let approved = f
            .engine
            .approve(request.id.unwrap(), &f.admin)
            .await
            .unwrap();
        assert_eq!(approved.status, RequestStatus::Approved);

        let projects = f.store.projects().await.unwrap();
        let created = projects
            .iter()
            .find(|p| p.name == "Data Platform")
            .expect("proposal project exists");
        // The requesting manager owns the new project.
        assert_eq!(created.manager_id, f.manager.id);

        let roster = f
            .store
            .assignments_for_project(created.id.unwrap())
            .await
            .unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].role, "Data Engineer");
        assert_eq!(roster[0].status, AssignmentStatus::Active);
    }

    #[tokio::test]
    async fn test_proposal_with_unknown_resource_rejected() {
        let f = fixture().await;
        let payload = RequestPayload::Project {
            project_name: "Ghost".into(),
            client_name: "Globex".into(),
            description: None,
            resource_plan: vec![PlanItem {
                resource_id: 9999,
                role: "QA".into(),
                start_date: d(2024, 2, 1),
                end_date: d(2024, 8, 31),
            }],
        };
        let err = f.engine.submit(payload, &f.manager).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_release_last_member_auto_closes_project() {
        let (f, assignment_id) = assigned_fixture().await;
        let outcome = f
            .engine
            .submit(
                RequestPayload::Release {
                    assignment_id,
                    release_date: d(2024, 4, 1),
                    reason: "wrap-up".into(),
                },
                &f.admin,
            )
            .await
            .unwrap();
        match outcome {
            SubmitOutcome::Applied(outcome) => assert!(outcome.project_closed),
            SubmitOutcome::Requested(_) => panic!("admin release applies directly"),
        }
        assert!(f.store.project(f.project_id).await.unwrap().is_closed());

        // Once closed, the project accepts no new assignments.
        let err = f
            .engine
            .submit(assign_payload(&f), &f.admin)
            .await
            .unwrap_err();
        assert!(err.has_code(ConflictCode::ProjectClosed));
    }

    #[tokio::test]
    async fn test_request_history_lists_terminal_only() {
        let (f, assignment_id) = assigned_fixture().await;
        let first = match f
            .engine
            .submit(
                RequestPayload::Extend {
                    assignment_id,
                    new_end_date: d(2024, 7, 31),
                    current_end_date: None,
                    reason: "phase two".into(),
                },
                &f.manager,
            )
            .await
            .unwrap()
        {
            SubmitOutcome::Requested(request) => request,
            SubmitOutcome::Applied(_) => panic!("expected pending request"),
        };
        f.engine.approve(first.id.unwrap(), &f.admin).await.unwrap();

        // A second, still-pending request.
        f.engine
            .submit(
                RequestPayload::Release {
                    assignment_id,
                    release_date: d(2024, 7, 1),
                    reason: "after extension".into(),
                },
                &f.manager,
            )
            .await
            .unwrap();

        let history = f.engine.request_history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind(), RequestKind::Extend);

        let all = f.engine.requests(RequestFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let pending = f
            .engine
            .requests(RequestFilter {
                status: Some(RequestStatus::Pending),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_closed_project_stays_closed_via_update_guard() {
        let f = fixture().await;
        let ledger = ledger::ProjectLedger::new(f.store.clone());
        ledger
            .update(
                f.project_id,
                UpdateProjectDto {
                    status: Some(ProjectStatus::Closed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let err = ledger
            .update(
                f.project_id,
                UpdateProjectDto {
                    status: Some(ProjectStatus::Hold),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "state_conflict");
    }
}
