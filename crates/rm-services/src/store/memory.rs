//! In-memory ledger store
//!
//! Backs unit tests and database-less runs. A single `RwLock` over the
//! whole state serializes mutations, which gives every `apply` the same
//! all-or-nothing semantics the PostgreSQL store gets from transactions.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use rm_core::error::{ConflictCode, RmError};
use rm_core::result::RmResult;
use rm_core::traits::{Entity, Id};
use rm_models::{
    Assignment, AssignmentStatus, HistoryLog, Project, ProjectStatus, Request, RequestFilter,
    RequestKind, RequestPayload, RequestStatus, Resource, User,
};

use super::{Effect, EffectOutcome, LedgerStore, SweepOutcome};

#[derive(Debug, Default)]
struct State {
    users: Vec<User>,
    resources: Vec<Resource>,
    projects: Vec<Project>,
    assignments: Vec<Assignment>,
    requests: Vec<Request>,
    history: Vec<HistoryLog>,
    next_id: Id,
}

impl State {
    fn allocate_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }

    fn assignment_mut(&mut self, id: Id) -> RmResult<&mut Assignment> {
        self.assignments
            .iter_mut()
            .find(|a| a.id == Some(id))
            .ok_or_else(|| RmError::not_found(Assignment::TYPE_NAME, id))
    }

    fn project_mut(&mut self, id: Id) -> RmResult<&mut Project> {
        self.projects
            .iter_mut()
            .find(|p| p.id == Some(id))
            .ok_or_else(|| RmError::not_found(Project::TYPE_NAME, id))
    }

    /// Flip a pending request to a terminal status; conflict if it already
    /// left `Pending`.
    fn finish_request(
        &mut self,
        id: Id,
        status: RequestStatus,
        rejection_reason: Option<String>,
    ) -> RmResult<()> {
        let request = self
            .requests
            .iter_mut()
            .find(|r| r.id == Some(id))
            .ok_or_else(|| RmError::not_found(Request::TYPE_NAME, id))?;
        if !request.is_pending() {
            return Err(RmError::state_conflict(format!(
                "request {} is {}, not PENDING",
                id,
                request.status.as_str()
            )));
        }
        request.status = status;
        request.rejection_reason = rejection_reason;
        Ok(())
    }

    fn active_count_for_project(&self, project_id: Id) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.project_id == project_id && a.is_active())
            .count()
    }

    fn total_count_for_project(&self, project_id: Id) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.project_id == project_id)
            .count()
    }

    /// Close the project when it has assignments but none active. Returns
    /// whether it closed just now.
    fn auto_close_if_idle(&mut self, project_id: Id) -> RmResult<bool> {
        if self.active_count_for_project(project_id) > 0
            || self.total_count_for_project(project_id) == 0
        {
            return Ok(false);
        }
        let project = self.project_mut(project_id)?;
        if project.status == ProjectStatus::Closed {
            return Ok(false);
        }
        project.status = ProjectStatus::Closed;
        Ok(true)
    }

    fn has_pending_extend(&self, assignment_id: Id) -> bool {
        self.requests.iter().any(|r| {
            r.is_pending()
                && r.kind() == RequestKind::Extend
                && r.payload.assignment_id() == Some(assignment_id)
        })
    }
}

/// In-process ledger store
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn user(&self, id: Id) -> RmResult<User> {
        self.state
            .read()
            .users
            .iter()
            .find(|u| u.id == Some(id))
            .cloned()
            .ok_or_else(|| RmError::not_found(User::TYPE_NAME, id))
    }

    async fn users(&self) -> RmResult<Vec<User>> {
        Ok(self.state.read().users.clone())
    }

    async fn insert_user(&self, mut user: User) -> RmResult<User> {
        let mut state = self.state.write();
        user.id = Some(state.allocate_id());
        state.users.push(user.clone());
        Ok(user)
    }

    async fn resource(&self, id: Id) -> RmResult<Resource> {
        self.state
            .read()
            .resources
            .iter()
            .find(|r| r.id == Some(id))
            .cloned()
            .ok_or_else(|| RmError::not_found(Resource::TYPE_NAME, id))
    }

    async fn resources(&self) -> RmResult<Vec<Resource>> {
        Ok(self.state.read().resources.clone())
    }

    async fn resource_count(&self) -> RmResult<i64> {
        Ok(self.state.read().resources.len() as i64)
    }

    async fn resource_email_exists(&self, email: &str) -> RmResult<bool> {
        Ok(self
            .state
            .read()
            .resources
            .iter()
            .any(|r| r.email.eq_ignore_ascii_case(email)))
    }

    async fn insert_resource(&self, mut resource: Resource) -> RmResult<Resource> {
        let mut state = self.state.write();
        if state
            .resources
            .iter()
            .any(|r| r.email.eq_ignore_ascii_case(&resource.email))
        {
            return Err(RmError::state_conflict(format!(
                "email {} already exists",
                resource.email
            )));
        }
        resource.id = Some(state.allocate_id());
        resource.created_at = Some(Utc::now());
        state.resources.push(resource.clone());
        Ok(resource)
    }

    async fn update_resource(&self, resource: Resource) -> RmResult<Resource> {
        let id = resource
            .id
            .ok_or_else(|| RmError::Internal("update of unsaved resource".into()))?;
        let mut state = self.state.write();
        let slot = state
            .resources
            .iter_mut()
            .find(|r| r.id == Some(id))
            .ok_or_else(|| RmError::not_found(Resource::TYPE_NAME, id))?;
        *slot = resource.clone();
        Ok(resource)
    }

    async fn delete_resource(&self, id: Id) -> RmResult<()> {
        let mut state = self.state.write();
        if !state.resources.iter().any(|r| r.id == Some(id)) {
            return Err(RmError::not_found(Resource::TYPE_NAME, id));
        }
        let active = state
            .assignments
            .iter()
            .any(|a| a.resource_id == id && a.is_active());
        if active {
            return Err(RmError::capacity_conflict(
                "cannot delete a resource with active assignments",
            ));
        }
        state.assignments.retain(|a| a.resource_id != id);
        state.requests.retain(|r| match &r.payload {
            RequestPayload::Assign { resource_id, .. } => *resource_id != id,
            _ => true,
        });
        state.resources.retain(|r| r.id != Some(id));
        Ok(())
    }

    async fn project(&self, id: Id) -> RmResult<Project> {
        self.state
            .read()
            .projects
            .iter()
            .find(|p| p.id == Some(id))
            .cloned()
            .ok_or_else(|| RmError::not_found(Project::TYPE_NAME, id))
    }

    async fn projects(&self) -> RmResult<Vec<Project>> {
        Ok(self.state.read().projects.clone())
    }

    async fn insert_project(&self, mut project: Project) -> RmResult<Project> {
        let mut state = self.state.write();
        project.id = Some(state.allocate_id());
        project.created_at = Some(Utc::now());
        state.projects.push(project.clone());
        Ok(project)
    }

    async fn update_project(&self, project: Project) -> RmResult<Project> {
        let id = project
            .id
            .ok_or_else(|| RmError::Internal("update of unsaved project".into()))?;
        let mut state = self.state.write();
        let slot = state
            .projects
            .iter_mut()
            .find(|p| p.id == Some(id))
            .ok_or_else(|| RmError::not_found(Project::TYPE_NAME, id))?;
        *slot = project.clone();
        Ok(project)
    }

    async fn delete_project(&self, id: Id) -> RmResult<()> {
        let mut state = self.state.write();
        if !state.projects.iter().any(|p| p.id == Some(id)) {
            return Err(RmError::not_found(Project::TYPE_NAME, id));
        }
        if state.active_count_for_project(id) > 0 {
            return Err(RmError::capacity_conflict(
                "cannot delete a project with active assignments",
            ));
        }
        state.assignments.retain(|a| a.project_id != id);
        state.projects.retain(|p| p.id != Some(id));
        Ok(())
    }

    async fn assignment(&self, id: Id) -> RmResult<Assignment> {
        self.state
            .read()
            .assignments
            .iter()
            .find(|a| a.id == Some(id))
            .cloned()
            .ok_or_else(|| RmError::not_found(Assignment::TYPE_NAME, id))
    }

    async fn assignments(&self) -> RmResult<Vec<Assignment>> {
        Ok(self.state.read().assignments.clone())
    }

    async fn assignments_for_resource(&self, resource_id: Id) -> RmResult<Vec<Assignment>> {
        Ok(self
            .state
            .read()
            .assignments
            .iter()
            .filter(|a| a.resource_id == resource_id)
            .cloned()
            .collect())
    }

    async fn assignments_for_project(&self, project_id: Id) -> RmResult<Vec<Assignment>> {
        Ok(self
            .state
            .read()
            .assignments
            .iter()
            .filter(|a| a.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn request(&self, id: Id) -> RmResult<Request> {
        self.state
            .read()
            .requests
            .iter()
            .find(|r| r.id == Some(id))
            .cloned()
            .ok_or_else(|| RmError::not_found(Request::TYPE_NAME, id))
    }

    async fn requests(&self, filter: RequestFilter) -> RmResult<Vec<Request>> {
        Ok(self
            .state
            .read()
            .requests
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn insert_request(&self, mut request: Request) -> RmResult<Request> {
        let mut state = self.state.write();

        if let Some(assignment_id) = request.payload.assignment_id() {
            let open_exists = state.requests.iter().any(|r| {
                r.is_pending() && r.payload.assignment_id() == Some(assignment_id)
            });
            if open_exists {
                return Err(RmError::state_conflict(format!(
                    "assignment {} already has a pending request",
                    assignment_id
                )));
            }
        }

        if let RequestPayload::Assign {
            resource_id,
            project_id,
            ref role,
            ..
        } = request.payload
        {
            let duplicate = state.requests.iter().any(|r| {
                r.is_pending()
                    && matches!(
                        &r.payload,
                        RequestPayload::Assign {
                            resource_id: rid,
                            project_id: pid,
                            role: existing_role,
                            ..
                        } if *rid == resource_id && *pid == project_id && existing_role == role
                    )
            });
            if duplicate {
                return Err(RmError::state_conflict(
                    "a pending assignment request already exists for this resource and role",
                ));
            }
        }

        request.id = Some(state.allocate_id());
        request.created_at = Some(Utc::now());
        state.requests.push(request.clone());
        Ok(request)
    }

    async fn apply(&self, effect: Effect) -> RmResult<EffectOutcome> {
        let mut state = self.state.write();
        let mut outcome = EffectOutcome::default();

        match effect {
            Effect::Assign {
                request_id,
                new,
                log,
            } => {
                // All checks before the first write; there is no rollback here.
                let project = state
                    .projects
                    .iter()
                    .find(|p| p.id == Some(new.project_id))
                    .ok_or_else(|| RmError::not_found(Project::TYPE_NAME, new.project_id))?;
                if project.is_closed() {
                    return Err(RmError::validation(
                        ConflictCode::ProjectClosed,
                        "cannot assign resources to a CLOSED project",
                    ));
                }
                if let Some(id) = request_id {
                    state.finish_request(id, RequestStatus::Approved, None)?;
                }
                let mut assignment = new.into_assignment();
                assignment.id = Some(state.allocate_id());
                state.assignments.push(assignment.clone());
                state.history.push(log);
                outcome.assignment = Some(assignment);
            }

            Effect::Extend {
                request_id,
                assignment_id,
                new_end_date,
                log,
            } => {
                {
                    let assignment = state.assignment_mut(assignment_id)?;
                    if !assignment.is_active() {
                        return Err(RmError::state_conflict(format!(
                            "assignment {} is {}, not ACTIVE",
                            assignment_id,
                            assignment.status.as_str()
                        )));
                    }
                    if new_end_date <= assignment.end_date {
                        return Err(RmError::validation(
                            ConflictCode::NotAnExtension,
                            "new end date must be after the current end date",
                        ));
                    }
                }
                if let Some(id) = request_id {
                    state.finish_request(id, RequestStatus::Approved, None)?;
                }
                let assignment = state.assignment_mut(assignment_id)?;
                assignment.end_date = new_end_date;
                outcome.assignment = Some(assignment.clone());
                state.history.push(log);
            }

            Effect::Release {
                request_id,
                assignment_id,
                effective_end,
                log,
                auto_close_log,
            } => {
                {
                    let assignment = state.assignment_mut(assignment_id)?;
                    if !assignment.is_active() {
                        return Err(RmError::state_conflict(format!(
                            "assignment {} is {}, not ACTIVE",
                            assignment_id,
                            assignment.status.as_str()
                        )));
                    }
                }
                if let Some(id) = request_id {
                    state.finish_request(id, RequestStatus::Approved, None)?;
                }
                let assignment = state.assignment_mut(assignment_id)?;
                assignment.status = AssignmentStatus::Released;
                assignment.end_date = assignment.end_date.min(effective_end);
                let project_id = assignment.project_id;
                outcome.assignment = Some(assignment.clone());
                state.history.push(log);

                if state.auto_close_if_idle(project_id)? {
                    state.history.push(auto_close_log);
                    outcome.project_closed = true;
                }
            }

            Effect::CreateProject {
                request_id,
                project,
                plan,
                log,
            } => {
                for item in &plan {
                    if !state.resources.iter().any(|r| r.id == Some(item.resource_id)) {
                        return Err(RmError::not_found(Resource::TYPE_NAME, item.resource_id));
                    }
                }
                if let Some(id) = request_id {
                    state.finish_request(id, RequestStatus::Approved, None)?;
                }
                let mut project = project;
                let project_id = state.allocate_id();
                project.id = Some(project_id);
                project.created_at = Some(Utc::now());
                for item in plan {
                    let assignment = Assignment {
                        id: Some(state.allocate_id()),
                        resource_id: item.resource_id,
                        project_id,
                        role: item.role,
                        start_date: item.start_date,
                        end_date: item.end_date,
                        status: AssignmentStatus::Active,
                    };
                    state.assignments.push(assignment);
                }
                state.projects.push(project.clone());
                state.history.push(log);
                outcome.project = Some(project);
            }

            Effect::Reject {
                request_id,
                reason,
                log,
            } => {
                state.finish_request(request_id, RequestStatus::Rejected, Some(reason))?;
                state.history.push(log);
            }
        }

        Ok(outcome)
    }

    async fn expire_overdue(&self, today: NaiveDate) -> RmResult<SweepOutcome> {
        let mut state = self.state.write();
        let mut outcome = SweepOutcome::default();

        let overdue: Vec<Id> = state
            .assignments
            .iter()
            .filter(|a| a.overdue(today))
            .filter_map(|a| a.id)
            .collect();

        for id in overdue {
            if state.has_pending_extend(id) {
                continue;
            }
            if let Ok(assignment) = state.assignment_mut(id) {
                assignment.status = AssignmentStatus::Expired;
                outcome.expired_assignments += 1;
            }
        }

        let project_ids: Vec<Id> = state.projects.iter().filter_map(|p| p.id).collect();
        for project_id in project_ids {
            if state.auto_close_if_idle(project_id)? {
                outcome.closed_projects += 1;
            }
        }

        Ok(outcome)
    }

    async fn append_history(&self, mut entry: HistoryLog) -> RmResult<HistoryLog> {
        let mut state = self.state.write();
        entry.id = Some(state.allocate_id());
        state.history.push(entry.clone());
        Ok(entry)
    }

    async fn history(&self) -> RmResult<Vec<HistoryLog>> {
        Ok(self.state.read().history.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rm_models::{NewAssignment, UserRole};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn log() -> HistoryLog {
        HistoryLog::record(
            rm_models::EntityKind::Assignment,
            "TEST",
            "test entry",
            1,
            Utc::now(),
        )
    }

    async fn seeded() -> (MemoryStore, Id, Id) {
        let store = MemoryStore::new();
        let resource = store
            .insert_resource(Resource::new("Ada", "EMP001", "ada@example.com"))
            .await
            .unwrap();
        let project = store
            .insert_project(Project::new("Billing", "Acme", 1))
            .await
            .unwrap();
        (store, resource.id.unwrap(), project.id.unwrap())
    }

    #[tokio::test]
    async fn test_assign_effect_creates_active_assignment() {
        let (store, rid, pid) = seeded().await;
        let outcome = store
            .apply(Effect::Assign {
                request_id: None,
                new: NewAssignment {
                    resource_id: rid,
                    project_id: pid,
                    role: "Backend Developer".into(),
                    start_date: d(2024, 1, 1),
                    end_date: d(2024, 6, 30),
                },
                log: log(),
            })
            .await
            .unwrap();

        let assignment = outcome.assignment.unwrap();
        assert_eq!(assignment.status, AssignmentStatus::Active);
        assert_eq!(store.assignments().await.unwrap().len(), 1);
        assert_eq!(store.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_assign_to_closed_project_rolls_back() {
        let (store, rid, pid) = seeded().await;
        let mut project = store.project(pid).await.unwrap();
        project.status = ProjectStatus::Closed;
        store.update_project(project).await.unwrap();

        let err = store
            .apply(Effect::Assign {
                request_id: None,
                new: NewAssignment {
                    resource_id: rid,
                    project_id: pid,
                    role: "QA".into(),
                    start_date: d(2024, 1, 1),
                    end_date: d(2024, 2, 1),
                },
                log: log(),
            })
            .await
            .unwrap_err();
        assert!(err.has_code(ConflictCode::ProjectClosed));
        assert!(store.assignments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_release_last_assignment_closes_project() {
        let (store, rid, pid) = seeded().await;
        let assignment = store
            .apply(Effect::Assign {
                request_id: None,
                new: NewAssignment {
                    resource_id: rid,
                    project_id: pid,
                    role: "QA".into(),
                    start_date: d(2024, 1, 1),
                    end_date: d(2024, 6, 30),
                },
                log: log(),
            })
            .await
            .unwrap()
            .assignment
            .unwrap();

        let outcome = store
            .apply(Effect::Release {
                request_id: None,
                assignment_id: assignment.id.unwrap(),
                effective_end: d(2024, 3, 1),
                log: log(),
                auto_close_log: log(),
            })
            .await
            .unwrap();

        assert!(outcome.project_closed);
        let released = outcome.assignment.unwrap();
        assert_eq!(released.status, AssignmentStatus::Released);
        assert_eq!(released.end_date, d(2024, 3, 1));
        assert!(store.project(pid).await.unwrap().is_closed());
    }

    #[tokio::test]
    async fn test_one_pending_request_per_assignment() {
        let (store, _rid, _pid) = seeded().await;
        let payload = RequestPayload::Extend {
            assignment_id: 42,
            new_end_date: d(2024, 7, 31),
            current_end_date: None,
            reason: "more work".into(),
        };
        store
            .insert_request(Request::pending(2, payload.clone()))
            .await
            .unwrap();

        let competing = RequestPayload::Release {
            assignment_id: 42,
            release_date: d(2024, 5, 1),
            reason: "rolling off".into(),
        };
        let err = store
            .insert_request(Request::pending(3, competing))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn test_finish_request_twice_conflicts() {
        let (store, rid, pid) = seeded().await;
        let request = store
            .insert_request(Request::pending(
                2,
                RequestPayload::Assign {
                    resource_id: rid,
                    project_id: pid,
                    role: "QA".into(),
                    start_date: d(2024, 1, 1),
                    end_date: d(2024, 2, 1),
                },
            ))
            .await
            .unwrap();

        let effect = |req_id| Effect::Assign {
            request_id: Some(req_id),
            new: NewAssignment {
                resource_id: rid,
                project_id: pid,
                role: "QA".into(),
                start_date: d(2024, 1, 1),
                end_date: d(2024, 2, 1),
            },
            log: log(),
        };

        store.apply(effect(request.id.unwrap())).await.unwrap();
        let err = store.apply(effect(request.id.unwrap())).await.unwrap_err();
        assert_eq!(err.error_code(), "state_conflict");
        // The losing apply must not have written a second assignment.
        assert_eq!(store.assignments().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_expires_and_skips_pending_extend() {
        let (store, rid, pid) = seeded().await;
        let first = store
            .apply(Effect::Assign {
                request_id: None,
                new: NewAssignment {
                    resource_id: rid,
                    project_id: pid,
                    role: "QA".into(),
                    start_date: d(2024, 1, 1),
                    end_date: d(2024, 2, 1),
                },
                log: log(),
            })
            .await
            .unwrap()
            .assignment
            .unwrap();
        let second = store
            .apply(Effect::Assign {
                request_id: None,
                new: NewAssignment {
                    resource_id: rid,
                    project_id: pid,
                    role: "DBA".into(),
                    start_date: d(2024, 1, 1),
                    end_date: d(2024, 2, 1),
                },
                log: log(),
            })
            .await
            .unwrap()
            .assignment
            .unwrap();

        // Pending extension shields the second assignment from expiry.
        store
            .insert_request(Request::pending(
                2,
                RequestPayload::Extend {
                    assignment_id: second.id.unwrap(),
                    new_end_date: d(2024, 9, 30),
                    current_end_date: Some(second.end_date),
                    reason: "phase two".into(),
                },
            ))
            .await
            .unwrap();

        let outcome = store.expire_overdue(d(2024, 3, 1)).await.unwrap();
        assert_eq!(outcome.expired_assignments, 1);
        assert_eq!(
            store.assignment(first.id.unwrap()).await.unwrap().status,
            AssignmentStatus::Expired
        );
        assert_eq!(
            store.assignment(second.id.unwrap()).await.unwrap().status,
            AssignmentStatus::Active
        );

        // Running again changes nothing.
        let again = store.expire_overdue(d(2024, 3, 1)).await.unwrap();
        assert_eq!(again.expired_assignments, 0);
    }

    #[tokio::test]
    async fn test_delete_project_guard() {
        let (store, rid, pid) = seeded().await;
        store
            .apply(Effect::Assign {
                request_id: None,
                new: NewAssignment {
                    resource_id: rid,
                    project_id: pid,
                    role: "QA".into(),
                    start_date: d(2024, 1, 1),
                    end_date: d(2024, 6, 30),
                },
                log: log(),
            })
            .await
            .unwrap();

        let err = store.delete_project(pid).await.unwrap_err();
        assert_eq!(err.error_code(), "capacity_conflict");
    }

    #[tokio::test]
    async fn test_unique_email() {
        let (store, _, _) = seeded().await;
        let err = store
            .insert_resource(Resource::new("Ada Clone", "EMP002", "ada@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn test_insert_user_assigns_id() {
        let store = MemoryStore::new();
        let user = store
            .insert_user(User::new("Root", "root@example.com", UserRole::Admin))
            .await
            .unwrap();
        assert!(user.id.is_some());
        assert_eq!(store.users().await.unwrap().len(), 1);
    }
}
