//! PostgreSQL ledger store
//!
//! Implements `rm_services::LedgerStore`. Every effect runs in one
//! transaction with conditional updates (`... WHERE status = 'PENDING'`,
//! `... WHERE status = 'ACTIVE'`), so concurrent approvals cannot both
//! succeed: the loser sees zero affected rows and gets a state conflict
//! while the transaction rolls back.

use async_trait::async_trait;
use chrono::NaiveDate;
use rm_core::error::{ConflictCode, RmError};
use rm_core::result::RmResult;
use rm_core::traits::{Entity, Id};
use rm_models::{
    Assignment, AssignmentStatus, HistoryLog, Project, Request, RequestFilter, RequestStatus,
    Resource, User,
};
use rm_services::store::{Effect, EffectOutcome, LedgerStore, SweepOutcome};
use sqlx::{PgConnection, PgPool};

use crate::{assignments, history, map_db_err, projects, requests, resources, users};

pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Flip a pending request to a terminal state inside `conn`'s
    /// transaction, diagnosing the failure when it is no longer pending.
    async fn finish_request(
        conn: &mut PgConnection,
        id: Id,
        status: RequestStatus,
        rejection_reason: Option<&str>,
    ) -> RmResult<()> {
        if requests::finish(&mut *conn, id, status, rejection_reason).await? {
            return Ok(());
        }
        match requests::fetch(&mut *conn, id).await? {
            None => Err(RmError::not_found(Request::TYPE_NAME, id)),
            Some(request) => Err(RmError::state_conflict(format!(
                "request {} is {}, not PENDING",
                id,
                request.status.as_str()
            ))),
        }
    }

    /// Explain why a conditional assignment update hit zero rows.
    async fn diagnose_stale_assignment(
        conn: &mut PgConnection,
        id: Id,
    ) -> RmError {
        match assignments::fetch(&mut *conn, id).await {
            Ok(None) => RmError::not_found(Assignment::TYPE_NAME, id),
            Ok(Some(assignment)) if !assignment.is_active() => RmError::state_conflict(format!(
                "assignment {} is {}, not ACTIVE",
                id,
                assignment.status.as_str()
            )),
            Ok(Some(_)) => RmError::validation(
                ConflictCode::NotAnExtension,
                "new end date must be after the current end date",
            ),
            Err(err) => err,
        }
    }

    /// Close the project if it has assignments but none active. Returns
    /// whether it closed just now.
    async fn auto_close_if_idle(conn: &mut PgConnection, project_id: Id) -> RmResult<bool> {
        let result = sqlx::query(
            "UPDATE projects p SET status = 'CLOSED' \
             WHERE p.id = $1 AND p.status <> 'CLOSED' \
               AND EXISTS (SELECT 1 FROM assignments a WHERE a.project_id = p.id) \
               AND NOT EXISTS (SELECT 1 FROM assignments a \
                               WHERE a.project_id = p.id AND a.status = 'ACTIVE')",
        )
        .bind(project_id)
        .execute(&mut *conn)
        .await
        .map_err(map_db_err)?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn user(&self, id: Id) -> RmResult<User> {
        users::fetch(&self.pool, id)
            .await?
            .ok_or_else(|| RmError::not_found(User::TYPE_NAME, id))
    }

    async fn users(&self) -> RmResult<Vec<User>> {
        users::fetch_all(&self.pool).await
    }

    async fn insert_user(&self, user: User) -> RmResult<User> {
        users::insert(&self.pool, &user).await
    }

    async fn resource(&self, id: Id) -> RmResult<Resource> {
        resources::fetch(&self.pool, id)
            .await?
            .ok_or_else(|| RmError::not_found(Resource::TYPE_NAME, id))
    }

    async fn resources(&self) -> RmResult<Vec<Resource>> {
        resources::fetch_all(&self.pool).await
    }

    async fn resource_count(&self) -> RmResult<i64> {
        resources::count(&self.pool).await
    }

    async fn resource_email_exists(&self, email: &str) -> RmResult<bool> {
        resources::email_exists(&self.pool, email).await
    }

    async fn insert_resource(&self, resource: Resource) -> RmResult<Resource> {
        resources::insert(&self.pool, &resource).await
    }

    async fn update_resource(&self, resource: Resource) -> RmResult<Resource> {
        let id = resource
            .id
            .ok_or_else(|| RmError::Internal("update of unsaved resource".into()))?;
        resources::update(&self.pool, id, &resource)
            .await?
            .ok_or_else(|| RmError::not_found(Resource::TYPE_NAME, id))
    }

    async fn delete_resource(&self, id: Id) -> RmResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM resources WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_err)?;
        if !exists {
            return Err(RmError::not_found(Resource::TYPE_NAME, id));
        }

        let active = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM assignments \
             WHERE resource_id = $1 AND status = 'ACTIVE')",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_err)?;
        if active {
            return Err(RmError::capacity_conflict(
                "cannot delete a resource with active assignments",
            ));
        }

        sqlx::query(
            "DELETE FROM requests WHERE resource_id = $1 \
             OR assignment_id IN (SELECT id FROM assignments WHERE resource_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;
        sqlx::query("DELETE FROM assignments WHERE resource_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)
    }

    async fn project(&self, id: Id) -> RmResult<Project> {
        projects::fetch(&self.pool, id)
            .await?
            .ok_or_else(|| RmError::not_found(Project::TYPE_NAME, id))
    }

    async fn projects(&self) -> RmResult<Vec<Project>> {
        projects::fetch_all(&self.pool).await
    }

    async fn insert_project(&self, project: Project) -> RmResult<Project> {
        projects::insert(&self.pool, &project).await
    }

    async fn update_project(&self, project: Project) -> RmResult<Project> {
        let id = project
            .id
            .ok_or_else(|| RmError::Internal("update of unsaved project".into()))?;
        projects::update(&self.pool, id, &project)
            .await?
            .ok_or_else(|| RmError::not_found(Project::TYPE_NAME, id))
    }

    async fn delete_project(&self, id: Id) -> RmResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM projects WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_db_err)?;
        if !exists {
            return Err(RmError::not_found(Project::TYPE_NAME, id));
        }

        let active = assignments::active_count_for_project(&mut *tx, id).await?;
        if active > 0 {
            return Err(RmError::capacity_conflict(
                "cannot delete a project with active assignments",
            ));
        }

        sqlx::query("DELETE FROM requests WHERE project_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        sqlx::query("DELETE FROM assignments WHERE project_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)
    }

    async fn assignment(&self, id: Id) -> RmResult<Assignment> {
        assignments::fetch(&self.pool, id)
            .await?
            .ok_or_else(|| RmError::not_found(Assignment::TYPE_NAME, id))
    }

    async fn assignments(&self) -> RmResult<Vec<Assignment>> {
        assignments::fetch_all(&self.pool).await
    }

    async fn assignments_for_resource(&self, resource_id: Id) -> RmResult<Vec<Assignment>> {
        assignments::fetch_for_resource(&self.pool, resource_id).await
    }

    async fn assignments_for_project(&self, project_id: Id) -> RmResult<Vec<Assignment>> {
        assignments::fetch_for_project(&self.pool, project_id).await
    }

    async fn request(&self, id: Id) -> RmResult<Request> {
        requests::fetch(&self.pool, id)
            .await?
            .ok_or_else(|| RmError::not_found(Request::TYPE_NAME, id))
    }

    async fn requests(&self, filter: RequestFilter) -> RmResult<Vec<Request>> {
        requests::fetch_filtered(&self.pool, filter).await
    }

    async fn insert_request(&self, request: Request) -> RmResult<Request> {
        // The partial unique indexes turn racing submissions into a 23505,
        // which map_db_err reports as a state conflict.
        requests::insert(&self.pool, &request).await.map_err(|err| {
            if let RmError::StateConflict { .. } = err {
                RmError::state_conflict("an open request already exists for this target")
            } else {
                err
            }
        })
    }

    async fn apply(&self, effect: Effect) -> RmResult<EffectOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;
        let mut outcome = EffectOutcome::default();

        match effect {
            Effect::Assign {
                request_id,
                new,
                log,
            } => {
                let status = sqlx::query_scalar::<_, String>(
                    "SELECT status FROM projects WHERE id = $1 FOR UPDATE",
                )
                .bind(new.project_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_db_err)?
                .ok_or_else(|| RmError::not_found(Project::TYPE_NAME, new.project_id))?;
                if projects::parse_status(&status)?.is_terminal() {
                    return Err(RmError::validation(
                        ConflictCode::ProjectClosed,
                        "cannot assign resources to a CLOSED project",
                    ));
                }

                if let Some(id) = request_id {
                    Self::finish_request(&mut *tx, id, RequestStatus::Approved, None).await?;
                }
                let assignment = assignments::insert(&mut *tx, &new.into_assignment()).await?;
                history::insert(&mut *tx, &log).await?;
                outcome.assignment = Some(assignment);
            }

            Effect::Extend {
                request_id,
                assignment_id,
                new_end_date,
                log,
            } => {
                if let Some(id) = request_id {
                    Self::finish_request(&mut *tx, id, RequestStatus::Approved, None).await?;
                }
                let updated = sqlx::query_as::<_, assignments::AssignmentRow>(
                    "UPDATE assignments SET end_date = $2 \
                     WHERE id = $1 AND status = 'ACTIVE' AND end_date < $2 \
                     RETURNING id, resource_id, project_id, role, start_date, end_date, status",
                )
                .bind(assignment_id)
                .bind(new_end_date)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_db_err)?;

                match updated {
                    Some(row) => outcome.assignment = Some(row.into_assignment()?),
                    None => {
                        return Err(Self::diagnose_stale_assignment(&mut *tx, assignment_id).await)
                    }
                }
                history::insert(&mut *tx, &log).await?;
            }

            Effect::Release {
                request_id,
                assignment_id,
                effective_end,
                log,
                auto_close_log,
            } => {
                if let Some(id) = request_id {
                    Self::finish_request(&mut *tx, id, RequestStatus::Approved, None).await?;
                }
                let updated = sqlx::query_as::<_, assignments::AssignmentRow>(
                    "UPDATE assignments SET status = 'RELEASED', end_date = LEAST(end_date, $2) \
                     WHERE id = $1 AND status = 'ACTIVE' \
                     RETURNING id, resource_id, project_id, role, start_date, end_date, status",
                )
                .bind(assignment_id)
                .bind(effective_end)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_db_err)?;

                let released = match updated {
                    Some(row) => row.into_assignment()?,
                    None => {
                        return Err(Self::diagnose_stale_assignment(&mut *tx, assignment_id).await)
                    }
                };
                history::insert(&mut *tx, &log).await?;

                if Self::auto_close_if_idle(&mut *tx, released.project_id).await? {
                    history::insert(&mut *tx, &auto_close_log).await?;
                    outcome.project_closed = true;
                }
                outcome.assignment = Some(released);
            }

            Effect::CreateProject {
                request_id,
                project,
                plan,
                log,
            } => {
                for item in &plan {
                    let exists = sqlx::query_scalar::<_, bool>(
                        "SELECT EXISTS(SELECT 1 FROM resources WHERE id = $1)",
                    )
                    .bind(item.resource_id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(map_db_err)?;
                    if !exists {
                        return Err(RmError::not_found(Resource::TYPE_NAME, item.resource_id));
                    }
                }

                if let Some(id) = request_id {
                    Self::finish_request(&mut *tx, id, RequestStatus::Approved, None).await?;
                }
                let created = projects::insert(&mut *tx, &project).await?;
                let project_id = created.id.expect("inserted project has an id");
                for item in plan {
                    let assignment = Assignment {
                        id: None,
                        resource_id: item.resource_id,
                        project_id,
                        role: item.role,
                        start_date: item.start_date,
                        end_date: item.end_date,
                        status: AssignmentStatus::Active,
                    };
                    assignments::insert(&mut *tx, &assignment).await?;
                }
                history::insert(&mut *tx, &log).await?;
                outcome.project = Some(created);
            }

            Effect::Reject {
                request_id,
                reason,
                log,
            } => {
                Self::finish_request(&mut *tx, request_id, RequestStatus::Rejected, Some(&reason))
                    .await?;
                history::insert(&mut *tx, &log).await?;
            }
        }

        tx.commit().await.map_err(map_db_err)?;
        Ok(outcome)
    }

    async fn expire_overdue(&self, today: NaiveDate) -> RmResult<SweepOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let expired = sqlx::query(
            "UPDATE assignments a SET status = 'EXPIRED' \
             WHERE a.status = 'ACTIVE' AND a.end_date < $1 \
               AND NOT EXISTS (SELECT 1 FROM requests r \
                               WHERE r.assignment_id = a.id \
                                 AND r.status = 'PENDING' AND r.kind = 'EXTEND')",
        )
        .bind(today)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        let closed = sqlx::query(
            "UPDATE projects p SET status = 'CLOSED' \
             WHERE p.status <> 'CLOSED' \
               AND EXISTS (SELECT 1 FROM assignments a WHERE a.project_id = p.id) \
               AND NOT EXISTS (SELECT 1 FROM assignments a \
                               WHERE a.project_id = p.id AND a.status = 'ACTIVE')",
        )
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;
        Ok(SweepOutcome {
            expired_assignments: expired.rows_affected() as usize,
            closed_projects: closed.rows_affected() as usize,
        })
    }

    async fn append_history(&self, entry: HistoryLog) -> RmResult<HistoryLog> {
        history::insert(&self.pool, &entry).await
    }

    async fn history(&self) -> RmResult<Vec<HistoryLog>> {
        history::fetch_all(&self.pool).await
    }
}
