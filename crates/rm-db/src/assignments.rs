//! Assignment rows

use chrono::NaiveDate;
use rm_core::error::RmError;
use rm_core::result::RmResult;
use rm_core::traits::Id;
use rm_models::{Assignment, AssignmentStatus};
use sqlx::PgExecutor;

use crate::map_db_err;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AssignmentRow {
    pub id: i64,
    pub resource_id: i64,
    pub project_id: i64,
    pub role: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
}

pub(crate) fn parse_status(status: &str) -> RmResult<AssignmentStatus> {
    match status {
        "ACTIVE" => Ok(AssignmentStatus::Active),
        "RELEASED" => Ok(AssignmentStatus::Released),
        "EXPIRED" => Ok(AssignmentStatus::Expired),
        other => Err(RmError::Internal(format!(
            "unknown assignment status in database: {}",
            other
        ))),
    }
}

impl AssignmentRow {
    pub fn into_assignment(self) -> RmResult<Assignment> {
        Ok(Assignment {
            id: Some(self.id),
            resource_id: self.resource_id,
            project_id: self.project_id,
            role: self.role,
            start_date: self.start_date,
            end_date: self.end_date,
            status: parse_status(&self.status)?,
        })
    }
}

const COLUMNS: &str = "id, resource_id, project_id, role, start_date, end_date, status";

pub async fn fetch<'e>(executor: impl PgExecutor<'e>, id: Id) -> RmResult<Option<Assignment>> {
    let row = sqlx::query_as::<_, AssignmentRow>(&format!(
        "SELECT {} FROM assignments WHERE id = $1",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(map_db_err)?;
    row.map(AssignmentRow::into_assignment).transpose()
}

pub async fn fetch_all<'e>(executor: impl PgExecutor<'e>) -> RmResult<Vec<Assignment>> {
    let rows = sqlx::query_as::<_, AssignmentRow>(&format!(
        "SELECT {} FROM assignments ORDER BY id",
        COLUMNS
    ))
    .fetch_all(executor)
    .await
    .map_err(map_db_err)?;
    rows.into_iter().map(AssignmentRow::into_assignment).collect()
}

pub async fn fetch_for_resource<'e>(
    executor: impl PgExecutor<'e>,
    resource_id: Id,
) -> RmResult<Vec<Assignment>> {
    let rows = sqlx::query_as::<_, AssignmentRow>(&format!(
        "SELECT {} FROM assignments WHERE resource_id = $1 ORDER BY start_date DESC, id DESC",
        COLUMNS
    ))
    .bind(resource_id)
    .fetch_all(executor)
    .await
    .map_err(map_db_err)?;
    rows.into_iter().map(AssignmentRow::into_assignment).collect()
}

pub async fn fetch_for_project<'e>(
    executor: impl PgExecutor<'e>,
    project_id: Id,
) -> RmResult<Vec<Assignment>> {
    let rows = sqlx::query_as::<_, AssignmentRow>(&format!(
        "SELECT {} FROM assignments WHERE project_id = $1 ORDER BY start_date, id",
        COLUMNS
    ))
    .bind(project_id)
    .fetch_all(executor)
    .await
    .map_err(map_db_err)?;
    rows.into_iter().map(AssignmentRow::into_assignment).collect()
}

pub async fn insert<'e>(
    executor: impl PgExecutor<'e>,
    assignment: &Assignment,
) -> RmResult<Assignment> {
    let row = sqlx::query_as::<_, AssignmentRow>(&format!(
        "INSERT INTO assignments (resource_id, project_id, role, start_date, end_date, status) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
        COLUMNS
    ))
    .bind(assignment.resource_id)
    .bind(assignment.project_id)
    .bind(&assignment.role)
    .bind(assignment.start_date)
    .bind(assignment.end_date)
    .bind(assignment.status.as_str())
    .fetch_one(executor)
    .await
    .map_err(map_db_err)?;
    row.into_assignment()
}

pub async fn active_count_for_project<'e>(
    executor: impl PgExecutor<'e>,
    project_id: Id,
) -> RmResult<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM assignments WHERE project_id = $1 AND status = 'ACTIVE'",
    )
    .bind(project_id)
    .fetch_one(executor)
    .await
    .map_err(map_db_err)
}

pub async fn total_count_for_project<'e>(
    executor: impl PgExecutor<'e>,
    project_id: Id,
) -> RmResult<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM assignments WHERE project_id = $1")
        .bind(project_id)
        .fetch_one(executor)
        .await
        .map_err(map_db_err)
}
