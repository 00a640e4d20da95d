//! Project rows

use chrono::{DateTime, Utc};
use rm_core::error::RmError;
use rm_core::result::RmResult;
use rm_core::traits::Id;
use rm_models::{Project, ProjectStatus};
use sqlx::PgExecutor;

use crate::map_db_err;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: i64,
    pub name: String,
    pub client_name: String,
    pub manager_id: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

pub(crate) fn parse_status(status: &str) -> RmResult<ProjectStatus> {
    match status {
        "ONGOING" => Ok(ProjectStatus::Ongoing),
        "HOLD" => Ok(ProjectStatus::Hold),
        "CLOSED" => Ok(ProjectStatus::Closed),
        other => Err(RmError::Internal(format!(
            "unknown project status in database: {}",
            other
        ))),
    }
}

impl ProjectRow {
    pub fn into_project(self) -> RmResult<Project> {
        Ok(Project {
            id: Some(self.id),
            name: self.name,
            client_name: self.client_name,
            manager_id: self.manager_id,
            status: parse_status(&self.status)?,
            created_at: Some(self.created_at),
        })
    }
}

const COLUMNS: &str = "id, name, client_name, manager_id, status, created_at";

pub async fn fetch<'e>(executor: impl PgExecutor<'e>, id: Id) -> RmResult<Option<Project>> {
    let row = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {} FROM projects WHERE id = $1",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(map_db_err)?;
    row.map(ProjectRow::into_project).transpose()
}

pub async fn fetch_all<'e>(executor: impl PgExecutor<'e>) -> RmResult<Vec<Project>> {
    let rows = sqlx::query_as::<_, ProjectRow>(&format!(
        "SELECT {} FROM projects ORDER BY id",
        COLUMNS
    ))
    .fetch_all(executor)
    .await
    .map_err(map_db_err)?;
    rows.into_iter().map(ProjectRow::into_project).collect()
}

pub async fn insert<'e>(executor: impl PgExecutor<'e>, project: &Project) -> RmResult<Project> {
    let row = sqlx::query_as::<_, ProjectRow>(&format!(
        "INSERT INTO projects (name, client_name, manager_id, status) \
         VALUES ($1, $2, $3, $4) RETURNING {}",
        COLUMNS
    ))
    .bind(&project.name)
    .bind(&project.client_name)
    .bind(project.manager_id)
    .bind(project.status.as_str())
    .fetch_one(executor)
    .await
    .map_err(map_db_err)?;
    row.into_project()
}

pub async fn update<'e>(
    executor: impl PgExecutor<'e>,
    id: Id,
    project: &Project,
) -> RmResult<Option<Project>> {
    let row = sqlx::query_as::<_, ProjectRow>(&format!(
        "UPDATE projects SET name = $1, client_name = $2, manager_id = $3, status = $4 \
         WHERE id = $5 RETURNING {}",
        COLUMNS
    ))
    .bind(&project.name)
    .bind(&project.client_name)
    .bind(project.manager_id)
    .bind(project.status.as_str())
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(map_db_err)?;
    row.map(ProjectRow::into_project).transpose()
}
