//! Resource rows

use chrono::{DateTime, Utc};
use rm_core::result::RmResult;
use rm_core::traits::Id;
use rm_models::Resource;
use sqlx::PgExecutor;

use crate::map_db_err;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResourceRow {
    pub id: i64,
    pub name: String,
    pub employee_code: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<ResourceRow> for Resource {
    fn from(row: ResourceRow) -> Self {
        Resource {
            id: Some(row.id),
            name: row.name,
            employee_code: row.employee_code,
            email: row.email,
            created_at: Some(row.created_at),
        }
    }
}

const COLUMNS: &str = "id, name, employee_code, email, created_at";

pub async fn fetch<'e>(executor: impl PgExecutor<'e>, id: Id) -> RmResult<Option<Resource>> {
    let row = sqlx::query_as::<_, ResourceRow>(&format!(
        "SELECT {} FROM resources WHERE id = $1",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(map_db_err)?;
    Ok(row.map(Resource::from))
}

pub async fn fetch_all<'e>(executor: impl PgExecutor<'e>) -> RmResult<Vec<Resource>> {
    let rows = sqlx::query_as::<_, ResourceRow>(&format!(
        "SELECT {} FROM resources ORDER BY id",
        COLUMNS
    ))
    .fetch_all(executor)
    .await
    .map_err(map_db_err)?;
    Ok(rows.into_iter().map(Resource::from).collect())
}

pub async fn count<'e>(executor: impl PgExecutor<'e>) -> RmResult<i64> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM resources")
        .fetch_one(executor)
        .await
        .map_err(map_db_err)
}

pub async fn email_exists<'e>(executor: impl PgExecutor<'e>, email: &str) -> RmResult<bool> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM resources WHERE lower(email) = lower($1))",
    )
    .bind(email)
    .fetch_one(executor)
    .await
    .map_err(map_db_err)
}

pub async fn insert<'e>(executor: impl PgExecutor<'e>, resource: &Resource) -> RmResult<Resource> {
    let row = sqlx::query_as::<_, ResourceRow>(&format!(
        "INSERT INTO resources (name, employee_code, email) VALUES ($1, $2, $3) RETURNING {}",
        COLUMNS
    ))
    .bind(&resource.name)
    .bind(&resource.employee_code)
    .bind(&resource.email)
    .fetch_one(executor)
    .await
    .map_err(map_db_err)?;
    Ok(row.into())
}

pub async fn update<'e>(
    executor: impl PgExecutor<'e>,
    id: Id,
    resource: &Resource,
) -> RmResult<Option<Resource>> {
    let row = sqlx::query_as::<_, ResourceRow>(&format!(
        "UPDATE resources SET name = $1, email = $2 WHERE id = $3 RETURNING {}",
        COLUMNS
    ))
    .bind(&resource.name)
    .bind(&resource.email)
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(map_db_err)?;
    Ok(row.map(Resource::from))
}
