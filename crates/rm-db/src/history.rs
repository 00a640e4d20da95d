//! History log rows

use chrono::{DateTime, Utc};
use rm_core::error::RmError;
use rm_core::result::RmResult;
use rm_models::{EntityKind, HistoryLog};
use sqlx::PgExecutor;

use crate::map_db_err;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryRow {
    pub id: i64,
    pub entity_kind: String,
    pub action: String,
    pub description: String,
    pub performed_by: i64,
    pub timestamp: DateTime<Utc>,
}

fn parse_kind(kind: &str) -> RmResult<EntityKind> {
    match kind {
        "RESOURCE" => Ok(EntityKind::Resource),
        "PROJECT" => Ok(EntityKind::Project),
        "ASSIGNMENT" => Ok(EntityKind::Assignment),
        "REQUEST" => Ok(EntityKind::Request),
        other => Err(RmError::Internal(format!(
            "unknown entity kind in database: {}",
            other
        ))),
    }
}

impl HistoryRow {
    pub fn into_log(self) -> RmResult<HistoryLog> {
        Ok(HistoryLog {
            id: Some(self.id),
            entity_kind: parse_kind(&self.entity_kind)?,
            action: self.action,
            description: self.description,
            performed_by: self.performed_by,
            timestamp: self.timestamp,
        })
    }
}

const COLUMNS: &str = "id, entity_kind, action, description, performed_by, timestamp";

pub async fn fetch_all<'e>(executor: impl PgExecutor<'e>) -> RmResult<Vec<HistoryLog>> {
    let rows = sqlx::query_as::<_, HistoryRow>(&format!(
        "SELECT {} FROM history_logs ORDER BY timestamp DESC, id DESC",
        COLUMNS
    ))
    .fetch_all(executor)
    .await
    .map_err(map_db_err)?;
    rows.into_iter().map(HistoryRow::into_log).collect()
}

pub async fn insert<'e>(executor: impl PgExecutor<'e>, entry: &HistoryLog) -> RmResult<HistoryLog> {
    let row = sqlx::query_as::<_, HistoryRow>(&format!(
        "INSERT INTO history_logs (entity_kind, action, description, performed_by, timestamp) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {}",
        COLUMNS
    ))
    .bind(entry.entity_kind.as_str())
    .bind(&entry.action)
    .bind(&entry.description)
    .bind(entry.performed_by)
    .bind(entry.timestamp)
    .fetch_one(executor)
    .await
    .map_err(map_db_err)?;
    row.into_log()
}
