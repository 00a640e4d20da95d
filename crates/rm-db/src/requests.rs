//! Request rows
//!
//! The type-specific payload is stored as JSONB; the columns the partial
//! unique indexes need (assignment_id, resource/project/role for ASSIGN)
//! are extracted at insert time.

use chrono::{DateTime, Utc};
use rm_core::error::RmError;
use rm_core::result::RmResult;
use rm_core::traits::Id;
use rm_models::{Request, RequestFilter, RequestPayload, RequestStatus};
use sqlx::PgExecutor;

use crate::map_db_err;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RequestRow {
    pub id: i64,
    pub status: String,
    pub requester_id: i64,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

pub(crate) fn parse_status(status: &str) -> RmResult<RequestStatus> {
    match status {
        "PENDING" => Ok(RequestStatus::Pending),
        "APPROVED" => Ok(RequestStatus::Approved),
        "REJECTED" => Ok(RequestStatus::Rejected),
        other => Err(RmError::Internal(format!(
            "unknown request status in database: {}",
            other
        ))),
    }
}

impl RequestRow {
    pub fn into_request(self) -> RmResult<Request> {
        let payload: RequestPayload = serde_json::from_value(self.payload)
            .map_err(|e| RmError::Internal(format!("corrupt request payload: {}", e)))?;
        Ok(Request {
            id: Some(self.id),
            status: parse_status(&self.status)?,
            requester_id: self.requester_id,
            rejection_reason: self.rejection_reason,
            created_at: Some(self.created_at),
            payload,
        })
    }
}

const COLUMNS: &str = "id, status, requester_id, rejection_reason, created_at, payload";

pub async fn fetch<'e>(executor: impl PgExecutor<'e>, id: Id) -> RmResult<Option<Request>> {
    let row = sqlx::query_as::<_, RequestRow>(&format!(
        "SELECT {} FROM requests WHERE id = $1",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(map_db_err)?;
    row.map(RequestRow::into_request).transpose()
}

pub async fn fetch_filtered<'e>(
    executor: impl PgExecutor<'e>,
    filter: RequestFilter,
) -> RmResult<Vec<Request>> {
    // Status/kind narrowing happens in SQL; the rest of the filter is
    // re-applied in memory after decoding.
    let rows = sqlx::query_as::<_, RequestRow>(&format!(
        "SELECT {} FROM requests \
         WHERE ($1::text IS NULL OR status = $1) \
           AND ($2::text IS NULL OR kind = $2) \
           AND ($3::bigint IS NULL OR requester_id = $3) \
         ORDER BY created_at DESC, id DESC",
        COLUMNS
    ))
    .bind(filter.status.map(|s| s.as_str()))
    .bind(filter.kind.map(|k| k.as_str()))
    .bind(filter.requester_id)
    .fetch_all(executor)
    .await
    .map_err(map_db_err)?;

    let requests: RmResult<Vec<Request>> =
        rows.into_iter().map(RequestRow::into_request).collect();
    Ok(requests?
        .into_iter()
        .filter(|r| filter.matches(r))
        .collect())
}

pub async fn insert<'e>(executor: impl PgExecutor<'e>, request: &Request) -> RmResult<Request> {
    let payload = serde_json::to_value(&request.payload)
        .map_err(|e| RmError::Internal(format!("unencodable request payload: {}", e)))?;

    let (resource_id, project_id, role) = match &request.payload {
        RequestPayload::Assign {
            resource_id,
            project_id,
            role,
            ..
        } => (Some(*resource_id), Some(*project_id), Some(role.clone())),
        _ => (None, None, None),
    };

    let row = sqlx::query_as::<_, RequestRow>(&format!(
        "INSERT INTO requests \
         (kind, status, requester_id, payload, assignment_id, resource_id, project_id, role) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
        COLUMNS
    ))
    .bind(request.kind().as_str())
    .bind(request.status.as_str())
    .bind(request.requester_id)
    .bind(payload)
    .bind(request.payload.assignment_id())
    .bind(resource_id)
    .bind(project_id)
    .bind(role)
    .fetch_one(executor)
    .await
    .map_err(map_db_err)?;
    row.into_request()
}

/// Conditionally move a pending request into a terminal state. Returns
/// `false` when the request was no longer pending (or does not exist);
/// callers turn that into the right error.
pub async fn finish<'e>(
    executor: impl PgExecutor<'e>,
    id: Id,
    status: RequestStatus,
    rejection_reason: Option<&str>,
) -> RmResult<bool> {
    let result = sqlx::query(
        "UPDATE requests SET status = $2, rejection_reason = $3 \
         WHERE id = $1 AND status = 'PENDING'",
    )
    .bind(id)
    .bind(status.as_str())
    .bind(rejection_reason)
    .execute(executor)
    .await
    .map_err(map_db_err)?;
    Ok(result.rows_affected() == 1)
}
