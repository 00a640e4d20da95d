//! Schema bootstrap
//!
//! DDL executed at startup; every statement is idempotent. The two partial
//! unique indexes enforce the open-request invariants at the database
//! level rather than check-then-insert: one pending request per targeted
//! assignment, and one pending ASSIGN per (resource, project, role).

use rm_core::result::RmResult;
use sqlx::PgPool;

use crate::map_db_err;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        role TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS resources (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        employee_code TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        client_name TEXT NOT NULL,
        manager_id BIGINT NOT NULL REFERENCES users(id),
        status TEXT NOT NULL DEFAULT 'ONGOING',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS assignments (
        id BIGSERIAL PRIMARY KEY,
        resource_id BIGINT NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
        project_id BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        role TEXT NOT NULL,
        start_date DATE NOT NULL,
        end_date DATE NOT NULL,
        status TEXT NOT NULL DEFAULT 'ACTIVE',
        CHECK (end_date >= start_date)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS requests (
        id BIGSERIAL PRIMARY KEY,
        kind TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'PENDING',
        requester_id BIGINT NOT NULL REFERENCES users(id),
        rejection_reason TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        payload JSONB NOT NULL,
        -- Columns extracted from the payload so the partial unique
        -- indexes below can see them.
        assignment_id BIGINT,
        resource_id BIGINT,
        project_id BIGINT,
        role TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS history_logs (
        id BIGSERIAL PRIMARY KEY,
        entity_kind TEXT NOT NULL,
        action TEXT NOT NULL,
        description TEXT NOT NULL,
        performed_by BIGINT NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS requests_one_pending_per_assignment
        ON requests (assignment_id)
        WHERE status = 'PENDING' AND assignment_id IS NOT NULL
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS requests_one_pending_assign
        ON requests (resource_id, project_id, role)
        WHERE status = 'PENDING' AND kind = 'ASSIGN'
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS assignments_by_resource ON assignments (resource_id)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS assignments_by_project ON assignments (project_id)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS assignments_active_end
        ON assignments (end_date) WHERE status = 'ACTIVE'
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS requests_by_status ON requests (status)
    "#,
];

/// Create tables and indexes if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> RmResult<()> {
    for statement in STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(map_db_err)?;
    }
    tracing::info!("database schema ready");
    Ok(())
}
