//! # rm-db
//!
//! PostgreSQL layer for Resman RS using SQLx:
//!
//! - Connection pool management
//! - Schema bootstrap (DDL, including the partial unique index that
//!   enforces one pending request per assignment)
//! - Row mappings per entity
//! - [`PgLedgerStore`], the transactional [`rm_services::LedgerStore`]
//!   implementation
//!
//! ## Example
//!
//! ```ignore
//! use rm_db::{Database, DatabaseConfig, PgLedgerStore};
//!
//! let db = Database::connect(&DatabaseConfig::from_env()).await?;
//! rm_db::schema::ensure_schema(db.pool()).await?;
//! let store = PgLedgerStore::new(db.pool().clone());
//! ```

pub mod assignments;
pub mod history;
pub mod pool;
pub mod projects;
pub mod requests;
pub mod resources;
pub mod schema;
pub mod store;
pub mod users;

pub use pool::{Database, DatabaseConfig, PoolStats};
pub use store::PgLedgerStore;

use rm_core::error::RmError;

/// Map a SQLx error onto the service error taxonomy. Unique violations
/// surface as state conflicts so racing submissions fail cleanly.
pub(crate) fn map_db_err(err: sqlx::Error) -> RmError {
    match &err {
        sqlx::Error::RowNotFound => RmError::Database("row not found".into()),
        sqlx::Error::Database(db) => {
            if db.code().as_deref() == Some("23505") {
                RmError::state_conflict(format!("uniqueness violated: {}", db.message()))
            } else {
                RmError::Database(db.message().to_string())
            }
        }
        _ => RmError::Database(err.to_string()),
    }
}
