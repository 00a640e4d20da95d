//! User rows

use rm_core::error::RmError;
use rm_core::result::RmResult;
use rm_core::traits::Id;
use rm_models::{User, UserRole};
use sqlx::PgExecutor;

use crate::map_db_err;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl UserRow {
    pub fn into_user(self) -> RmResult<User> {
        let role = match self.role.as_str() {
            "ADMIN" => UserRole::Admin,
            "DEVMAN" => UserRole::DevMan,
            other => {
                return Err(RmError::Internal(format!(
                    "unknown user role in database: {}",
                    other
                )))
            }
        };
        Ok(User {
            id: Some(self.id),
            name: self.name,
            email: self.email,
            role,
        })
    }
}

const COLUMNS: &str = "id, name, email, role";

pub async fn fetch<'e>(executor: impl PgExecutor<'e>, id: Id) -> RmResult<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {} FROM users WHERE id = $1",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(map_db_err)?;
    row.map(UserRow::into_user).transpose()
}

pub async fn fetch_all<'e>(executor: impl PgExecutor<'e>) -> RmResult<Vec<User>> {
    let rows = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {} FROM users ORDER BY id",
        COLUMNS
    ))
    .fetch_all(executor)
    .await
    .map_err(map_db_err)?;
    rows.into_iter().map(UserRow::into_user).collect()
}

pub async fn insert<'e>(executor: impl PgExecutor<'e>, user: &User) -> RmResult<User> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "INSERT INTO users (name, email, role) VALUES ($1, $2, $3) RETURNING {}",
        COLUMNS
    ))
    .bind(&user.name)
    .bind(&user.email)
    .bind(user.role.as_str())
    .fetch_one(executor)
    .await
    .map_err(map_db_err)?;
    row.into_user()
}
