//! User model
//!
//! Callers of the engine: administrators mutate directly, delivery
//! managers submit requests. Authentication itself happens upstream; this
//! service only consumes the forwarded identity.

use rm_core::traits::{AuthContext, Entity, Id, Identifiable, Timestamped};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    DevMan,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::DevMan => "DEVMAN",
        }
    }
}

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Option<Id>,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl Identifiable for User {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Timestamped for User {
    fn created_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        None
    }
}

impl Entity for User {
    const TABLE_NAME: &'static str = "users";
    const TYPE_NAME: &'static str = "User";
}

impl AuthContext for User {
    fn user_id(&self) -> Id {
        self.id.unwrap_or(0)
    }

    fn is_admin(&self) -> bool {
        User::is_admin(self)
    }
}
