//! Core traits shared across the workspace

use chrono::{DateTime, Utc};

/// Primary key type
pub type Id = i64;

/// Trait for entities that have a primary key
pub trait Identifiable {
    fn id(&self) -> Option<Id>;
    fn is_persisted(&self) -> bool {
        self.id().is_some()
    }
    fn is_new_record(&self) -> bool {
        !self.is_persisted()
    }
}

/// Trait for entities with timestamps
pub trait Timestamped {
    fn created_at(&self) -> Option<DateTime<Utc>>;
}

/// Base trait for all domain entities
pub trait Entity: Identifiable + Send + Sync {
    /// The database table name
    const TABLE_NAME: &'static str;

    /// Human-readable type name for error messages
    const TYPE_NAME: &'static str;
}

/// Caller identity for the authority check.
///
/// The workflow engine branches on this: administrators mutate directly,
/// everyone else goes through the approval queue.
pub trait AuthContext: Send + Sync {
    fn user_id(&self) -> Id;
    fn is_admin(&self) -> bool;
}

/// A plain (id, admin) pair; enough for service calls and tests.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub id: Id,
    pub admin: bool,
}

impl Caller {
    pub fn admin(id: Id) -> Self {
        Self { id, admin: true }
    }

    pub fn manager(id: Id) -> Self {
        Self { id, admin: false }
    }
}

impl AuthContext for Caller {
    fn user_id(&self) -> Id {
        self.id
    }

    fn is_admin(&self) -> bool {
        self.admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_roles() {
        let admin = Caller::admin(1);
        assert!(admin.is_admin());
        assert_eq!(admin.user_id(), 1);

        let manager = Caller::manager(2);
        assert!(!manager.is_admin());
    }
}
