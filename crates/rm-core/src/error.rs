//! Core error types for Resman RS
//!
//! Every failure an engine operation can surface maps onto one of these
//! variants; HTTP mapping lives in the API layer.

use std::collections::HashMap;
use thiserror::Error;

/// Core error type for all Resman operations
#[derive(Error, Debug)]
pub enum RmError {
    #[error("Not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Caller's role lacks authority for the operation.
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Operating on state that has moved on (non-pending request, closed
    /// project, stale assignment). Callers must re-fetch before retrying.
    #[error("State conflict: {message}")]
    StateConflict { message: String },

    /// Delete blocked by live references (active assignments).
    #[error("Capacity conflict: {message}")]
    CapacityConflict { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RmError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        RmError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        RmError::Forbidden {
            message: message.into(),
        }
    }

    pub fn state_conflict(message: impl Into<String>) -> Self {
        RmError::StateConflict {
            message: message.into(),
        }
    }

    pub fn capacity_conflict(message: impl Into<String>) -> Self {
        RmError::CapacityConflict {
            message: message.into(),
        }
    }

    pub fn validation(code: ConflictCode, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add_code(code, message);
        RmError::Validation(errors)
    }

    pub fn status_code(&self) -> u16 {
        match self {
            RmError::NotFound { .. } => 404,
            RmError::Validation(_) => 422,
            RmError::Forbidden { .. } => 403,
            RmError::StateConflict { .. } => 409,
            RmError::CapacityConflict { .. } => 409,
            RmError::Database(_) | RmError::Internal(_) | RmError::Config(_) => 500,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RmError::NotFound { .. } => "not_found",
            RmError::Validation(_) => "validation_error",
            RmError::Forbidden { .. } => "forbidden",
            RmError::StateConflict { .. } => "state_conflict",
            RmError::CapacityConflict { .. } => "capacity_conflict",
            RmError::Database(_) => "database_error",
            RmError::Internal(_) => "internal_error",
            RmError::Config(_) => "configuration_error",
        }
    }

    /// True when the error carries the given conflict code.
    pub fn has_code(&self, code: ConflictCode) -> bool {
        matches!(self, RmError::Validation(errors) if errors.has_code(code))
    }
}

/// Machine-readable rule violations produced by the conflict validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictCode {
    InvalidRange,
    ProjectClosed,
    NotAnExtension,
    ReasonRequired,
    RoleRequired,
    DuplicateAssignment,
}

impl ConflictCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRange => "INVALID_RANGE",
            Self::ProjectClosed => "PROJECT_CLOSED",
            Self::NotAnExtension => "NOT_AN_EXTENSION",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::RoleRequired => "ROLE_REQUIRED",
            Self::DuplicateAssignment => "DUPLICATE_ASSIGNMENT",
        }
    }
}

/// Validation errors collection
///
/// Field-level messages for form display plus the conflict codes that
/// triggered them.
#[derive(Error, Debug, Default, Clone)]
#[error("Validation errors: {errors:?}")]
pub struct ValidationErrors {
    /// Field-specific errors: field_name -> Vec<error_messages>
    pub errors: HashMap<String, Vec<String>>,
    /// Base errors not tied to a specific field
    pub base_errors: Vec<String>,
    /// Machine-readable codes for the violations collected here
    pub codes: Vec<ConflictCode>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    pub fn add_code(&mut self, code: ConflictCode, message: impl Into<String>) {
        self.codes.push(code);
        self.base_errors.push(message.into());
    }

    pub fn add_field_code(
        &mut self,
        code: ConflictCode,
        field: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.codes.push(code);
        self.add(field, message);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.base_errors.is_empty()
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn has_code(&self, code: ConflictCode) -> bool {
        self.codes.contains(&code)
    }

    /// Convert derive-based DTO validation failures into our collection.
    pub fn from_validator(errors: &validator::ValidationErrors) -> Self {
        let mut out = Self::new();
        for (field, field_errors) in errors.field_errors() {
            for fe in field_errors {
                let message = fe
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("is invalid ({})", fe.code));
                out.add(field.to_string(), message);
            }
        }
        out
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
        self.base_errors.extend(other.base_errors);
        self.codes.extend(other.codes);
    }

    pub fn full_messages(&self) -> Vec<String> {
        let mut messages = self.base_errors.clone();
        for (field, field_messages) in &self.errors {
            for msg in field_messages {
                messages.push(format!("{} {}", field, msg));
            }
        }
        messages
    }

    /// Fail with `RmError::Validation` if anything was collected.
    pub fn into_result(self) -> Result<(), RmError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(RmError::Validation(self))
        }
    }
}
