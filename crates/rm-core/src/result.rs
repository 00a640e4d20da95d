//! Result type alias for Resman operations

use crate::error::RmError;

/// Standard Result type for Resman operations
pub type RmResult<T> = Result<T, RmError>;
