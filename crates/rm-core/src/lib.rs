//! # rm-core
//!
//! Core types, traits, and utilities for Resman RS.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - Common error types and the conflict-code taxonomy
//! - Result type aliases
//! - Core traits (Entity, Identifiable, Timestamped, AuthContext)
//! - Date range helpers
//! - Configuration types

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::*;
pub use result::*;
pub use traits::*;
pub use types::*;
