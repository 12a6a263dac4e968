//! Shared utilities for savepoint.
//!
//! This crate provides common utilities used across the savepoint workspace:
//! - Logging setup with tracing
//! - Path utilities (standard directories, normalization)
//! - Duration logging for document operations

pub mod log;
pub mod path;
pub mod timing;

pub use timing::OperationTimer;
