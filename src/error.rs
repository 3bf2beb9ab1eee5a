//! Error types for MARC to BIBFRAME conversion.
//!
//! This module provides the [`Marc2BfError`] type for all conversion
//! operations and the [`Result`] convenience type.

use thiserror::Error;

/// Error type for all conversion operations.
///
/// Recoverable per-field conditions (lookup misses, un-coercible resource
/// references) are logged and skipped rather than surfaced here; this type
/// covers the conditions that stop a conversion.
#[derive(Error, Debug)]
pub enum Marc2BfError {
    /// Configuration error, raised before any record is processed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An unknown transform-set IRI was referenced in configuration.
    #[error("Unknown transform set: {0}")]
    UnknownTransformSet(String),

    /// An unknown plugin id was referenced in configuration.
    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),

    /// IO error from a [`RecordSource`](crate::pipeline::RecordSource) adapter.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Convenience type alias for [`std::result::Result`] with [`Marc2BfError`].
pub type Result<T> = std::result::Result<T, Marc2BfError>;
