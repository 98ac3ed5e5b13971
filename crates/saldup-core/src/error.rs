//! Error types and exit code constants for saldup.
//!
//! This module provides a unified error type (`SaldupError`) covering every
//! failure the duplication pipeline can hit, from precondition checks through
//! the manifest patch, in a common format suitable for JSON output.
//!
//! ## Error Code Mapping
//!
//! Exit codes are stable across releases:
//! - `2`: Invalid arguments (bad group name, malformed request)
//! - `3`: Precondition errors (missing project, missing group, manifest
//!   problems, destination already present)
//! - `4`: Rewrite errors (failed to read a source or write a duplicate,
//!   failed to patch the manifest)
//! - `10`: Internal errors (bugs, unexpected state)
//!
//! ## Design
//!
//! - **Unified type**: `SaldupError` is the single error type for CLI output
//! - **Code mapping**: `ErrorCode` provides stable integer codes for JSON
//! - **Path context**: I/O failures always carry the offending path

use std::fmt;
use std::path::Path;

use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Error codes for JSON output and process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    /// Invalid arguments from caller (bad group name, malformed request).
    InvalidArguments = 2,
    /// Precondition not met (missing paths, manifest problems, destination
    /// already present).
    PreconditionFailed = 3,
    /// Failed to read, write, or patch a file during duplication.
    RewriteFailed = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl ErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for the duplication pipeline.
///
/// Each variant carries enough context to produce a helpful message without
/// the caller re-deriving paths or names.
#[derive(Debug, Error)]
pub enum SaldupError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Group name does not satisfy the naming rule.
    #[error("invalid group name '{name}': {reason}")]
    GroupNameInvalid { name: String, reason: String },

    /// Project root missing or not a directory.
    #[error("project directory not found: {path}")]
    ProjectNotFound { path: String },

    /// Configuration marker file missing from the project root.
    #[error("not a SAL project (missing {marker}): {root}")]
    MarkerMissing { marker: String, root: String },

    /// No build manifest in the project root.
    #[error("no project manifest (*.salproj) found in {root}")]
    ManifestMissing { root: String },

    /// More than one build manifest in the project root.
    #[error("expected one project manifest in {root}, found {count}")]
    ManifestAmbiguous { root: String, count: usize },

    /// Source group directory missing.
    #[error("group '{name}' not found at {path}")]
    GroupNotFound { name: String, path: String },

    /// Destination group directory already present.
    #[error("destination group already exists: {path}")]
    DestinationExists { path: String },

    /// I/O failure with the offending path.
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&SaldupError> for ErrorCode {
    fn from(err: &SaldupError) -> Self {
        match err {
            SaldupError::InvalidArguments { .. } => ErrorCode::InvalidArguments,
            SaldupError::GroupNameInvalid { .. } => ErrorCode::InvalidArguments,
            SaldupError::ProjectNotFound { .. } => ErrorCode::PreconditionFailed,
            SaldupError::MarkerMissing { .. } => ErrorCode::PreconditionFailed,
            SaldupError::ManifestMissing { .. } => ErrorCode::PreconditionFailed,
            SaldupError::ManifestAmbiguous { .. } => ErrorCode::PreconditionFailed,
            SaldupError::GroupNotFound { .. } => ErrorCode::PreconditionFailed,
            SaldupError::DestinationExists { .. } => ErrorCode::PreconditionFailed,
            SaldupError::Io { .. } => ErrorCode::RewriteFailed,
            SaldupError::InternalError { .. } => ErrorCode::InternalError,
        }
    }
}

impl From<SaldupError> for ErrorCode {
    fn from(err: SaldupError) -> Self {
        ErrorCode::from(&err)
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl SaldupError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        SaldupError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a group name error.
    pub fn group_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SaldupError::GroupNameInvalid {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error with the path it occurred at.
    pub fn io_at(path: &Path, source: std::io::Error) -> Self {
        SaldupError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        SaldupError::InternalError {
            message: message.into(),
        }
    }

    /// Get the exit code for this error.
    pub fn error_code(&self) -> ErrorCode {
        ErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
