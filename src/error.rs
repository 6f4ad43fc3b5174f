//! Error types for tlogkv
//!
//! Provides a unified error type for all operations. Callers that need to
//! branch on the kind of failure compare [`KvError::kind`] rather than the
//! error values themselves.

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for tlogkv operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    #[error("no such key: {key}")]
    NotFound { key: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("store capacity exceeded (limit {limit} keys)")]
    CapacityExceeded { limit: usize },

    // -------------------------------------------------------------------------
    // Transaction Log Errors
    // -------------------------------------------------------------------------
    #[error("transaction numbers out of sequence: {found} does not follow {last}")]
    Sequence { last: u64, found: u64 },

    #[error("transaction log parse error at {position}: {reason}")]
    Parse { position: String, reason: String },

    #[error("transaction log write failed: {0}")]
    WriteFailure(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Tag identifying the kind of a [`KvError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    CapacityExceeded,
    Sequence,
    Parse,
    WriteFailure,
    Io,
    Protocol,
    Config,
}

impl KvError {
    /// The tag of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            KvError::NotFound { .. } => ErrorKind::NotFound,
            KvError::InvalidInput(_) => ErrorKind::InvalidInput,
            KvError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            KvError::Sequence { .. } => ErrorKind::Sequence,
            KvError::Parse { .. } => ErrorKind::Parse,
            KvError::WriteFailure(_) => ErrorKind::WriteFailure,
            KvError::Io(_) => ErrorKind::Io,
            KvError::Protocol(_) => ErrorKind::Protocol,
            KvError::Config(_) => ErrorKind::Config,
        }
    }

    /// Shorthand for `self.kind() == ErrorKind::NotFound`
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Whether this error must abort startup / the process rather than a single request
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Sequence | ErrorKind::Parse | ErrorKind::WriteFailure | ErrorKind::Config
        )
    }

    pub(crate) fn parse_at_line(line: usize, reason: impl Into<String>) -> Self {
        KvError::Parse {
            position: format!("line {}", line),
            reason: reason.into(),
        }
    }

    pub(crate) fn parse_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        KvError::Parse {
            position: format!("byte offset {}", offset),
            reason: reason.into(),
        }
    }
}
