//! Unified error types for outbreak.
//!
//! Failures of the chat platform (tag and notification calls) are transient:
//! they are logged and retried on the next sweep, never fatal. Only
//! configuration errors stop the process, and only at startup.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for outbreak operations.
#[derive(Error, Debug)]
pub enum OutbreakError {
    /// I/O errors from record, roster or outbox files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// A persisted record set that could not be parsed.
    #[error("corrupt store at {path}: {message}")]
    CorruptStore { path: PathBuf, message: String },

    /// Tag or notification call failed; retried on the next sweep.
    #[error("external call failed ({operation}): {message}")]
    TransientExternal { operation: String, message: String },

    /// Missing or invalid configuration.
    #[error("config error: {message}")]
    Config { message: String },

    /// A lifecycle transition that the record does not allow.
    #[error("invalid state: {message}")]
    InvalidState { message: String },
}

/// A specialized Result type for outbreak operations.
pub type Result<T> = std::result::Result<T, OutbreakError>;

impl OutbreakError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a corrupt store error.
    pub fn corrupt_store(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CorruptStore {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a transient external failure for the named operation.
    pub fn external(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientExternal {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Whether the failed operation should simply be attempted again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientExternal { .. } | Self::Storage { .. }
        )
    }

    /// Whether this error must stop the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

impl From<io::Error> for OutbreakError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for OutbreakError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Used where a failure must be logged but must not interrupt the caller,
/// such as journal appends and best-effort notifications.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the outbreak CLI.
pub mod exit_codes {
    /// Command completed.
    pub const OK: i32 = 0;

    /// Command ran but reported a failure.
    pub const ERROR: i32 = 1;

    /// Configuration is missing or invalid.
    pub const CONFIG: i32 = 2;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}
