//! # Error Handling
//!
//! Error types for the Driftline sync engine.
//!
//! ## Error Taxonomy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR TAXONOMY                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Programmer/precondition errors                                        │
//! │  ──────────────────────────────                                         │
//! │  Missing required ids, structurally impossible operations. These are   │
//! │  assertions (panics), NOT variants of this enum — they halt the        │
//! │  current update rather than silently corrupting a store.              │
//! │                                                                         │
//! │  Data divergence                                                       │
//! │  ───────────────                                                        │
//! │  Local state disagreeing with server-declared state is NOT an error.  │
//! │  It is recorded as an inconsistency report and resolved by            │
//! │  overwriting local state ("server wins"). See reducers::thread.       │
//! │                                                                         │
//! │  Recoverable data errors (this enum)                                   │
//! │  ───────────────────────────────────                                    │
//! │  ├── Translation Errors                                               │
//! │  │   ├── MalformedRecord   - Persisted row failed to parse            │
//! │  │   └── Deserialization   - JSON payload failed to decode            │
//! │  │                                                                     │
//! │  ├── Queue Errors                                                     │
//! │  │   ├── CommitAborted     - Persistence commit failed; the queue     │
//! │  │   │                       entry stays pending (at-least-once)      │
//! │  │   └── DispatchDropped   - Completion channel closed before resolve │
//! │  │                                                                     │
//! │  └── Storage Errors                                                   │
//! │      ├── DatabaseError     - SQLite-level failure                     │
//! │      └── StorageCorrupted  - Schema/row invariant violated on disk    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Driftline sync engine
///
/// All errors are categorized by layer to make error handling clearer.
/// End users never see these directly; persistent divergence manifests as
/// a background resync, never a crash.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Translation Errors (100-199)
    // ========================================================================

    /// A persisted row could not be translated back into its in-memory shape
    #[error("Malformed persisted record: {0}")]
    MalformedRecord(String),

    /// Serialization to the persisted-row shape failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Deserialization from the persisted-row shape failed
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    // ========================================================================
    // Queue Errors (200-299)
    // ========================================================================

    /// A persistence commit failed for a queued batch. The batch is NOT
    /// removed from the queue; the awaiting caller sees this rejection.
    #[error("Persistence commit aborted: {0}")]
    CommitAborted(String),

    /// The completion channel for a dispatched action was dropped before
    /// the persistence layer reported completion
    #[error("Dispatch completion channel dropped before resolution")]
    DispatchDropped,

    // ========================================================================
    // Storage Errors (300-399)
    // ========================================================================

    /// SQLite-level error
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// On-disk data violated a schema invariant
    #[error("Data corruption detected: {0}")]
    StorageCorrupted(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the numeric error code
    ///
    /// Codes are organized by category:
    /// - 100-199: Translation
    /// - 200-299: Queue
    /// - 300-399: Storage
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            Error::MalformedRecord(_) => 100,
            Error::SerializationError(_) => 101,
            Error::DeserializationError(_) => 102,

            Error::CommitAborted(_) => 200,
            Error::DispatchDropped => 201,

            Error::DatabaseError(_) => 300,
            Error::StorageCorrupted(_) => 301,

            Error::Internal(_) => 900,
        }
    }

    /// Check if this error is recoverable
    ///
    /// A recoverable error leaves the queue in a retryable state; the
    /// host's persistence layer may attempt the commit again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::CommitAborted(_) | Error::DatabaseError(_))
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::DatabaseError(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::MalformedRecord("x".into()).code(), 100);
        assert_eq!(Error::CommitAborted("x".into()).code(), 200);
        assert_eq!(Error::DatabaseError("x".into()).code(), 300);
        assert_eq!(Error::Internal("x".into()).code(), 900);
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::CommitAborted("disk full".into()).is_recoverable());
        assert!(!Error::MalformedRecord("bad row".into()).is_recoverable());
        assert!(!Error::DispatchDropped.is_recoverable());
    }
}
