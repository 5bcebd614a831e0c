//! Error types for the AuditChain ledger.
//!
//! All fallible ledger operations return `LedgerResult<T>`. Variants carry a
//! human-readable `reason` so a failure can be reported to operators verbatim.

use thiserror::Error;

/// The unified error type for the AuditChain crates.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The caller supplied an operation with missing required fields.
    ///
    /// Raised before any hashing or persistence; fix the input and retry.
    #[error("invalid ledger entry: {reason}")]
    InvalidEntry { reason: String },

    /// A trail query or export range was malformed.
    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },

    /// The entry store could not read or write.
    ///
    /// When raised by an append, the entry was not committed and the chain
    /// tail has not moved.
    #[error("ledger persistence failed: {reason}")]
    Persistence { reason: String },

    /// A stored or exported chain failed verification.
    #[error("integrity violation at sequence {sequence}: {reason}")]
    IntegrityViolation { sequence: u64, reason: String },

    /// An entry or document could not be encoded or decoded.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    /// The requested export format is not implemented.
    #[error("unsupported export format '{format}'")]
    UnsupportedFormat { format: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// An export document does not have the published shape.
    #[error("export document rejected by schema: {reason}")]
    ExportSchema { reason: String },
}

/// Convenience alias used throughout the AuditChain crates.
pub type LedgerResult<T> = Result<T, LedgerError>;
