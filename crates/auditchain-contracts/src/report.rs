//! Verification and status reports handed back to callers.
//!
//! A broken chain is a result, not an exception: `IntegrityReport` carries
//! the verdict and callers decide how loudly to surface it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Outcome of walking a chain and recomputing every hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub is_valid: bool,
    /// `"chain intact"` on success, otherwise the first failure found.
    pub message: String,
    /// Number of entries examined before stopping.
    pub entries_checked: u64,
    /// Sequence number of the first offending entry.
    pub failed_sequence: Option<u64>,
}

impl IntegrityReport {
    /// Message reported for a chain with no defects.
    pub const INTACT: &'static str = "chain intact";

    pub fn intact(entries_checked: u64) -> Self {
        Self {
            is_valid: true,
            message: Self::INTACT.to_string(),
            entries_checked,
            failed_sequence: None,
        }
    }

    pub fn broken(sequence: u64, reason: impl Into<String>, entries_checked: u64) -> Self {
        Self {
            is_valid: false,
            message: reason.into(),
            entries_checked,
            failed_sequence: Some(sequence),
        }
    }

    /// Convert a failing report into `LedgerError::IntegrityViolation`.
    pub fn into_result(self) -> LedgerResult<Self> {
        if self.is_valid {
            return Ok(self);
        }
        Err(LedgerError::IntegrityViolation {
            sequence: self.failed_sequence.unwrap_or_default(),
            reason: self.message,
        })
    }
}

/// Summary of the chain as currently mirrored in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainInfo {
    pub chain_length: u64,
    pub last_sequence: u64,
    pub last_chain_hash: String,
    pub is_valid: bool,
    pub integrity_message: String,
    pub generated_at: DateTime<Utc>,
}

/// Answer to "is this business event present and intact in the ledger".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryVerification {
    pub found: bool,
    pub sequence_number: Option<u64>,
    pub chain_hash: Option<String>,
    /// The stored `data_hash` equals the recomputed one.
    pub data_hash_matches: bool,
    /// The stored `chain_hash` equals the recomputed one.
    pub chain_hash_matches: bool,
    /// `previous_hash` equals the predecessor's stored `chain_hash`.
    pub linked_to_predecessor: bool,
}

impl EntryVerification {
    pub fn not_found() -> Self {
        Self {
            found: false,
            sequence_number: None,
            chain_hash: None,
            data_hash_matches: false,
            chain_hash_matches: false,
            linked_to_predecessor: false,
        }
    }

    pub fn is_intact(&self) -> bool {
        self.found && self.data_hash_matches && self.chain_hash_matches && self.linked_to_predecessor
    }
}
