//! Append constraints shared by every store implementation.

use auditchain_contracts::{
    entry::LedgerEntry,
    error::{LedgerError, LedgerResult},
};
use auditchain_core::hash;

/// The last committed entry, as far as the append constraint cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tail {
    pub(crate) sequence_number: u64,
    pub(crate) chain_hash: String,
}

impl Tail {
    pub(crate) fn of(entry: &LedgerEntry) -> Self {
        Self {
            sequence_number: entry.sequence_number,
            chain_hash: entry.chain_hash.clone(),
        }
    }
}

/// Enforce the store-level constraints on a new entry:
///
/// 1. its sequence number is exactly the successor of the tail (0 when empty),
/// 2. its `previous_hash` is the tail's `chain_hash` (the sentinel when empty),
/// 3. its stored hashes agree with its own fields.
///
/// Violations are reported as `LedgerError::Persistence`: the write is
/// refused as a constraint failure, not as a verification result.
pub(crate) fn check_append(tail: Option<&Tail>, entry: &LedgerEntry) -> LedgerResult<()> {
    let (expected_sequence, expected_previous) = match tail {
        Some(t) => {
            let next = t
                .sequence_number
                .checked_add(1)
                .ok_or_else(|| LedgerError::Persistence {
                    reason: format!(
                        "sequence constraint violated: no successor exists after sequence {}",
                        t.sequence_number
                    ),
                })?;
            (next, t.chain_hash.as_str())
        }
        None => (
            LedgerEntry::GENESIS_SEQUENCE,
            LedgerEntry::GENESIS_PREVIOUS_HASH,
        ),
    };

    if entry.sequence_number != expected_sequence {
        return Err(LedgerError::Persistence {
            reason: format!(
                "sequence constraint violated: expected {}, got {}",
                expected_sequence, entry.sequence_number
            ),
        });
    }

    if entry.previous_hash != expected_previous {
        return Err(LedgerError::Persistence {
            reason: format!(
                "link constraint violated at sequence {}: previous_hash does not match the stored tail",
                entry.sequence_number
            ),
        });
    }

    hash::check_sealed(entry).map_err(|e| LedgerError::Persistence {
        reason: format!("refusing unsealed entry: {e}"),
    })
}
