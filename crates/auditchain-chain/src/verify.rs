//! Chain integrity verification.
//!
//! For each entry, in order:
//!
//! 1. **Position**: the sequence number is the successor of the previous one
//!    (the first entry of a full chain must be the genesis entry). A mismatch
//!    is reported at the position where the successor was expected.
//! 2. **Content**: the stored `data_hash` equals the hash recomputed from the
//!    entry's fields.
//! 3. **Seal**: the stored `chain_hash` equals `H(previous_hash ‖ data_hash)`.
//! 4. **Link**: `previous_hash` equals the preceding entry's `chain_hash`.
//!
//! Verification stops at the first failure and names its sequence number.
//!
//! There is no external trust anchor. Someone able to rewrite the store can
//! re-seal every entry after the one they changed and the walk will pass; a
//! Merkle root or terminal hash published outside the store is what closes
//! that gap.

use tracing::warn;

use auditchain_contracts::{entry::LedgerEntry, report::IntegrityReport};
use auditchain_core::hash;

/// Verify a complete chain that must begin with the genesis entry.
///
/// An empty chain is reported as invalid: an initialized ledger always holds
/// at least its genesis entry.
pub fn verify_chain(entries: &[LedgerEntry]) -> IntegrityReport {
    let Some(first) = entries.first() else {
        return IntegrityReport::broken(LedgerEntry::GENESIS_SEQUENCE, "chain is empty", 0);
    };

    if !first.is_genesis() {
        return IntegrityReport::broken(
            first.sequence_number,
            format!(
                "missing genesis entry: chain starts at sequence {}",
                first.sequence_number
            ),
            1,
        );
    }
    if first.previous_hash != LedgerEntry::GENESIS_PREVIOUS_HASH {
        return IntegrityReport::broken(
            first.sequence_number,
            "genesis entry at sequence 0 does not carry the sentinel previous hash",
            1,
        );
    }

    walk(entries)
}

/// Verify a contiguous run of entries that may start anywhere in the chain.
///
/// The first entry's `previous_hash` is accepted as given; everything else is
/// checked exactly as in `verify_chain`. An empty segment is trivially valid.
pub fn verify_segment(entries: &[LedgerEntry]) -> IntegrityReport {
    walk(entries)
}

fn walk(entries: &[LedgerEntry]) -> IntegrityReport {
    let mut previous: Option<&LedgerEntry> = None;
    let mut checked = 0u64;

    for entry in entries {
        checked += 1;
        let sequence = entry.sequence_number;

        if let Some(prev) = previous {
            let Some(expected) = prev.sequence_number.checked_add(1) else {
                return fail(
                    sequence,
                    format!(
                        "sequence overflow at sequence {sequence}: no successor exists after {}",
                        prev.sequence_number
                    ),
                    checked,
                );
            };
            // Report the expected position, not the number found there.
            if sequence != expected {
                return fail(
                    expected,
                    format!("sequence mismatch at sequence {expected}: found sequence number {sequence}"),
                    checked,
                );
            }
        }

        let recomputed = match hash::recompute(entry) {
            Ok(r) => r,
            Err(e) => {
                return fail(sequence, format!("cannot rehash sequence {sequence}: {e}"), checked)
            }
        };
        if !recomputed.data_matches(entry) {
            return fail(sequence, format!("data hash mismatch at sequence {sequence}"), checked);
        }
        if !recomputed.chain_matches(entry) {
            return fail(sequence, format!("chain hash mismatch at sequence {sequence}"), checked);
        }

        if let Some(prev) = previous {
            if entry.previous_hash != prev.chain_hash {
                return fail(sequence, format!("broken link at sequence {sequence}"), checked);
            }
        }

        previous = Some(entry);
    }

    IntegrityReport::intact(checked)
}

fn fail(sequence: u64, message: String, checked: u64) -> IntegrityReport {
    warn!(sequence, reason = %message, "chain verification failed");
    IntegrityReport::broken(sequence, message, checked)
}
