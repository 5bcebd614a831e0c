//! The persistence boundary of the ledger.
//!
//! `EntryStore` is deliberately narrow: entries can be appended and read back
//! in sequence order, and nothing else. There is no update or delete method,
//! so no component holding a store can rewrite history through it.

use auditchain_contracts::{entry::LedgerEntry, error::LedgerResult};

/// Durable, append-only storage for sealed ledger entries.
///
/// Implementations must uphold:
/// - `append` commits the whole entry or nothing. A failed append leaves the
///   store exactly as it was and returns `LedgerError::Persistence`.
/// - `append` rejects an entry whose `sequence_number` is not the successor
///   of the last stored entry (0 for an empty store).
/// - `scan` returns entries ordered by `sequence_number`, reflecting every
///   append that completed before the scan began.
pub trait EntryStore: Send + Sync {
    /// Persist one sealed entry at the end of the chain.
    fn append(&self, entry: &LedgerEntry) -> LedgerResult<()>;

    /// The highest stored sequence number, or `None` for an empty store.
    fn last_sequence(&self) -> LedgerResult<Option<u64>>;

    /// Every stored entry in ascending sequence order.
    fn scan(&self) -> LedgerResult<Vec<LedgerEntry>>;

    /// The entry with the given sequence number, if stored.
    ///
    /// The default implementation scans the whole store.
    fn get(&self, sequence_number: u64) -> LedgerResult<Option<LedgerEntry>> {
        Ok(self
            .scan()?
            .into_iter()
            .find(|e| e.sequence_number == sequence_number))
    }

    /// Number of stored entries.
    fn len(&self) -> LedgerResult<u64> {
        Ok(self.last_sequence()?.map(|s| s + 1).unwrap_or(0))
    }

    fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.last_sequence()?.is_none())
    }
}
