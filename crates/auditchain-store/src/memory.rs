//! In-memory implementation of `EntryStore`.
//!
//! `InMemoryEntryStore` keeps every entry in a `Vec` behind an `RwLock`.
//! Clones share the same storage, so a test can keep a handle while the
//! chain engine owns another. Nothing survives the process.

use std::sync::{Arc, RwLock};

use tracing::debug;

use auditchain_contracts::{
    entry::LedgerEntry,
    error::{LedgerError, LedgerResult},
};
use auditchain_core::traits::EntryStore;

use crate::guard::{check_append, Tail};

/// A volatile, append-only entry store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEntryStore {
    entries: Arc<RwLock<Vec<LedgerEntry>>>,
}

impl InMemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> LedgerError {
    LedgerError::Persistence {
        reason: format!("entry store lock poisoned: {e}"),
    }
}

impl EntryStore for InMemoryEntryStore {
    fn append(&self, entry: &LedgerEntry) -> LedgerResult<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        let tail = entries.last().map(Tail::of);
        check_append(tail.as_ref(), entry)?;

        entries.push(entry.clone());
        debug!(sequence = entry.sequence_number, "entry stored in memory");
        Ok(())
    }

    fn last_sequence(&self) -> LedgerResult<Option<u64>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.last().map(|e| e.sequence_number))
    }

    fn scan(&self) -> LedgerResult<Vec<LedgerEntry>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.clone())
    }

    fn get(&self, sequence_number: u64) -> LedgerResult<Option<LedgerEntry>> {
        let entries = self.entries.read().map_err(poisoned)?;
        // Sequence numbers are dense from 0, so the index is the sequence.
        Ok(usize::try_from(sequence_number)
            .ok()
            .and_then(|i| entries.get(i))
            .cloned())
    }
}
