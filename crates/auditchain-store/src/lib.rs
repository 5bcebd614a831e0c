//! # auditchain-store
//!
//! `EntryStore` implementations for the AuditChain ledger.
//!
//! - [`InMemoryEntryStore`]: volatile, for tests and embedding
//! - [`JsonlEntryStore`]: one JSON object per line in an append-only file
//!
//! Both refuse appends that would break the chain (wrong sequence number,
//! wrong `previous_hash`, or hashes that disagree with the entry's fields).
//! Neither exposes a way to modify or remove a stored entry.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auditchain_store::JsonlEntryStore;
//!
//! let store = JsonlEntryStore::open("var/audit-ledger.jsonl")?;
//! let engine = ChainEngine::open(Box::new(store), "1.0.0")?;
//! ```

mod guard;
pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlEntryStore;
pub use memory::InMemoryEntryStore;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use auditchain_contracts::{entry::LedgerEntry, error::LedgerError};
    use auditchain_core::{hash, traits::EntryStore, OperationBuilder};

    use super::{
        guard::{check_append, Tail},
        InMemoryEntryStore, JsonlEntryStore,
    };

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Build a correctly linked chain of `len` entries starting at genesis.
    fn make_chain(len: u64) -> Vec<LedgerEntry> {
        let mut chain: Vec<LedgerEntry> = Vec::new();
        for seq in 0..len {
            let record = OperationBuilder::new("document", seq.to_string(), "create")
                .new_values(json!({ "n": seq }))
                .build()
                .unwrap();
            let previous = chain
                .last()
                .map(|e| e.chain_hash.clone())
                .unwrap_or_else(|| LedgerEntry::GENESIS_PREVIOUS_HASH.to_string());
            chain.push(hash::seal(record, seq, hash::capture_time(), previous).unwrap());
        }
        chain
    }

    fn assert_constraint_error(result: Result<(), LedgerError>, needle: &str) {
        match result {
            Err(LedgerError::Persistence { reason }) => {
                assert!(reason.contains(needle), "expected '{needle}' in: {reason}")
            }
            other => panic!("expected Persistence error, got {:?}", other),
        }
    }

    // ── InMemoryEntryStore ────────────────────────────────────────────────────

    #[test]
    fn memory_store_appends_in_order() {
        let store = InMemoryEntryStore::new();
        assert!(store.is_empty().unwrap());
        assert_eq!(store.last_sequence().unwrap(), None);

        for entry in make_chain(3) {
            store.append(&entry).unwrap();
        }

        assert_eq!(store.last_sequence().unwrap(), Some(2));
        assert_eq!(store.len().unwrap(), 3);
        let sequences: Vec<u64> = store.scan().unwrap().iter().map(|e| e.sequence_number).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
        assert_eq!(store.get(1).unwrap().unwrap().record.entity_id, "1");
        assert!(store.get(7).unwrap().is_none());
    }

    #[test]
    fn memory_store_clones_share_storage() {
        let store = InMemoryEntryStore::new();
        let handle = store.clone();
        store.append(&make_chain(1)[0]).unwrap();
        assert_eq!(handle.len().unwrap(), 1);
    }

    #[test]
    fn store_rejects_non_genesis_first_entry() {
        let chain = make_chain(2);
        let store = InMemoryEntryStore::new();
        assert_constraint_error(store.append(&chain[1]), "expected 0, got 1");
        assert!(store.is_empty().unwrap(), "rejected append must not be stored");
    }

    #[test]
    fn store_rejects_sequence_gap_and_duplicate() {
        let chain = make_chain(3);
        let store = InMemoryEntryStore::new();
        store.append(&chain[0]).unwrap();
        assert_constraint_error(store.append(&chain[2]), "expected 1, got 2");
        store.append(&chain[1]).unwrap();
        assert_constraint_error(store.append(&chain[1]), "expected 2, got 1");
    }

    #[test]
    fn store_refuses_successor_of_final_sequence() {
        let tail = Tail {
            sequence_number: u64::MAX,
            chain_hash: "c".repeat(64),
        };
        assert_constraint_error(
            check_append(Some(&tail), &make_chain(1)[0]),
            "no successor exists after sequence 18446744073709551615",
        );
    }

    #[test]
    fn store_rejects_broken_link() {
        let chain = make_chain(2);
        let store = InMemoryEntryStore::new();
        store.append(&chain[0]).unwrap();

        let record = chain[1].record.clone();
        let unlinked = hash::seal(record, 1, chain[1].timestamp, "f".repeat(64)).unwrap();
        assert_constraint_error(store.append(&unlinked), "link constraint");
    }

    #[test]
    fn store_rejects_entry_with_stale_hash() {
        let mut chain = make_chain(1);
        chain[0].record.operation = "delete".to_string();
        let store = InMemoryEntryStore::new();
        assert_constraint_error(store.append(&chain[0]), "data hash mismatch at sequence 0");
    }

    // ── JsonlEntryStore ───────────────────────────────────────────────────────

    #[test]
    fn jsonl_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger").join("audit.jsonl");
        let chain = make_chain(4);

        {
            let store = JsonlEntryStore::open(&path).unwrap();
            for entry in &chain {
                store.append(entry).unwrap();
            }
        }

        let reopened = JsonlEntryStore::open(&path).unwrap();
        assert_eq!(reopened.last_sequence().unwrap(), Some(3));
        assert_eq!(reopened.scan().unwrap(), chain);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 4, "one line per entry");
    }

    #[test]
    fn jsonl_store_continues_chain_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let chain = make_chain(3);

        JsonlEntryStore::open(&path).unwrap().append(&chain[0]).unwrap();

        let store = JsonlEntryStore::open(&path).unwrap();
        assert_constraint_error(store.append(&chain[2]), "expected 1, got 2");
        store.append(&chain[1]).unwrap();
        store.append(&chain[2]).unwrap();
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn jsonl_store_discards_torn_trailing_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let chain = make_chain(2);

        {
            let store = JsonlEntryStore::open(&path).unwrap();
            store.append(&chain[0]).unwrap();
        }
        {
            let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(br#"{"sequence_number":1,"times"#).unwrap();
        }

        let store = JsonlEntryStore::open(&path).unwrap();
        assert_eq!(store.last_sequence().unwrap(), Some(0));
        store.append(&chain[1]).unwrap();
        assert_eq!(store.scan().unwrap(), chain);
    }

    #[test]
    fn jsonl_store_reports_corrupt_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        std::fs::write(&path, "not json\n").unwrap();

        match JsonlEntryStore::open(&path) {
            Err(LedgerError::Persistence { reason }) => assert!(reason.contains("line 1")),
            Err(other) => panic!("expected Persistence error, got {other}"),
            Ok(_) => panic!("corrupt store must not open"),
        }
    }

    #[test]
    fn jsonl_store_get_uses_scan() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlEntryStore::open(dir.path().join("audit.jsonl")).unwrap();
        for entry in make_chain(3) {
            store.append(&entry).unwrap();
        }
        assert_eq!(store.get(2).unwrap().unwrap().sequence_number, 2);
        assert!(store.get(3).unwrap().is_none());
    }
}
