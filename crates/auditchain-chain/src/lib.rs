//! # auditchain-chain
//!
//! The hash chain at the heart of the AuditChain ledger.
//!
//! ## Overview
//!
//! [`ChainEngine`] is the only writer of the chain. Each appended record is
//! sealed with a `data_hash` over its content and a `chain_hash` linking it
//! to the previous entry, then persisted through an `EntryStore`. Rewriting
//! any stored field afterwards is caught by [`verify_chain`].
//!
//! Around the engine sit batch attestation ([`merkle`]) and the auditor
//! export ([`export`]), which can be re-verified without the store.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auditchain_chain::{ChainEngine, ExportFormat};
//! use auditchain_store::InMemoryEntryStore;
//!
//! let engine = ChainEngine::open(Box::new(InMemoryEntryStore::new()), "1.0.0")?;
//! engine.append(record)?;
//!
//! assert!(engine.verify()?.is_valid);
//! let export = engine.export_chain(ExportFormat::Json)?;
//! ```

pub mod engine;
pub mod export;
pub mod merkle;
pub mod verify;

pub use engine::{ChainEngine, OpenState};
pub use export::{verify_export, ExportDocument, ExportFormat, ExportPeriod, ExportVerification};
pub use merkle::{merkle_root, MerkleProof, MerkleTree};
pub use verify::{verify_chain, verify_segment};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    };

    use chrono::{Duration, Utc};
    use serde_json::{json, Value};

    use auditchain_contracts::{
        entry::{Actor, ComplianceLevel, LedgerEntry, OperationRecord},
        error::{LedgerError, LedgerResult},
        query::EntryLookup,
        report::IntegrityReport,
    };
    use auditchain_core::{hash, traits::EntryStore, OperationBuilder};
    use auditchain_store::{InMemoryEntryStore, JsonlEntryStore};

    use super::{
        export::{encode, validate_shape, ExportFormat, ExportPeriod},
        merkle::{empty_root, MerkleTree},
        verify_export, ChainEngine, OpenState,
    };

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// A store whose contents tests can rewrite behind the engine's back,
    /// and whose appends can be made to fail.
    #[derive(Clone, Default)]
    struct SharedStore {
        entries: Arc<Mutex<Vec<LedgerEntry>>>,
        fail_appends: Arc<AtomicBool>,
    }

    impl SharedStore {
        fn tamper(&self, sequence: u64, f: impl FnOnce(&mut LedgerEntry)) {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries
                .iter_mut()
                .find(|e| e.sequence_number == sequence)
                .expect("entry to tamper with");
            f(entry);
        }

        fn remove(&self, sequence: u64) {
            self.entries
                .lock()
                .unwrap()
                .retain(|e| e.sequence_number != sequence);
        }

        fn set_failing(&self, failing: bool) {
            self.fail_appends.store(failing, Ordering::SeqCst);
        }
    }

    impl EntryStore for SharedStore {
        fn append(&self, entry: &LedgerEntry) -> LedgerResult<()> {
            if self.fail_appends.load(Ordering::SeqCst) {
                return Err(LedgerError::Persistence {
                    reason: "disk full".to_string(),
                });
            }
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        fn last_sequence(&self) -> LedgerResult<Option<u64>> {
            Ok(self.entries.lock().unwrap().last().map(|e| e.sequence_number))
        }

        fn scan(&self) -> LedgerResult<Vec<LedgerEntry>> {
            Ok(self.entries.lock().unwrap().clone())
        }
    }

    fn record(entity_type: &str, entity_id: &str, operation: &str) -> OperationRecord {
        OperationBuilder::new(entity_type, entity_id, operation)
            .actor(Actor::new(7, "alice", "editor"))
            .new_values(json!({ "title": "Q1 report" }))
            .build()
            .unwrap()
    }

    /// Engine over a `SharedStore` holding genesis, then document 1 `create`
    /// (A) and document 1 `publish` (B).
    fn scenario() -> (ChainEngine, SharedStore, LedgerEntry, LedgerEntry) {
        let store = SharedStore::default();
        let engine = ChainEngine::open(Box::new(store.clone()), "1.0.0").unwrap();
        let a = engine.append(record("document", "1", "create")).unwrap();
        let b = engine.append(record("document", "1", "publish")).unwrap();
        (engine, store, a, b)
    }

    fn parse(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    // ── Genesis and appends ───────────────────────────────────────────────────

    #[test]
    fn fresh_store_is_bootstrapped_with_genesis() {
        let engine = ChainEngine::open(Box::new(InMemoryEntryStore::new()), "2.1.0").unwrap();

        assert_eq!(engine.open_state(), &OpenState::Bootstrapped);
        assert_eq!(engine.len(), 1);

        let genesis = engine.tail().unwrap();
        assert!(genesis.is_genesis());
        assert_eq!(genesis.previous_hash, "0");
        assert_eq!(genesis.record.entity_type, LedgerEntry::SYSTEM_ENTITY);
        assert_eq!(genesis.record.operation, "system_initialization");
        assert!(genesis.record.actor.is_system());
        assert_eq!(genesis.record.compliance_level, ComplianceLevel::Critical);
        assert_eq!(
            genesis.record.operation_details.as_ref().unwrap()["system_version"],
            "2.1.0"
        );

        let report = engine.verify().unwrap();
        assert!(report.is_valid);
        assert_eq!(report.entries_checked, 1);
    }

    #[test]
    fn appends_link_to_their_predecessor() {
        let (engine, _store, a, b) = scenario();
        let genesis = engine.snapshot()[0].clone();

        assert_eq!(a.sequence_number, 1);
        assert_eq!(a.previous_hash, genesis.chain_hash);
        assert_eq!(b.sequence_number, 2);
        assert_eq!(b.previous_hash, a.chain_hash);
        assert_eq!(
            a.chain_hash,
            hash::chain_hash(&a.previous_hash, &a.data_hash),
            "chain hash must seal previous_hash and data_hash"
        );

        let report = engine.verify().unwrap();
        assert!(report.is_valid);
        assert_eq!(report.message, "chain intact");
    }

    #[test]
    fn timestamps_are_non_decreasing() {
        let (engine, _store, _a, _b) = scenario();
        let snapshot = engine.snapshot();
        assert!(snapshot.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn append_after_final_sequence_is_refused() {
        let store = SharedStore::default();
        let genesis = ChainEngine::open(Box::new(store.clone()), "1.0.0")
            .unwrap()
            .tail()
            .unwrap();
        let last = hash::seal(
            record("document", "1", "create"),
            u64::MAX,
            hash::capture_time(),
            genesis.chain_hash,
        )
        .unwrap();
        store.entries.lock().unwrap().push(last);

        let engine = ChainEngine::open(Box::new(store.clone()), "1.0.0").unwrap();
        match engine.append(record("document", "1", "publish")) {
            Err(LedgerError::Persistence { reason }) => {
                assert!(reason.contains("sequence overflow"), "unexpected reason: {reason}")
            }
            other => panic!("expected Persistence error, got {:?}", other),
        }
        assert_eq!(store.scan().unwrap().len(), 2, "nothing may be written past the final sequence");
    }

    #[test]
    fn invalid_record_is_rejected_before_sealing() {
        let (engine, store, _a, _b) = scenario();
        let mut bad = record("document", "C", "create");
        bad.operation = String::new();

        match engine.append(bad) {
            Err(LedgerError::InvalidEntry { reason }) => assert!(reason.contains("operation")),
            other => panic!("expected InvalidEntry, got {:?}", other),
        }
        assert_eq!(engine.len(), 3);
        assert_eq!(store.scan().unwrap().len(), 3);
    }

    #[test]
    fn failed_persistence_does_not_advance_the_chain() {
        let (engine, store, _a, b) = scenario();

        store.set_failing(true);
        match engine.append(record("document", "C", "create")) {
            Err(LedgerError::Persistence { reason }) => assert!(reason.contains("disk full")),
            other => panic!("expected Persistence error, got {:?}", other),
        }
        assert_eq!(engine.len(), 3, "mirror must not advance on failure");
        assert_eq!(engine.tail().unwrap(), b);

        store.set_failing(false);
        let c = engine.append(record("document", "C", "create")).unwrap();
        assert_eq!(c.sequence_number, 3, "failed append must not leave a gap");
        assert_eq!(c.previous_hash, b.chain_hash);
        assert!(engine.verify().unwrap().is_valid);
    }

    #[test]
    fn concurrent_appends_yield_a_gapless_chain() {
        let engine = ChainEngine::open(Box::new(InMemoryEntryStore::new()), "1.0.0").unwrap();

        std::thread::scope(|scope| {
            for thread in 0..8 {
                let engine = &engine;
                scope.spawn(move || {
                    for i in 0..25 {
                        engine
                            .append(record("document", &format!("{thread}-{i}"), "create"))
                            .unwrap();
                    }
                });
            }
        });

        let sequences: Vec<u64> = engine.snapshot().iter().map(|e| e.sequence_number).collect();
        assert_eq!(sequences, (0..=200).collect::<Vec<u64>>());
        assert!(engine.verify().unwrap().is_valid);
    }

    // ── Tamper detection ──────────────────────────────────────────────────────

    #[test]
    fn modified_record_is_detected() {
        let (engine, store, _a, _b) = scenario();
        let before = engine.verify().unwrap();
        assert!(before.is_valid);
        assert_eq!(before.message, "chain intact");

        store.tamper(1, |e| e.record.new_values = Some(json!({ "title": "forged" })));

        let report = engine.verify().unwrap();
        assert!(!report.is_valid);
        assert_eq!(report.message, "data hash mismatch at sequence 1");
        assert_eq!(report.failed_sequence, Some(1));
    }

    #[test]
    fn overwritten_data_hash_is_detected() {
        let (engine, store, _a, _b) = scenario();
        store.tamper(1, |e| e.data_hash = "0".repeat(64));

        let report = engine.verify().unwrap();
        assert_eq!(report.message, "data hash mismatch at sequence 1");
        assert_eq!(report.failed_sequence, Some(1));
    }

    #[test]
    fn overwritten_previous_hash_is_detected() {
        let (engine, store, _a, _b) = scenario();
        store.tamper(2, |e| e.previous_hash = "f".repeat(64));

        let report = engine.verify().unwrap();
        assert_eq!(
            report.message, "chain hash mismatch at sequence 2",
            "an unsealed link change breaks the seal before the link check"
        );
        assert_eq!(report.failed_sequence, Some(2));
    }

    #[test]
    fn modified_genesis_details_are_detected() {
        let (engine, store, _a, _b) = scenario();
        store.tamper(0, |e| {
            e.record.operation_details = Some(json!({ "type": "genesis", "system_version": "9.9.9" }))
        });

        let report = engine.verify().unwrap();
        assert_eq!(report.message, "data hash mismatch at sequence 0");
        assert_eq!(report.failed_sequence, Some(0));
    }

    #[test]
    fn modified_genesis_sentinel_is_detected() {
        let (engine, store, _a, _b) = scenario();
        store.tamper(0, |e| e.previous_hash = "1".to_string());

        let report = engine.verify().unwrap();
        assert_eq!(
            report.message,
            "genesis entry at sequence 0 does not carry the sentinel previous hash"
        );
        assert_eq!(report.failed_sequence, Some(0));
    }

    #[test]
    fn renumbered_entry_is_blamed_at_its_position() {
        let (engine, store, _a, _b) = scenario();
        store.tamper(2, |e| e.sequence_number = 1);

        let report = engine.verify().unwrap();
        assert!(!report.is_valid);
        assert_eq!(
            report.failed_sequence,
            Some(2),
            "the intact entry at sequence 1 must not be blamed"
        );
        assert_eq!(report.message, "sequence mismatch at sequence 2: found sequence number 1");
    }

    #[test]
    fn modified_timestamp_is_detected() {
        let (engine, store, _a, _b) = scenario();
        store.tamper(2, |e| e.timestamp -= Duration::seconds(30));

        let report = engine.verify().unwrap();
        assert_eq!(report.failed_sequence, Some(2));
        assert!(report.message.contains("data hash mismatch"));
    }

    #[test]
    fn overwritten_chain_hash_is_detected() {
        let (engine, store, _a, _b) = scenario();
        store.tamper(2, |e| e.chain_hash = "0".repeat(64));

        let report = engine.verify().unwrap();
        assert_eq!(report.message, "chain hash mismatch at sequence 2");
    }

    #[test]
    fn resealed_entry_with_wrong_link_is_detected() {
        let (engine, store, _a, _b) = scenario();
        store.tamper(2, |e| {
            e.previous_hash = "f".repeat(64);
            e.chain_hash = hash::chain_hash(&e.previous_hash, &e.data_hash);
        });

        let report = engine.verify().unwrap();
        assert_eq!(report.message, "broken link at sequence 2");
    }

    #[test]
    fn deleted_entry_is_detected() {
        let (engine, store, _a, _b) = scenario();
        store.remove(1);

        let report = engine.verify().unwrap();
        assert!(!report.is_valid);
        assert_eq!(report.failed_sequence, Some(1), "the gap is reported where the entry went missing");
        assert_eq!(report.message, "sequence mismatch at sequence 1: found sequence number 2");
    }

    #[test]
    fn published_merkle_root_exposes_a_fully_resealed_history() {
        let (engine, store, a, _b) = scenario();
        let published = engine.merkle_root(&store.scan().unwrap());

        // Rewrite A and re-seal everything after it.
        let mut forged = store.scan().unwrap();
        let mut previous = forged[0].chain_hash.clone();
        for entry in forged.iter_mut().skip(1) {
            let mut rec = entry.record.clone();
            if entry.sequence_number == a.sequence_number {
                rec.new_values = Some(json!({ "title": "forged" }));
            }
            *entry = hash::seal(rec, entry.sequence_number, entry.timestamp, previous).unwrap();
            previous = entry.chain_hash.clone();
        }
        *store.entries.lock().unwrap() = forged;

        assert!(
            engine.verify().unwrap().is_valid,
            "a consistent re-seal passes the walk"
        );
        assert_ne!(engine.merkle_root(&store.scan().unwrap()), published);
    }

    // ── Rebuild ───────────────────────────────────────────────────────────────

    #[test]
    fn reopening_rebuilds_an_identical_chain() {
        let store = InMemoryEntryStore::new();
        let before = {
            let engine = ChainEngine::open(Box::new(store.clone()), "1.0.0").unwrap();
            for id in ["A", "B", "C"] {
                engine.append(record("document", id, "create")).unwrap();
            }
            engine.snapshot()
        };

        let engine = ChainEngine::open(Box::new(store.clone()), "1.0.0").unwrap();
        match engine.open_state() {
            OpenState::Rebuilt { integrity } => {
                assert!(integrity.is_valid);
                assert_eq!(integrity.entries_checked, 4);
            }
            other => panic!("expected Rebuilt, got {:?}", other),
        }
        assert_eq!(engine.snapshot(), before);

        let next = engine.append(record("document", "D", "create")).unwrap();
        assert_eq!(next.sequence_number, 4);
        assert_eq!(next.previous_hash, before[3].chain_hash);
    }

    #[test]
    fn jsonl_backed_chain_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        let first = {
            let store = JsonlEntryStore::open(&path).unwrap();
            let engine = ChainEngine::open(Box::new(store), "1.0.0").unwrap();
            engine.append(record("document", "A", "create")).unwrap()
        };

        let engine = ChainEngine::open(Box::new(JsonlEntryStore::open(&path).unwrap()), "1.0.0")
            .unwrap();
        assert!(matches!(engine.open_state(), OpenState::Rebuilt { integrity } if integrity.is_valid));

        let second = engine.append(record("document", "A", "update")).unwrap();
        assert_eq!(second.sequence_number, 2);
        assert_eq!(second.previous_hash, first.chain_hash);
        assert!(engine.verify().unwrap().is_valid);
    }

    #[test]
    fn rebuild_reports_a_tampered_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        {
            let engine =
                ChainEngine::open(Box::new(JsonlEntryStore::open(&path).unwrap()), "1.0.0").unwrap();
            engine.append(record("document", "A", "create")).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, contents.replace("Q1 report", "Q9 report")).unwrap();

        let engine = ChainEngine::open(Box::new(JsonlEntryStore::open(&path).unwrap()), "1.0.0")
            .unwrap();
        match engine.open_state() {
            OpenState::Rebuilt { integrity } => {
                assert!(!integrity.is_valid, "tampered file must fail rebuild verification");
                assert_eq!(integrity.failed_sequence, Some(1));
            }
            other => panic!("expected Rebuilt, got {:?}", other),
        }
        assert!(!engine.verify().unwrap().is_valid);
    }

    // ── Lookups ───────────────────────────────────────────────────────────────

    #[test]
    fn entry_at_finds_by_sequence_and_entity() {
        let (engine, _store, a, b) = scenario();
        let update = engine.append(record("document", "1", "update")).unwrap();

        assert_eq!(engine.entry_at(&EntryLookup::Sequence(1)), Some(a.clone()));
        assert_eq!(engine.entry_at(&EntryLookup::Sequence(2)), Some(b));
        assert_eq!(
            engine.entry_at(&EntryLookup::entity("document", "1")),
            Some(update),
            "entity lookup returns the most recent match"
        );
        assert_eq!(
            engine.entry_at(&EntryLookup::entity_operation("document", "1", "create")),
            Some(a)
        );
        assert_eq!(engine.entry_at(&EntryLookup::entity("document", "Z")), None);
        assert_eq!(engine.entry_at(&EntryLookup::Sequence(99)), None);
    }

    #[test]
    fn verify_entry_reports_per_entry_integrity() {
        let (engine, store, a, _b) = scenario();

        let intact = engine
            .verify_entry(&EntryLookup::entity_operation("document", "1", "create"))
            .unwrap();
        assert!(intact.is_intact());
        assert_eq!(intact.sequence_number, Some(1));
        assert_eq!(intact.chain_hash, Some(a.chain_hash));

        store.tamper(1, |e| e.record.operation = "delete".to_string());
        let tampered = engine.verify_entry(&EntryLookup::Sequence(1)).unwrap();
        assert!(tampered.found);
        assert!(!tampered.data_hash_matches);
        assert!(!tampered.is_intact());

        let missing = engine.verify_entry(&EntryLookup::entity("user", "9")).unwrap();
        assert!(!missing.found);
    }

    #[test]
    fn info_summarizes_the_chain() {
        let (engine, _store, _a, b) = scenario();
        let info = engine.info().unwrap();

        assert_eq!(info.chain_length, 3);
        assert_eq!(info.last_sequence, 2);
        assert_eq!(info.last_chain_hash, b.chain_hash);
        assert!(info.is_valid);
        assert_eq!(info.integrity_message, IntegrityReport::INTACT);
    }

    // ── Merkle ────────────────────────────────────────────────────────────────

    fn leaves(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn merkle_root_of_empty_batch_is_hash_of_empty() {
        assert_eq!(
            empty_root(),
            "2e1cfa82b035c26cbbbdae632cea070514eb8b773f616aaeaf668e2f0be8f10d"
        );
        assert_eq!(super::merkle_root(&[]), empty_root());
    }

    #[test]
    fn merkle_root_of_single_leaf_is_the_leaf() {
        let tree = MerkleTree::from_leaves(leaves(&["abc"]));
        assert_eq!(tree.root(), "abc");
    }

    #[test]
    fn merkle_root_pairs_and_duplicates_odd_nodes() {
        let two = MerkleTree::from_leaves(leaves(&["a", "b"]));
        assert_eq!(two.root(), hash::sha256_hex(b"ab"));

        let three = MerkleTree::from_leaves(leaves(&["a", "b", "c"]));
        let left = hash::sha256_hex(b"ab");
        let right = hash::sha256_hex(b"cc");
        assert_eq!(three.root(), hash::sha256_hex(format!("{left}{right}").as_bytes()));
    }

    #[test]
    fn merkle_root_is_order_sensitive() {
        let ab = MerkleTree::from_leaves(leaves(&["a", "b"]));
        let ba = MerkleTree::from_leaves(leaves(&["b", "a"]));
        assert_ne!(ab.root(), ba.root());
    }

    #[test]
    fn merkle_root_of_entries_is_deterministic() {
        let (engine, _store, _a, _b) = scenario();
        let entries = engine.snapshot();

        let root = engine.merkle_root(&entries);
        assert_eq!(root, engine.merkle_root(&entries));
        let from_hashes =
            MerkleTree::from_leaves(entries.iter().map(|e| e.chain_hash.clone()).collect());
        assert_eq!(root, from_hashes.root());
    }

    #[test]
    fn merkle_proofs_verify_for_every_leaf() {
        let tree = MerkleTree::from_leaves(leaves(&["a", "b", "c", "d", "e"]));
        assert_eq!(tree.leaf_count(), 5);

        for index in 0..5 {
            let proof = tree.proof(index).unwrap();
            assert_eq!(proof.root, tree.root());
            assert!(proof.verify(), "proof for leaf {index} must verify");
        }
        assert!(tree.proof(5).is_none());

        let mut forged = tree.proof(2).unwrap();
        forged.leaf = "x".to_string();
        assert!(!forged.verify());
    }

    // ── Export ────────────────────────────────────────────────────────────────

    #[test]
    fn export_has_the_published_shape() {
        let (engine, _store, a, _b) = scenario();
        let bytes = engine.export_chain(ExportFormat::Json).unwrap();
        let doc = parse(&bytes);

        validate_shape(&doc).unwrap();

        let info = &doc["export_info"];
        assert_eq!(info["entry_count"], 3);
        assert_eq!(info["format"], "json");
        assert_eq!(info["integrity_verified"], true);
        assert_eq!(info["integrity_message"], "chain intact");
        assert_eq!(info["merkle_root"], engine.merkle_root(&engine.snapshot()));
        assert!(info.get("period").is_none());

        let chain = doc["chain"].as_array().unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0]["previous_hash"], "0");
        assert_eq!(chain[1]["hash"], a.chain_hash);
        assert_eq!(chain[1]["data"]["entity_id"], "1");
    }

    #[test]
    fn export_of_tampered_chain_says_so() {
        let (engine, store, _a, _b) = scenario();
        store.tamper(1, |e| e.record.operation = "delete".to_string());

        let doc = parse(&engine.export_chain(ExportFormat::Json).unwrap());
        assert_eq!(doc["export_info"]["integrity_verified"], false);
        assert_eq!(
            doc["export_info"]["integrity_message"],
            "data hash mismatch at sequence 1"
        );
    }

    #[test]
    fn exported_chain_verifies_independently() {
        let (engine, _store, _a, _b) = scenario();
        let bytes = engine.export_chain(ExportFormat::Json).unwrap();

        let verification = verify_export(&bytes).unwrap();
        assert!(verification.is_valid());
        assert!(verification.claimed_integrity);
        assert_eq!(verification.chain.entries_checked, 3);
    }

    #[test]
    fn edited_export_fails_verification() {
        let (engine, _store, _a, _b) = scenario();
        let mut doc = parse(&engine.export_chain(ExportFormat::Json).unwrap());
        doc["chain"][1]["data"]["new_values"]["title"] = json!("forged");

        let verification = verify_export(&serde_json::to_vec(&doc).unwrap()).unwrap();
        assert!(!verification.is_valid());
        assert_eq!(verification.chain.failed_sequence, Some(1));
        assert!(verification.merkle_root_matches, "hash fields were left alone");
    }

    #[test]
    fn export_with_wrong_merkle_claim_fails_verification() {
        let (engine, _store, _a, _b) = scenario();
        let mut doc = parse(&engine.export_chain(ExportFormat::Json).unwrap());
        doc["export_info"]["merkle_root"] = json!("0".repeat(64));

        let verification = verify_export(&serde_json::to_vec(&doc).unwrap()).unwrap();
        assert!(verification.chain.is_valid);
        assert!(!verification.merkle_root_matches);
        assert!(!verification.is_valid());
    }

    #[test]
    fn export_missing_chain_is_rejected_by_schema() {
        let (engine, _store, _a, _b) = scenario();
        let mut doc = parse(&engine.export_chain(ExportFormat::Json).unwrap());
        doc.as_object_mut().unwrap().remove("chain");

        match verify_export(&serde_json::to_vec(&doc).unwrap()) {
            Err(LedgerError::ExportSchema { reason }) => assert!(reason.contains("chain")),
            other => panic!("expected ExportSchema error, got {:?}", other),
        }
    }

    #[test]
    fn range_export_verifies_as_a_segment() {
        let (engine, _store, _a, _b) = scenario();
        let entries = engine.snapshot();
        let period = ExportPeriod {
            start: entries[1].timestamp,
            end: Utc::now(),
        };

        let bytes = engine
            .export_entries(&entries[1..], &IntegrityReport::intact(2), Some(period), ExportFormat::Json)
            .unwrap();
        let doc = parse(&bytes);
        assert_eq!(doc["export_info"]["entry_count"], 2);
        assert!(doc["export_info"]["period"].is_object());

        assert!(verify_export(&bytes).unwrap().is_valid());
    }

    #[test]
    fn export_with_overflowing_sequence_fails_verification() {
        let first = hash::seal(
            record("document", "1", "create"),
            u64::MAX,
            hash::capture_time(),
            "f".repeat(64),
        )
        .unwrap();
        let wrapped = hash::seal(
            record("document", "1", "publish"),
            0,
            first.timestamp,
            first.chain_hash.clone(),
        )
        .unwrap();
        let entries = vec![first, wrapped];

        let bytes = encode(&entries, &IntegrityReport::intact(2), None, ExportFormat::Json).unwrap();
        let verification = verify_export(&bytes).unwrap();
        assert!(!verification.is_valid());
        assert_eq!(verification.chain.failed_sequence, Some(0));
        assert!(
            verification.chain.message.contains("sequence overflow"),
            "unexpected message: {}",
            verification.chain.message
        );
    }

    #[test]
    fn unknown_export_format_is_rejected() {
        match "xml".parse::<ExportFormat>() {
            Err(LedgerError::UnsupportedFormat { format }) => assert_eq!(format, "xml"),
            other => panic!("expected UnsupportedFormat, got {:?}", other),
        }
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
    }
}
