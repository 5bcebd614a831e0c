//! The chain engine: sole writer of the audit chain.
//!
//! `ChainEngine` owns the entry store and an in-memory mirror of the chain.
//! Opening an engine either bootstraps a fresh store with its genesis entry
//! or rebuilds the mirror from the stored entries and verifies them. Only
//! after that does the caller get an engine, so no append can ever build on
//! a half-loaded mirror.
//!
//! Appends are serialized by a ledger-wide writer lock held across sequence
//! allocation, sealing, the store write and the mirror update. Reads never
//! take the writer lock; they clone a snapshot of the mirror or scan the
//! store, and see the chain as of that moment.

use std::sync::{Mutex, PoisonError, RwLock};

use serde_json::json;
use tracing::{debug, error, info, warn};

use auditchain_contracts::{
    entry::{Actor, ComplianceLevel, LedgerEntry, OperationRecord, RequestContext},
    error::{LedgerError, LedgerResult},
    query::EntryLookup,
    report::{ChainInfo, EntryVerification, IntegrityReport},
};
use auditchain_core::{builder, hash, traits::EntryStore};

use crate::{
    export::{self, ExportFormat, ExportPeriod},
    merkle,
    verify::verify_chain,
};

/// How the engine reached its ready state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenState {
    /// The store was empty; a genesis entry was written.
    Bootstrapped,
    /// Entries were loaded from the store and verified.
    Rebuilt { integrity: IntegrityReport },
}

/// Hash-chains, persists and verifies ledger entries.
pub struct ChainEngine {
    store: Box<dyn EntryStore>,
    /// Serializes appends. Guards no data of its own.
    writer: Mutex<()>,
    mirror: RwLock<Vec<LedgerEntry>>,
    open_state: OpenState,
}

fn as_persistence(e: LedgerError) -> LedgerError {
    match e {
        LedgerError::Persistence { .. } => e,
        other => LedgerError::Persistence {
            reason: other.to_string(),
        },
    }
}

/// The record sealed at sequence 0 of every chain.
pub fn genesis_record(system_version: &str) -> OperationRecord {
    OperationRecord {
        entity_type: LedgerEntry::SYSTEM_ENTITY.to_string(),
        entity_id: "0".to_string(),
        entity_code: Some("GENESIS".to_string()),
        operation: "system_initialization".to_string(),
        operation_details: Some(json!({
            "type": "genesis",
            "message": "genesis entry of the audit ledger",
            "system_version": system_version,
        })),
        old_values: None,
        new_values: None,
        actor: Actor::system(),
        context: RequestContext::default(),
        compliance_level: ComplianceLevel::Critical,
        retention_period_days: None,
    }
}

impl ChainEngine {
    /// Open the chain held by `store`, bootstrapping or rebuilding it.
    ///
    /// A stored chain that fails verification still opens: the failure is
    /// logged at `error` level and kept in [`ChainEngine::open_state`], and
    /// `verify()` will keep reporting it. Only store errors fail the open.
    pub fn open(store: Box<dyn EntryStore>, system_version: &str) -> LedgerResult<Self> {
        let (entries, open_state) = match store.last_sequence()? {
            None => {
                let genesis = hash::seal(
                    genesis_record(system_version),
                    LedgerEntry::GENESIS_SEQUENCE,
                    hash::capture_time(),
                    LedgerEntry::GENESIS_PREVIOUS_HASH.to_string(),
                )?;
                store.append(&genesis).map_err(as_persistence)?;
                info!(
                    chain_hash = %genesis.chain_hash,
                    system_version,
                    "audit chain bootstrapped with genesis entry"
                );
                (vec![genesis], OpenState::Bootstrapped)
            }
            Some(last_sequence) => {
                let entries = store.scan()?;
                let integrity = verify_chain(&entries);
                if integrity.is_valid {
                    info!(
                        entries = entries.len(),
                        last_sequence,
                        "audit chain rebuilt from store"
                    );
                } else {
                    error!(
                        entries = entries.len(),
                        failed_sequence = ?integrity.failed_sequence,
                        reason = %integrity.message,
                        "audit chain rebuilt from store FAILED verification"
                    );
                }
                (entries, OpenState::Rebuilt { integrity })
            }
        };

        Ok(Self {
            store,
            writer: Mutex::new(()),
            mirror: RwLock::new(entries),
            open_state,
        })
    }

    pub fn open_state(&self) -> &OpenState {
        &self.open_state
    }

    /// Seal `record` at the end of the chain and persist it.
    ///
    /// Returns the stored entry. On `Err` nothing was appended: the store
    /// refused or failed the write and the mirror was left untouched.
    pub fn append(&self, mut record: OperationRecord) -> LedgerResult<LedgerEntry> {
        builder::normalize(&mut record);
        builder::validate(&record)?;

        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let (sequence, previous_hash) = {
            let mirror = self.mirror.read().unwrap_or_else(PoisonError::into_inner);
            match mirror.last() {
                Some(tail) => {
                    let next = tail.sequence_number.checked_add(1).ok_or_else(|| {
                        LedgerError::Persistence {
                            reason: format!(
                                "sequence overflow: no successor exists after sequence {}",
                                tail.sequence_number
                            ),
                        }
                    })?;
                    (next, tail.chain_hash.clone())
                }
                None => (
                    LedgerEntry::GENESIS_SEQUENCE,
                    LedgerEntry::GENESIS_PREVIOUS_HASH.to_string(),
                ),
            }
        };

        let entry = hash::seal(record, sequence, hash::capture_time(), previous_hash)?;

        if let Err(e) = self.store.append(&entry) {
            error!(
                sequence,
                entity_type = %entry.record.entity_type,
                entity_id = %entry.record.entity_id,
                operation = %entry.record.operation,
                error = %e,
                "ledger append failed; entry not committed"
            );
            return Err(as_persistence(e));
        }

        self.mirror
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());

        debug!(
            sequence,
            entity_type = %entry.record.entity_type,
            operation = %entry.record.operation,
            chain_hash = %entry.chain_hash,
            "entry appended to chain"
        );
        Ok(entry)
    }

    /// Verify the stored chain from genesis to tail.
    ///
    /// Reads the store rather than the mirror, so entries rewritten in the
    /// store after the engine opened are caught.
    pub fn verify(&self) -> LedgerResult<IntegrityReport> {
        let entries = self.store.scan()?;
        let report = verify_chain(&entries);
        if report.is_valid {
            debug!(entries = report.entries_checked, "chain verified");
        } else {
            warn!(
                failed_sequence = ?report.failed_sequence,
                reason = %report.message,
                "chain integrity violation detected"
            );
        }
        Ok(report)
    }

    /// A point-in-time copy of the mirrored chain, genesis first.
    pub fn snapshot(&self) -> Vec<LedgerEntry> {
        self.mirror
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The newest entry in the chain.
    pub fn tail(&self) -> Option<LedgerEntry> {
        self.mirror
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Number of entries, genesis included.
    pub fn len(&self) -> u64 {
        self.mirror.read().unwrap_or_else(PoisonError::into_inner).len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look an entry up in the mirror.
    pub fn entry_at(&self, lookup: &EntryLookup) -> Option<LedgerEntry> {
        let mirror = self.mirror.read().unwrap_or_else(PoisonError::into_inner);
        find_index(&mirror, lookup).map(|i| mirror[i].clone())
    }

    /// Check that the entry matching `lookup` is stored and intact.
    ///
    /// Reads the store, recomputes the entry's hashes and checks its link to
    /// the stored predecessor.
    pub fn verify_entry(&self, lookup: &EntryLookup) -> LedgerResult<EntryVerification> {
        let entries = self.store.scan()?;
        let Some(index) = find_index(&entries, lookup) else {
            return Ok(EntryVerification::not_found());
        };

        let entry = &entries[index];
        let recomputed = hash::recompute(entry)?;
        let expected_previous = match index.checked_sub(1) {
            Some(prev) => entries[prev].chain_hash.as_str(),
            None => LedgerEntry::GENESIS_PREVIOUS_HASH,
        };

        Ok(EntryVerification {
            found: true,
            sequence_number: Some(entry.sequence_number),
            chain_hash: Some(entry.chain_hash.clone()),
            data_hash_matches: recomputed.data_matches(entry),
            chain_hash_matches: recomputed.chain_matches(entry),
            linked_to_predecessor: entry.previous_hash == expected_previous,
        })
    }

    /// Summary of the chain with a fresh integrity check.
    pub fn info(&self) -> LedgerResult<ChainInfo> {
        let integrity = self.verify()?;
        let (chain_length, tail) = {
            let mirror = self.mirror.read().unwrap_or_else(PoisonError::into_inner);
            (mirror.len() as u64, mirror.last().cloned())
        };

        Ok(ChainInfo {
            chain_length,
            last_sequence: tail.as_ref().map(|t| t.sequence_number).unwrap_or_default(),
            last_chain_hash: tail.map(|t| t.chain_hash).unwrap_or_default(),
            is_valid: integrity.is_valid,
            integrity_message: integrity.message,
            generated_at: chrono::Utc::now(),
        })
    }

    /// Merkle root of an arbitrary batch of entries.
    pub fn merkle_root(&self, entries: &[LedgerEntry]) -> String {
        merkle::merkle_root(entries)
    }

    /// Export the whole stored chain, stamped with a fresh integrity check.
    pub fn export_chain(&self, format: ExportFormat) -> LedgerResult<Vec<u8>> {
        let entries = self.store.scan()?;
        let integrity = verify_chain(&entries);
        info!(
            entries = entries.len(),
            integrity_verified = integrity.is_valid,
            "exporting audit chain"
        );
        export::encode(&entries, &integrity, None, format)
    }

    /// Export a caller-selected subset of entries.
    ///
    /// `integrity` is the check the caller performed for this export.
    pub fn export_entries(
        &self,
        entries: &[LedgerEntry],
        integrity: &IntegrityReport,
        period: Option<ExportPeriod>,
        format: ExportFormat,
    ) -> LedgerResult<Vec<u8>> {
        info!(
            entries = entries.len(),
            integrity_verified = integrity.is_valid,
            "exporting audit chain range"
        );
        export::encode(entries, integrity, period, format)
    }
}

fn find_index(entries: &[LedgerEntry], lookup: &EntryLookup) -> Option<usize> {
    match lookup {
        EntryLookup::Sequence(sequence) => entries
            .binary_search_by_key(sequence, |e| e.sequence_number)
            .ok(),
        EntryLookup::Entity {
            entity_type,
            entity_id,
            operation,
        } => entries.iter().rposition(|e| {
            e.record.entity_type == *entity_type
                && e.record.entity_id == *entity_id
                && operation.as_ref().is_none_or(|op| e.record.operation == *op)
        }),
    }
}
