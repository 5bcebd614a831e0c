//! Canonical encoding and SHA-256 hashing of ledger entries.
//!
//! `data_hash` input: the compact JSON encoding of
//!
//! ```text
//! { "record": <OperationRecord>, "sequence_number": <u64>, "timestamp": <RFC 3339, µs, Z> }
//! ```
//!
//! with object keys sorted at every depth. `chain_hash` input: the UTF-8
//! bytes of `previous_hash` immediately followed by `data_hash`. Both hashes
//! are lowercase 64-character hex strings.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

use auditchain_contracts::{
    entry::{LedgerEntry, OperationRecord},
    error::{LedgerError, LedgerResult},
};

/// SHA-256 of `bytes` as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Current time truncated to the precision the ledger stores.
pub fn capture_time() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// The textual timestamp form committed to by `data_hash`.
pub fn canonical_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Encode `value` as compact JSON with object keys sorted at every level.
///
/// Key order is enforced here rather than relying on the map type inside
/// `serde_json::Value`, which changes with the `preserve_order` feature.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<(&String, &Value)> = map.iter().collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, field)) in fields.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(field, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Compute the content hash of an entry from its hashed fields.
pub fn data_hash(
    sequence_number: u64,
    timestamp: &DateTime<Utc>,
    record: &OperationRecord,
) -> LedgerResult<String> {
    let record = serde_json::to_value(record).map_err(|e| LedgerError::Serialization {
        reason: format!("operation record is not encodable: {e}"),
    })?;

    let content = serde_json::json!({
        "sequence_number": sequence_number,
        "timestamp": canonical_timestamp(timestamp),
        "record": record,
    });

    Ok(sha256_hex(canonical_json(&content).as_bytes()))
}

/// Compute the hash linking an entry to its predecessor.
pub fn chain_hash(previous_hash: &str, data_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous_hash.as_bytes());
    hasher.update(data_hash.as_bytes());
    hex::encode(hasher.finalize())
}

/// Seal a record into a `LedgerEntry` at the given chain position.
pub fn seal(
    record: OperationRecord,
    sequence_number: u64,
    timestamp: DateTime<Utc>,
    previous_hash: String,
) -> LedgerResult<LedgerEntry> {
    let data_hash = data_hash(sequence_number, &timestamp, &record)?;
    let chain_hash = chain_hash(&previous_hash, &data_hash);

    Ok(LedgerEntry {
        sequence_number,
        timestamp,
        record,
        data_hash,
        previous_hash,
        chain_hash,
    })
}

/// Hashes recomputed from an entry's stored fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recomputed {
    pub data_hash: String,
    pub chain_hash: String,
}

impl Recomputed {
    pub fn data_matches(&self, entry: &LedgerEntry) -> bool {
        self.data_hash == entry.data_hash
    }

    pub fn chain_matches(&self, entry: &LedgerEntry) -> bool {
        self.chain_hash == entry.chain_hash
    }
}

/// Recompute both hashes of `entry` without trusting its stored hashes.
///
/// `chain_hash` is recomputed from the stored `previous_hash` and the stored
/// `data_hash`, so a mismatch pinpoints which of the two was altered.
pub fn recompute(entry: &LedgerEntry) -> LedgerResult<Recomputed> {
    Ok(Recomputed {
        data_hash: data_hash(entry.sequence_number, &entry.timestamp, &entry.record)?,
        chain_hash: chain_hash(&entry.previous_hash, &entry.data_hash),
    })
}

/// Check that an entry's stored hashes agree with its own fields.
///
/// Returns `LedgerError::IntegrityViolation` naming the entry on mismatch.
pub fn check_sealed(entry: &LedgerEntry) -> LedgerResult<()> {
    let recomputed = recompute(entry)?;
    if !recomputed.data_matches(entry) {
        return Err(LedgerError::IntegrityViolation {
            sequence: entry.sequence_number,
            reason: format!("data hash mismatch at sequence {}", entry.sequence_number),
        });
    }
    if !recomputed.chain_matches(entry) {
        return Err(LedgerError::IntegrityViolation {
            sequence: entry.sequence_number,
            reason: format!("chain hash mismatch at sequence {}", entry.sequence_number),
        });
    }
    Ok(())
}
