//! Chain export: the document handed to external auditors.
//!
//! The JSON shape is a published contract, pinned by [`EXPORT_SCHEMA`]:
//!
//! ```text
//! {
//!   "export_info": { export_id, exported_at, entry_count, format,
//!                    integrity_verified, integrity_message, merkle_root, period? },
//!   "chain": [ { sequence_number, timestamp, data, data_hash, hash, previous_hash } ]
//! }
//! ```
//!
//! `data` carries every hashed field of the entry, so a recipient can
//! recompute each `data_hash` and `hash` (the chain hash) without access to
//! the store. `verify_export` does exactly that.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use auditchain_contracts::{
    entry::{LedgerEntry, OperationRecord},
    error::{LedgerError, LedgerResult},
    report::IntegrityReport,
};

use crate::{merkle::merkle_root, verify};

/// Serialization formats supported by the exporter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            other => Err(LedgerError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

/// Inclusive timestamp range of a partial export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportInfo {
    pub export_id: Uuid,
    pub exported_at: DateTime<Utc>,
    pub entry_count: usize,
    pub format: ExportFormat,
    /// Result of the integrity check taken when the export was produced.
    pub integrity_verified: bool,
    pub integrity_message: String,
    /// Merkle root over the `hash` values of `chain`, in order.
    pub merkle_root: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<ExportPeriod>,
}

/// One entry as it appears in an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedEntry {
    pub sequence_number: u64,
    pub timestamp: DateTime<Utc>,
    pub data: OperationRecord,
    pub data_hash: String,
    /// The entry's `chain_hash`.
    pub hash: String,
    pub previous_hash: String,
}

impl From<&LedgerEntry> for ExportedEntry {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            sequence_number: entry.sequence_number,
            timestamp: entry.timestamp,
            data: entry.record.clone(),
            data_hash: entry.data_hash.clone(),
            hash: entry.chain_hash.clone(),
            previous_hash: entry.previous_hash.clone(),
        }
    }
}

impl From<ExportedEntry> for LedgerEntry {
    fn from(exported: ExportedEntry) -> Self {
        Self {
            sequence_number: exported.sequence_number,
            timestamp: exported.timestamp,
            record: exported.data,
            data_hash: exported.data_hash,
            previous_hash: exported.previous_hash,
            chain_hash: exported.hash,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub export_info: ExportInfo,
    pub chain: Vec<ExportedEntry>,
}

impl ExportDocument {
    /// Assemble a document for `entries`, stamped with `integrity`.
    pub fn new(
        entries: &[LedgerEntry],
        integrity: &IntegrityReport,
        period: Option<ExportPeriod>,
        format: ExportFormat,
    ) -> Self {
        Self {
            export_info: ExportInfo {
                export_id: Uuid::new_v4(),
                exported_at: Utc::now(),
                entry_count: entries.len(),
                format,
                integrity_verified: integrity.is_valid,
                integrity_message: integrity.message.clone(),
                merkle_root: merkle_root(entries),
                period,
            },
            chain: entries.iter().map(ExportedEntry::from).collect(),
        }
    }
}

/// Serialize `entries` in the requested format.
pub fn encode(
    entries: &[LedgerEntry],
    integrity: &IntegrityReport,
    period: Option<ExportPeriod>,
    format: ExportFormat,
) -> LedgerResult<Vec<u8>> {
    let document = ExportDocument::new(entries, integrity, period, format);
    debug!(
        export_id = %document.export_info.export_id,
        entries = entries.len(),
        format = %format,
        "encoding chain export"
    );
    match format {
        ExportFormat::Json => {
            serde_json::to_vec_pretty(&document).map_err(|e| LedgerError::Serialization {
                reason: format!("failed to encode export: {e}"),
            })
        }
    }
}

/// JSON Schema pinning the published export shape.
pub const EXPORT_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "type": "object",
  "required": ["export_info", "chain"],
  "properties": {
    "export_info": {
      "type": "object",
      "required": [
        "export_id", "exported_at", "entry_count", "format",
        "integrity_verified", "integrity_message", "merkle_root"
      ],
      "properties": {
        "export_id": { "type": "string" },
        "exported_at": { "type": "string" },
        "entry_count": { "type": "integer", "minimum": 0 },
        "format": { "const": "json" },
        "integrity_verified": { "type": "boolean" },
        "integrity_message": { "type": "string" },
        "merkle_root": { "type": "string", "pattern": "^[0-9a-f]{64}$" },
        "period": {
          "type": "object",
          "required": ["start", "end"],
          "properties": {
            "start": { "type": "string" },
            "end": { "type": "string" }
          }
        }
      }
    },
    "chain": {
      "type": "array",
      "items": {
        "type": "object",
        "required": [
          "sequence_number", "timestamp", "data", "data_hash", "hash", "previous_hash"
        ],
        "properties": {
          "sequence_number": { "type": "integer", "minimum": 0 },
          "timestamp": { "type": "string" },
          "data": {
            "type": "object",
            "required": ["entity_type", "entity_id", "operation", "actor", "compliance_level"]
          },
          "data_hash": { "type": "string", "pattern": "^[0-9a-f]{64}$" },
          "hash": { "type": "string", "pattern": "^[0-9a-f]{64}$" },
          "previous_hash": { "type": "string" }
        }
      }
    }
  }
}"#;

/// Check `document` against [`EXPORT_SCHEMA`], reporting every violation.
pub fn validate_shape(document: &Value) -> LedgerResult<()> {
    let schema: Value = serde_json::from_str(EXPORT_SCHEMA).map_err(|e| LedgerError::ExportSchema {
        reason: format!("embedded export schema is not JSON: {e}"),
    })?;
    let validator = jsonschema::validator_for(&schema).map_err(|e| LedgerError::ExportSchema {
        reason: format!("embedded export schema does not compile: {e}"),
    })?;

    let violations: Vec<String> = validator
        .iter_errors(document)
        .map(|error| format!("at '{}': {}", error.instance_path, error))
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(LedgerError::ExportSchema {
            reason: violations.join("; "),
        })
    }
}

/// Result of independently re-checking an export document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportVerification {
    /// Recomputed chain check over the exported entries.
    pub chain: IntegrityReport,
    pub entry_count_matches: bool,
    pub merkle_root_matches: bool,
    /// What the exporter claimed at export time.
    pub claimed_integrity: bool,
}

impl ExportVerification {
    pub fn is_valid(&self) -> bool {
        self.chain.is_valid && self.entry_count_matches && self.merkle_root_matches
    }
}

/// Re-verify an export produced by [`encode`].
///
/// The document must match the schema. Its entries are rehashed and their
/// links checked; an export that starts at genesis is checked as a full
/// chain, a range export as a segment. The entry count and Merkle root in
/// `export_info` must agree with `chain`.
pub fn verify_export(bytes: &[u8]) -> LedgerResult<ExportVerification> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| LedgerError::Serialization {
        reason: format!("export is not valid JSON: {e}"),
    })?;
    validate_shape(&value)?;

    let document: ExportDocument =
        serde_json::from_value(value).map_err(|e| LedgerError::Serialization {
            reason: format!("export does not decode: {e}"),
        })?;

    let claimed = document.export_info;
    let entries: Vec<LedgerEntry> = document.chain.into_iter().map(LedgerEntry::from).collect();

    let chain = match entries.first() {
        Some(first) if first.is_genesis() => verify::verify_chain(&entries),
        _ => verify::verify_segment(&entries),
    };
    let verification = ExportVerification {
        chain,
        entry_count_matches: claimed.entry_count == entries.len(),
        merkle_root_matches: claimed.merkle_root == merkle_root(&entries),
        claimed_integrity: claimed.integrity_verified,
    };

    if !verification.is_valid() {
        warn!(
            export_id = %claimed.export_id,
            chain_valid = verification.chain.is_valid,
            entry_count_matches = verification.entry_count_matches,
            merkle_root_matches = verification.merkle_root_matches,
            "export failed verification"
        );
    }
    Ok(verification)
}
