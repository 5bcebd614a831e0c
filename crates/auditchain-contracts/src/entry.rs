//! Ledger entry types.
//!
//! An `OperationRecord` is what a caller describes: who did what to which
//! business object. A `LedgerEntry` is that record once the chain engine has
//! sealed it with a sequence number, a capture timestamp and its hashes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LedgerError;

/// Snapshot of the user responsible for an operation.
///
/// Copied into the entry at write time so the record survives the user being
/// renamed, re-roled or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: u64,
    pub name: String,
    /// Role held at the time of the action.
    pub role: String,
}

impl Actor {
    /// Id reserved for operations performed without an authenticated user.
    pub const SYSTEM_ID: u64 = 0;

    pub fn new(id: u64, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            role: role.into(),
        }
    }

    /// The sentinel actor attributed to unauthenticated or background work.
    pub fn system() -> Self {
        Self::new(Self::SYSTEM_ID, "System", "system")
    }

    pub fn is_system(&self) -> bool {
        self.id == Self::SYSTEM_ID
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::system()
    }
}

/// Where an operation came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Remote address of the originating request.
    pub origin: Option<String>,
    /// Client identifier, typically the User-Agent header.
    pub client: Option<String>,
    pub session: Option<String>,
}

/// Compliance classification chosen by the caller.
///
/// Drives retention policy outside this crate; it is hashed like every other
/// field but never changes how hashing works.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceLevel {
    #[default]
    Standard,
    Critical,
    Restricted,
}

impl ComplianceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Critical => "critical",
            Self::Restricted => "restricted",
        }
    }
}

impl fmt::Display for ComplianceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplianceLevel {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "critical" => Ok(Self::Critical),
            "restricted" => Ok(Self::Restricted),
            other => Err(LedgerError::InvalidEntry {
                reason: format!("unknown compliance level '{other}'"),
            }),
        }
    }
}

/// The caller-described content of one audited operation.
///
/// This is everything the ledger records about the operation itself. It is
/// produced by the entry builder and becomes immutable once sealed into a
/// `LedgerEntry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Kind of business object, e.g. `"document"`, `"user"`, `"signature"`.
    pub entity_type: String,
    pub entity_id: String,
    /// Human-facing code of the object, e.g. `"DOC-12"`.
    pub entity_code: Option<String>,
    /// Short verb: `create`, `update`, `sign`, `revoke`, ...
    pub operation: String,
    pub operation_details: Option<Value>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
    pub actor: Actor,
    pub context: RequestContext,
    pub compliance_level: ComplianceLevel,
    /// Mandatory retention in days. Enforcement is an external policy.
    pub retention_period_days: Option<u32>,
}

/// A single sealed entry of the audit chain.
///
/// `data_hash` commits to the sequence number, timestamp and record;
/// `chain_hash` commits to `previous_hash` and `data_hash`. Changing any
/// field after sealing is detected by chain verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Position in the chain. The genesis entry is 0.
    pub sequence_number: u64,

    /// Capture time (UTC, microsecond precision).
    pub timestamp: DateTime<Utc>,

    #[serde(flatten)]
    pub record: OperationRecord,

    /// SHA-256 (hex) of the canonical encoding of everything above.
    pub data_hash: String,

    /// `chain_hash` of the preceding entry, or `GENESIS_PREVIOUS_HASH`.
    pub previous_hash: String,

    /// SHA-256 (hex) of `previous_hash ‖ data_hash`.
    pub chain_hash: String,
}

impl LedgerEntry {
    /// The sequence number of the genesis entry.
    pub const GENESIS_SEQUENCE: u64 = 0;

    /// The `previous_hash` sentinel carried by the genesis entry.
    pub const GENESIS_PREVIOUS_HASH: &'static str = "0";

    /// Entity type used for the genesis entry.
    pub const SYSTEM_ENTITY: &'static str = "system";

    pub fn is_genesis(&self) -> bool {
        self.sequence_number == Self::GENESIS_SEQUENCE
    }
}
