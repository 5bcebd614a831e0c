//! The ledger facade: the API the rest of an application talks to.
//!
//! `Ledger` wraps a `ChainEngine` with configuration-driven behavior: the
//! write-failure policy, trail paging limits and the retention periods
//! stamped by the typed logging helpers.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, error, info};

use auditchain_chain::{
    export::{ExportFormat, ExportPeriod},
    ChainEngine, OpenState,
};
use auditchain_contracts::{
    entry::{Actor, ComplianceLevel, LedgerEntry},
    error::{LedgerError, LedgerResult},
    query::{EntryLookup, TrailFilter, TrailPage},
    report::{ChainInfo, EntryVerification, IntegrityReport},
};
use auditchain_core::{traits::EntryStore, OperationBuilder};

use crate::config::{FailurePolicy, LedgerConfig};

/// Whether a `log` call produced a ledger entry.
#[derive(Debug, Clone, PartialEq)]
pub enum LogOutcome {
    Logged(LedgerEntry),
    /// The entry could not be persisted and the failure policy is `report`.
    Failed { reason: String },
}

impl LogOutcome {
    pub fn is_logged(&self) -> bool {
        matches!(self, Self::Logged(_))
    }

    pub fn entry(&self) -> Option<&LedgerEntry> {
        match self {
            Self::Logged(entry) => Some(entry),
            Self::Failed { .. } => None,
        }
    }
}

/// Payload of a typed logging call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Change {
    pub details: Option<Value>,
    pub old_values: Option<Value>,
    pub new_values: Option<Value>,
}

impl Change {
    pub fn details(details: Value) -> Self {
        Self {
            details: Some(details),
            ..Self::default()
        }
    }

    pub fn values(old_values: Option<Value>, new_values: Option<Value>) -> Self {
        Self {
            details: None,
            old_values,
            new_values,
        }
    }

    fn apply(self, mut builder: OperationBuilder) -> OperationBuilder {
        if let Some(details) = self.details {
            builder = builder.details(details);
        }
        if let Some(old) = self.old_values {
            builder = builder.old_values(old);
        }
        if let Some(new) = self.new_values {
            builder = builder.new_values(new);
        }
        builder
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: u64,
    /// The document's own code, e.g. `"DOC-2024-017"`. Defaults to `DOC-<id>`.
    pub code: Option<String>,
    pub signature_required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: u64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRef {
    pub id: u64,
    /// The signed document, when known.
    pub document_id: Option<u64>,
}

/// Tamper-evident audit ledger.
pub struct Ledger {
    engine: ChainEngine,
    config: LedgerConfig,
}

impl Ledger {
    /// Open the store named by `config` and bring its chain up.
    pub fn open(config: LedgerConfig) -> LedgerResult<Self> {
        config.validate()?;
        let store = config.open_store()?;
        Self::with_store(store, config)
    }

    /// Run a ledger over an explicitly supplied store.
    pub fn with_store(store: Box<dyn EntryStore>, config: LedgerConfig) -> LedgerResult<Self> {
        let engine = ChainEngine::open(store, &config.ledger.system_version)?;
        if let OpenState::Rebuilt { integrity } = engine.open_state() {
            if !integrity.is_valid {
                error!(
                    reason = %integrity.message,
                    "ledger opened over a chain that failed verification"
                );
            }
        }
        Ok(Self { engine, config })
    }

    pub fn engine(&self) -> &ChainEngine {
        &self.engine
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ── Write side ────────────────────────────────────────────────────────────

    /// Record one operation.
    ///
    /// Invalid input is always an `Err`. A persistence failure is an `Err`
    /// under `FailurePolicy::Propagate` and `LogOutcome::Failed` under
    /// `FailurePolicy::Report`.
    pub fn log(&self, builder: OperationBuilder) -> LedgerResult<LogOutcome> {
        let record = builder.build()?;
        match self.engine.append(record) {
            Ok(entry) => Ok(LogOutcome::Logged(entry)),
            Err(e @ LedgerError::InvalidEntry { .. }) => Err(e),
            Err(e) => match self.config.ledger.on_write_failure {
                FailurePolicy::Propagate => Err(e),
                FailurePolicy::Report => {
                    error!(error = %e, "audit log write failed; operation not recorded");
                    Ok(LogOutcome::Failed {
                        reason: e.to_string(),
                    })
                }
            },
        }
    }

    fn typed(
        &self,
        builder: OperationBuilder,
        level: ComplianceLevel,
        actor: Actor,
        change: Change,
    ) -> OperationBuilder {
        let days = self.config.retention.days_for(level);
        change.apply(
            builder
                .actor(actor)
                .compliance_level(level)
                .retention_days(Some(days)),
        )
    }

    /// Record an operation on a document.
    ///
    /// Documents that require a signature are classified `critical`.
    pub fn log_document(
        &self,
        document: &DocumentRef,
        operation: &str,
        actor: Actor,
        change: Change,
    ) -> LedgerResult<LogOutcome> {
        let code = document
            .code
            .clone()
            .unwrap_or_else(|| format!("DOC-{}", document.id));
        let level = if document.signature_required {
            ComplianceLevel::Critical
        } else {
            ComplianceLevel::Standard
        };
        let builder = OperationBuilder::new("document", document.id.to_string(), operation)
            .entity_code(code);
        self.log(self.typed(builder, level, actor, change))
    }

    /// Record an operation on a user account. Personal data is `critical`.
    pub fn log_user(
        &self,
        user: &UserRef,
        operation: &str,
        actor: Actor,
        change: Change,
    ) -> LedgerResult<LogOutcome> {
        let builder = OperationBuilder::new("user", user.id.to_string(), operation)
            .entity_code(user.username.clone());
        self.log(self.typed(builder, ComplianceLevel::Critical, actor, change))
    }

    /// Record an operation on an electronic signature.
    pub fn log_signature(
        &self,
        signature: &SignatureRef,
        operation: &str,
        actor: Actor,
        change: Change,
    ) -> LedgerResult<LogOutcome> {
        let code = match signature.document_id {
            Some(document_id) => format!("DOC-{}-SIGN-{}", document_id, signature.id),
            None => format!("SIGN-{}", signature.id),
        };
        let builder = OperationBuilder::new("signature", signature.id.to_string(), operation)
            .entity_code(code);
        self.log(self.typed(builder, ComplianceLevel::Critical, actor, change))
    }

    /// Record an operation on an internal audit.
    pub fn log_audit(
        &self,
        audit_id: u64,
        operation: &str,
        actor: Actor,
        change: Change,
    ) -> LedgerResult<LogOutcome> {
        let builder = OperationBuilder::new("audit", audit_id.to_string(), operation)
            .entity_code(format!("AUDIT-{}", audit_id));
        self.log(self.typed(builder, ComplianceLevel::Critical, actor, change))
    }

    // ── Read side ─────────────────────────────────────────────────────────────

    /// Matching entries, newest first, one page at a time.
    ///
    /// The page size falls back to `ledger.default_page_size` and is capped
    /// at `ledger.max_page_size`.
    pub fn query_trail(&self, filter: &TrailFilter) -> LedgerResult<TrailPage> {
        check_range(filter.start, filter.end)?;
        let limit = filter
            .limit
            .unwrap_or(self.config.ledger.default_page_size)
            .min(self.config.ledger.max_page_size);

        let snapshot = self.engine.snapshot();
        let matching: Vec<&LedgerEntry> = snapshot
            .iter()
            .rev()
            .filter(|entry| matches_filter(filter, entry))
            .collect();

        let total = matching.len();
        let entries: Vec<LedgerEntry> = matching
            .into_iter()
            .skip(filter.offset)
            .take(limit)
            .cloned()
            .collect();

        debug!(
            total,
            offset = filter.offset,
            limit,
            returned = entries.len(),
            "audit trail queried"
        );
        Ok(TrailPage {
            total,
            offset: filter.offset,
            limit,
            entries,
        })
    }

    /// Entries with `start <= timestamp <= end`, oldest first.
    pub fn entries_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        check_range(Some(start), Some(end))?;
        Ok(self
            .engine
            .snapshot()
            .into_iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .collect())
    }

    /// Full-chain integrity check against the store.
    pub fn verify_integrity(&self) -> LedgerResult<IntegrityReport> {
        let report = self.engine.verify()?;
        info!(
            is_valid = report.is_valid,
            entries_checked = report.entries_checked,
            message = %report.message,
            "ledger integrity checked"
        );
        Ok(report)
    }

    /// Export the entries timestamped within `[start, end]`.
    ///
    /// The document carries the period and the result of an integrity check
    /// of the whole chain taken for this export.
    pub fn export_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        format: ExportFormat,
    ) -> LedgerResult<Vec<u8>> {
        let entries = self.entries_between(start, end)?;
        let integrity = self.engine.verify()?;
        self.engine.export_entries(
            &entries,
            &integrity,
            Some(ExportPeriod { start, end }),
            format,
        )
    }

    pub fn export_chain(&self, format: ExportFormat) -> LedgerResult<Vec<u8>> {
        self.engine.export_chain(format)
    }

    pub fn info(&self) -> LedgerResult<ChainInfo> {
        self.engine.info()
    }

    pub fn entry_at(&self, lookup: &EntryLookup) -> Option<LedgerEntry> {
        self.engine.entry_at(lookup)
    }

    pub fn verify_entry(&self, lookup: &EntryLookup) -> LedgerResult<EntryVerification> {
        self.engine.verify_entry(lookup)
    }

    pub fn merkle_root(&self, entries: &[LedgerEntry]) -> String {
        self.engine.merkle_root(entries)
    }
}

fn check_range(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> LedgerResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(LedgerError::InvalidQuery {
            reason: format!("start {} is after end {}", start.to_rfc3339(), end.to_rfc3339()),
        }),
        _ => Ok(()),
    }
}

fn matches_filter(filter: &TrailFilter, entry: &LedgerEntry) -> bool {
    let record = &entry.record;
    filter
        .entity_type
        .as_ref()
        .is_none_or(|t| record.entity_type == *t)
        && filter.entity_id.as_ref().is_none_or(|id| record.entity_id == *id)
        && filter.actor_id.is_none_or(|id| record.actor.id == id)
        && filter.start.is_none_or(|start| entry.timestamp >= start)
        && filter.end.is_none_or(|end| entry.timestamp <= end)
}
