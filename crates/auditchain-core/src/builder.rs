//! The entry builder: turns caller-supplied operation metadata into an
//! `OperationRecord` ready for sealing.
//!
//! Building is pure. It validates required fields and normalizes optional
//! payloads, but never assigns sequence numbers, timestamps or hashes; that
//! is the chain engine's job.

use serde_json::Value;

use auditchain_contracts::{
    entry::{Actor, ComplianceLevel, OperationRecord, RequestContext},
    error::{LedgerError, LedgerResult},
};

/// Fluent constructor for an `OperationRecord`.
///
/// ```rust,ignore
/// let record = OperationBuilder::new("document", "12", "publish")
///     .entity_code("DOC-12")
///     .actor(Actor::new(7, "Ana Souza", "quality_manager"))
///     .new_values(json!({ "status": "published" }))
///     .compliance_level(ComplianceLevel::Critical)
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct OperationBuilder {
    record: OperationRecord,
}

impl OperationBuilder {
    /// Start a record for `operation` on the given business object.
    ///
    /// The actor defaults to `Actor::system()` and the compliance level to
    /// `standard`.
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            record: OperationRecord {
                entity_type: entity_type.into(),
                entity_id: entity_id.into(),
                entity_code: None,
                operation: operation.into(),
                operation_details: None,
                old_values: None,
                new_values: None,
                actor: Actor::system(),
                context: RequestContext::default(),
                compliance_level: ComplianceLevel::default(),
                retention_period_days: None,
            },
        }
    }

    pub fn entity_code(mut self, code: impl Into<String>) -> Self {
        self.record.entity_code = Some(code.into());
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.record.operation_details = Some(details);
        self
    }

    pub fn old_values(mut self, values: Value) -> Self {
        self.record.old_values = Some(values);
        self
    }

    pub fn new_values(mut self, values: Value) -> Self {
        self.record.new_values = Some(values);
        self
    }

    /// Attribute the operation to `actor`. Without a call, the system actor.
    pub fn actor(mut self, actor: Actor) -> Self {
        self.record.actor = actor;
        self
    }

    pub fn context(mut self, context: RequestContext) -> Self {
        self.record.context = context;
        self
    }

    pub fn compliance_level(mut self, level: ComplianceLevel) -> Self {
        self.record.compliance_level = level;
        self
    }

    pub fn retention_days(mut self, days: Option<u32>) -> Self {
        self.record.retention_period_days = days;
        self
    }

    /// Validate and return the finished record.
    pub fn build(self) -> LedgerResult<OperationRecord> {
        let mut record = self.record;
        normalize(&mut record);
        validate(&record)?;
        Ok(record)
    }
}

/// Reject a record whose required fields are empty.
///
/// Called by the builder and again by the chain engine before sealing, so a
/// hand-assembled record cannot bypass the check.
pub fn validate(record: &OperationRecord) -> LedgerResult<()> {
    require("entity_type", &record.entity_type)?;
    require("entity_id", &record.entity_id)?;
    require("operation", &record.operation)?;
    require("actor name", &record.actor.name)?;
    Ok(())
}

fn require(field: &str, value: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::InvalidEntry {
            reason: format!("{field} must not be empty"),
        });
    }
    Ok(())
}

/// Collapse explicit JSON `null` payloads to `None`.
///
/// Stored entries cannot tell the two apart once decoded, so the record is
/// held in the form it will be read back in.
pub fn normalize(record: &mut OperationRecord) {
    for slot in [
        &mut record.operation_details,
        &mut record.old_values,
        &mut record.new_values,
    ] {
        if matches!(slot, Some(Value::Null)) {
            *slot = None;
        }
    }
}
