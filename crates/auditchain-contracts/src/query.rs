//! Read-side request types: trail filters, pages, and entry lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::LedgerEntry;

/// How to find a single entry in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryLookup {
    /// The entry at this sequence number.
    Sequence(u64),

    /// The most recent entry for a business object, optionally narrowed to
    /// one operation.
    Entity {
        entity_type: String,
        entity_id: String,
        operation: Option<String>,
    },
}

impl EntryLookup {
    pub fn entity(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::Entity {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            operation: None,
        }
    }

    pub fn entity_operation(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Entity {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            operation: Some(operation.into()),
        }
    }
}

/// Filters for an audit trail query. Unset fields match everything.
///
/// `start` and `end` are inclusive bounds on the entry timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub actor_id: Option<u64>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Number of matching entries to skip (newest first).
    #[serde(default)]
    pub offset: usize,
    /// Page size. `None` uses the configured default.
    pub limit: Option<usize>,
}

impl TrailFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn actor_id(mut self, actor_id: u64) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

/// One page of an audit trail, newest entry first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailPage {
    /// Number of entries matching the filter across all pages.
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub entries: Vec<LedgerEntry>,
}
