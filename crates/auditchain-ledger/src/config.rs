//! Ledger configuration loaded from TOML.
//!
//! Every section and field is optional; an empty document yields an
//! in-memory ledger with the default policies.
//!
//! ```toml
//! [store]
//! path = "var/audit-ledger.jsonl"
//!
//! [ledger]
//! on_write_failure = "report"
//! default_page_size = 50
//!
//! [retention]
//! critical_days = 2555
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use auditchain_contracts::{
    entry::ComplianceLevel,
    error::{LedgerError, LedgerResult},
};
use auditchain_core::traits::EntryStore;
use auditchain_store::{InMemoryEntryStore, JsonlEntryStore};

/// What `Ledger::log` does when the entry cannot be persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Return the persistence error to the caller.
    #[default]
    Propagate,
    /// Log the failure and return `LogOutcome::Failed`.
    Report,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// JSONL file holding the chain. `None` keeps the chain in memory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerSection {
    pub on_write_failure: FailurePolicy,
    pub default_page_size: usize,
    pub max_page_size: usize,
    /// Recorded in the genesis entry of a new chain.
    pub system_version: String,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            on_write_failure: FailurePolicy::default(),
            default_page_size: 100,
            max_page_size: 1000,
            system_version: "1.0.0".to_string(),
        }
    }
}

/// Retention periods stamped by the typed logging helpers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetentionConfig {
    pub standard_days: u32,
    pub critical_days: u32,
    pub restricted_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            standard_days: 1825,
            critical_days: 2555,
            restricted_days: 3650,
        }
    }
}

impl RetentionConfig {
    pub fn days_for(&self, level: ComplianceLevel) -> u32 {
        match level {
            ComplianceLevel::Standard => self.standard_days,
            ComplianceLevel::Critical => self.critical_days,
            ComplianceLevel::Restricted => self.restricted_days,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    pub store: StoreConfig,
    pub ledger: LedgerSection,
    pub retention: RetentionConfig,
}

impl LedgerConfig {
    /// Parse `s` as TOML ledger configuration.
    ///
    /// Returns `LedgerError::ConfigError` if the TOML is malformed, has
    /// unknown keys, or sets inconsistent page sizes.
    pub fn from_toml_str(s: &str) -> LedgerResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| LedgerError::ConfigError {
            reason: format!("failed to parse ledger TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as TOML ledger configuration.
    pub fn from_file(path: &Path) -> LedgerResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LedgerError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Configuration for a JSONL store at `path`, everything else defaulted.
    pub fn with_store_path(path: impl Into<PathBuf>) -> Self {
        Self {
            store: StoreConfig {
                path: Some(path.into()),
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> LedgerResult<()> {
        let ledger = &self.ledger;
        if ledger.default_page_size == 0 {
            return Err(LedgerError::ConfigError {
                reason: "ledger.default_page_size must be at least 1".to_string(),
            });
        }
        if ledger.max_page_size < ledger.default_page_size {
            return Err(LedgerError::ConfigError {
                reason: format!(
                    "ledger.max_page_size ({}) is smaller than ledger.default_page_size ({})",
                    ledger.max_page_size, ledger.default_page_size
                ),
            });
        }
        if ledger.system_version.trim().is_empty() {
            return Err(LedgerError::ConfigError {
                reason: "ledger.system_version must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Open the store this configuration names.
    pub fn open_store(&self) -> LedgerResult<Box<dyn EntryStore>> {
        Ok(match &self.store.path {
            Some(path) => Box::new(JsonlEntryStore::open(path)?),
            None => Box::new(InMemoryEntryStore::new()),
        })
    }
}
