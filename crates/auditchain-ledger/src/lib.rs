//! # auditchain-ledger
//!
//! The public face of the AuditChain ledger: TOML configuration plus the
//! [`Ledger`] facade used to record operations, query the audit trail,
//! check integrity and export evidence.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auditchain_ledger::{Ledger, LedgerConfig};
//! use auditchain_core::OperationBuilder;
//!
//! let ledger = Ledger::open(LedgerConfig::from_file(Path::new("config/ledger.toml"))?)?;
//! ledger.log(OperationBuilder::new("document", "12", "create").actor(alice))?;
//!
//! let page = ledger.query_trail(&TrailFilter::new().entity_type("document"))?;
//! assert!(ledger.verify_integrity()?.is_valid);
//! ```

pub mod config;
pub mod facade;

pub use config::{FailurePolicy, LedgerConfig, RetentionConfig};
pub use facade::{Change, DocumentRef, Ledger, LogOutcome, SignatureRef, UserRef};

// ── Tests ─────────────────────────────────────────────────────────────────────
