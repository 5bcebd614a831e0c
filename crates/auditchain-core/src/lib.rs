//! # auditchain-core
//!
//! The building blocks every other AuditChain crate relies on:
//!
//! - `EntryStore`: the append-only persistence boundary (no update, no delete)
//! - `OperationBuilder`: validates caller input into an `OperationRecord`
//! - `hash`: canonical encoding plus `data_hash` / `chain_hash` computation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auditchain_core::{builder::OperationBuilder, hash};
//!
//! let record = OperationBuilder::new("document", "1", "create").build()?;
//! let entry = hash::seal(record, 1, hash::capture_time(), genesis.chain_hash.clone())?;
//! hash::check_sealed(&entry)?;
//! ```

pub mod builder;
pub mod hash;
pub mod traits;

pub use builder::OperationBuilder;
pub use traits::EntryStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
