//! # auditchain-contracts
//!
//! Shared types for the AuditChain tamper-evident audit ledger.
//!
//! Every crate in the workspace imports from here. No hashing, storage or
//! chain logic lives in this crate, only data definitions and error types.

pub mod entry;
pub mod error;
pub mod query;
pub mod report;
