//! # Ledger Module
//!
//! Public registry access: schemas, credential definitions, revocation registries and
//! identifier registration. Consensus and the pool protocol stay outside of this crate,
//! [`Ledger`] is the seam.
//!
//! - [`types`] - [`Schema`], [`CredentialDefinition`], [`LedgerError`] and the [`Ledger`] trait
//! - [`retry`] - [`RetryingLedger`], bounded read retry for read-after-write races
//! - [`memory`] - [`MemoryLedger`]
pub mod memory;
pub mod retry;
pub mod types;

pub use memory::{IdentifierRecord, MemoryLedger};
pub use retry::RetryingLedger;
pub use types::{CredentialDefinition, Ledger, LedgerError, Schema};
