//! # Keystore Module
//!
//! The `keystore` module is the boundary to a tenant's secure key material. It exposes the
//! [`SecureStore`] abstraction (key generation, local key lookup, signing, the raw anonymous and
//! authenticated encryption primitives, and pairwise persistence) plus a default in-memory
//! implementation backed by Ed25519 keys.
//!
//! ## Module Structure
//!
//! - [`types`] - identifiers ([`Verkey`], [`Did`]), [`Pairwise`] records, [`KeyError`] and the [`SecureStore`] trait
//! - [`sealed`] - stateless sealing primitives shared by every store implementation
//! - [`memory`] - [`MemoryStore`], an in-process store used by the daemon and by tests
//!
//! ## Primitive layout
//!
//! ```text
//! anoncrypt: epk(32) | nonce(12) | ciphertext+tag
//! authcrypt: anoncrypt(sender verkey)(92) | nonce(12) | ciphertext+tag
//! ```
//!
//! Encryption keys are the X25519 forms of the Ed25519 signing keys, so a single verkey
//! is enough to address, encrypt for, and verify a party.
pub mod memory;
pub mod sealed;
pub mod types;

pub use memory::MemoryStore;
pub use types::{Did, KeyError, Pairwise, SecureStore, Verkey};
