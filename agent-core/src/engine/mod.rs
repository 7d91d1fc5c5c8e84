//! # Engine Module
//!
//! The credential engine performs the zero-knowledge credential math: offers, requests,
//! issuance, storage, presentations, verification and revocation. Its artifacts are opaque
//! JSON blobs to this crate, wrapped in newtypes so they cannot be mixed up.
//!
//! - [`types`] - blob newtypes, [`CredentialValue`], [`Issued`], [`EngineError`] and the [`CredentialEngine`] trait
//! - [`unconfigured`] - [`UnconfiguredEngine`], used until a real engine is plugged in
pub mod types;
pub mod unconfigured;

pub use types::{
    CredentialBlob, CredentialEngine, CredentialValue, CredentialValues, EngineError, Issued,
    OfferBlob, PresentationBlob, RequestBlob,
};
pub use unconfigured::UnconfiguredEngine;
