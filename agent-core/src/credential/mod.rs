//! # Credential Module
//!
//! The `issue-credential/1.0` flow between an issuer and a holder, on top of an external
//! [`crate::engine::CredentialEngine`].
//!
//! ```text
//! holder                                   issuer
//! propose-credential (optional)  ------->  checked against schema and definition
//! offer stored, auto request     <-------  offer-credential (joins the proposal thread)
//! request-credential             ------->  offer consumed, auto issue with a value location
//! credential stored, request gone <------  issue-credential, request consumed after send
//! ```
//!
//! Every step is kept as an [`crate::exchange::ExchangeMessage`] until the next step of the
//! same thread consumes it. Issued records keep their revocation handle for [`CredentialAPI::revoke`].
pub mod encode;
pub mod messages;
pub mod types;
pub mod usecase;

pub use encode::encode;
pub use messages::{
    CredentialOffer, CredentialPreview, CredentialProposal, CredentialRequest, IssuedCredential,
    PreviewAttribute,
};
pub use types::{
    CredentialAPI, CredentialError, CredentialStage, OfferOptions, ProposalOptions, ValueSource,
};
pub use usecase::Usecase;
