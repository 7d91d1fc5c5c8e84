//! # Proof Module
//!
//! The `present-proof/1.0` flow between a prover and a verifier.
//!
//! A verifier's request always creates a pending [`Proof`] placeholder first, which turns
//! `received` once the presentation arrives. The prover answers on its own when the request
//! follows a proposal it sent on the same thread and has exactly the proposed shape.
//!
//! Requests are written directly, rendered from a stored [`ProofTemplate`] or derived from a
//! received proposal.
pub mod memory;
pub mod messages;
pub mod proof;
pub mod request;
pub mod template;
pub mod types;
pub mod usecase;

pub use memory::MemoryProofs;
pub use messages::{
    Presentation, PresentationPreview, PresentationProposal, PreviewAttribute, PreviewPredicate,
    RequestPresentation,
};
pub use proof::{Proof, ProofStatus, ProofTemplate};
pub use request::{ProofRequest, RequestedAttribute, RequestedPredicate, Restriction};
pub use types::{
    ProofAPI, ProofError, ProofStage, ProposalOptions, RepoProofBuilder, RequestOptions,
    RequestSource,
};
pub use usecase::Usecase;
