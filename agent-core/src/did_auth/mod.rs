//! # DID Auth Module
//!
//! Challenge and response proving that a peer still controls the pairwise key of an
//! established relationship.
//!
//! ```text
//! verifier                                 prover
//! request {nonce} signed by my pairwise key
//!                  ----- out of band ----> signer must be the verifier's pairwise key
//! signer and signature checked  <-------  response {nonce, did} signed by my pairwise key
//! request consumed, verdict stored
//! ```
pub mod messages;
pub mod types;
pub mod usecase;

pub use messages::{Answer, Challenge, DidAuthRequest, DidAuthResponse};
pub use types::{DidAuthAPI, DidAuthError, DidAuthStage};
pub use usecase::Usecase;
