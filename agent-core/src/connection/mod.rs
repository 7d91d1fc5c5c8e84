//! # Connection Module
//!
//! The invitation / request / response handshake producing an authenticated pairwise relationship.
//!
//! ## Module Structure
//!
//! - [`types`] - [`State`], [`Direction`], [`ConnectionError`], the repository and API traits
//! - [`connection`] - the [`Connection`] entity
//! - [`messages`] - wire messages of the `didexchange/1.0` family
//! - [`diddoc`] - `did:peer` documents, building and service extraction
//! - [`usecase`] - [`Usecase`], the state machine, also registered as message handler and delivery hook
//! - [`memory`] - [`MemoryConnections`]
//!
//! ## States
//!
//! ```text
//! inviter                                   requester
//! INVITED/OUT   <--- invitation (out of band) --->   INVITED/IN
//! REQUESTED/IN  <----------- request ------------   REQUESTED/OUT
//! RESPONDED/OUT ----------- response ----------->   COMPLETE/IN
//! COMPLETE/IN   <---- any authcrypted message ---
//! ```
//!
//! A response is signed with the invitation key, the requester only accepts it when the signer is
//! the key it was invited with. Invalid or unexpected responses are dropped without an error.
#[allow(clippy::module_inception)]
pub mod connection;
pub mod diddoc;
pub mod memory;
pub mod messages;
pub mod types;
pub mod usecase;

pub use connection::Connection;
pub use diddoc::{DidDoc, RoutingContext};
pub use memory::MemoryConnections;
pub use messages::{ConnectionRequest, ConnectionResponse, Invitation};
pub use types::{
    ConnectionAPI, ConnectionError, ConnectionMeta, ConnectionQuery, Direction, Initiator,
    InvitationOptions, RepoConnectionBuilder, State,
};
pub use usecase::Usecase;
