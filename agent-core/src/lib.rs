//! `prople-agent-core` is the protocol layer of a multi-tenant identity agent.
//!
//! Many tenants (independent identity wallets) share one network endpoint. Inbound envelopes
//! are opened layer by layer, resolved to the tenant able to decrypt them and dispatched by
//! message type to one of three correlated state machines:
//!
//! - `connection`, the invitation / request / response handshake producing a pairwise relationship
//! - `credential`, propose / offer / request / issue on top of an external credential engine
//! - `proof`, propose / request / present with eagerly created proof placeholders
//!
//! `did_auth` runs a signed nonce challenge over an established relationship.
//!
//! The leaves are `keystore` (key material and the raw primitives), `envelope` (single hop
//! encryption, forward wrapping, signed fields, attachments) and `tenant` (tenant contexts,
//! routing table, resolution). The `router` ties them together, it owns the handler and transport
//! registries and performs dispatch and outbound delivery.
//!
//! `ledger` and `engine` are the seams to the outside world, `exchange` keeps the in-flight
//! protocol steps correlated by thread id.
pub mod connection;
pub mod credential;
pub mod did_auth;
pub mod engine;
pub mod envelope;
pub mod exchange;
pub mod keystore;
pub mod ledger;
pub mod proof;
pub mod router;
pub mod tenant;
