//! # Router Module
//!
//! The `router` module connects transports, the tenant resolver and the protocol state machines.
//!
//! ## Module Structure
//!
//! - [`types`] - [`RouterError`], [`TransportError`] and the [`MessageHandler`], [`DeliveryHook`],
//!   [`Transport`], [`InboundSink`] and [`MessageSender`] seams
//! - [`router`] - the [`Router`] itself: handler registry, dispatch, transport wiring
//! - [`outbound`] - [`Outbound`], envelope building plus transport selection by endpoint scheme
//! - [`loopback`] - [`LoopbackTransport`], in-process `local://` delivery
//!
//! ## Dispatch
//!
//! ```text
//! transport -> InboundSink::deliver(bytes)
//!   └── Router::dispatch
//!         ├── TenantResolver::resolve       -> (tenant handle, decrypted message)
//!         ├── DeliveryHook (authenticated)  -> e.g. RESPONDED -> COMPLETE
//!         └── handlers[@type]::handle       -> connection / credential / proof
//! ```
pub mod loopback;
pub mod outbound;
#[allow(clippy::module_inception)]
pub mod router;
pub mod types;

pub use loopback::{LoopbackTransport, LOOPBACK_SCHEME};
pub use outbound::Outbound;
pub use router::Router;
pub use types::{
    DeliveryHook, InboundSink, MessageHandler, MessageSender, RouterError, Transport,
    TransportError,
};
