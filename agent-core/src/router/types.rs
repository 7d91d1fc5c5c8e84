use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::Value;
use rst_common::with_errors::thiserror::{self, Error};

use crate::connection::ConnectionError;
use crate::credential::CredentialError;
use crate::did_auth::DidAuthError;
use crate::envelope::{EnvelopeError, Target, Unpacked};
use crate::keystore::Verkey;
use crate::proof::ProofError;
use crate::tenant::{Tenant, TenantError};

/// RouterError is a base error types for the `router` domain
///
/// Handler failures are wrapped by their protocol variant and reported to the local caller
/// of `dispatch`, never to the remote peer
#[derive(Debug, PartialEq, Error, Clone)]
pub enum RouterError {
    #[error("tenant error: {0}")]
    TenantError(#[from] TenantError),

    #[error("envelope error: {0}")]
    EnvelopeError(#[from] EnvelopeError),

    #[error("transport error: {0}")]
    TransportError(#[from] TransportError),

    #[error("unsupported message type: {0}")]
    UnsupportedMessageType(String),

    #[error("no transport registered for scheme: {0}")]
    NoTransport(String),

    #[error("router is not available")]
    Unavailable,

    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("proof error: {0}")]
    Proof(#[from] ProofError),

    #[error("did-auth error: {0}")]
    DidAuth(#[from] DidAuthError),
}

#[derive(Debug, PartialEq, Error, Clone)]
pub enum TransportError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("send error: {0}")]
    SendError(String),

    #[error("rejected by peer: {0}")]
    Rejected(String),

    #[error("no inbound receiver registered")]
    NoReceiver,
}

/// `MessageHandler` processes every decrypted message of the types it was registered for
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, tenant: &Tenant, inbound: Unpacked) -> Result<(), RouterError>;
}

/// `DeliveryHook` runs for every authenticated inbound message, before its handler
#[async_trait]
pub trait DeliveryHook: Send + Sync {
    async fn on_authenticated_delivery(
        &self,
        tenant: &Tenant,
        their_key: &Verkey,
        my_key: &Verkey,
    ) -> Result<(), RouterError>;
}

/// `InboundSink` receives raw envelopes from a transport, one call per envelope
#[async_trait]
pub trait InboundSink: Send + Sync {
    async fn deliver(&self, payload: Vec<u8>) -> Result<(), RouterError>;
}

/// `Transport` moves raw envelopes for one endpoint scheme
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, endpoint: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// on_receive hands the transport the callback to invoke for every inbound envelope
    fn on_receive(&self, sink: Arc<dyn InboundSink>);
}

/// `MessageSender` is the outbound seam used by the protocol state machines
///
/// No retry happens here, a delivery failure is returned to the caller
#[async_trait]
pub trait MessageSender: Clone + Send + Sync {
    async fn send(
        &self,
        tenant: &Tenant,
        message: &Value,
        target: &Target,
    ) -> Result<(), RouterError>;
}
