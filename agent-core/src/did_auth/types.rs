use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::Value;
use rst_common::with_errors::thiserror::{self, Error};

use crate::connection::ConnectionError;
use crate::envelope::EnvelopeError;
use crate::exchange::{ExchangeError, ExchangeMessage};
use crate::keystore::{Did, Verkey};
use crate::tenant::Tenant;

use super::messages::{
    DidAuthRequest, DidAuthResponse, REQUEST_MESSAGE_TYPE, RESPONSE_MESSAGE_TYPE,
};

/// DidAuthError is a base error types for the `did_auth` domain
#[derive(Debug, PartialEq, Error, Clone)]
pub enum DidAuthError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("signature error: {0}")]
    SignatureError(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("send error: {0}")]
    SendError(String),

    #[error("exchange error: {0}")]
    ExchangeError(#[from] ExchangeError),

    #[error("connection error: {0}")]
    ConnectionError(#[from] ConnectionError),

    #[error("envelope error: {0}")]
    EnvelopeError(#[from] EnvelopeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DidAuthStage {
    Request,
    Response,
}

impl DidAuthStage {
    pub fn message_type(&self) -> &'static str {
        match self {
            DidAuthStage::Request => REQUEST_MESSAGE_TYPE,
            DidAuthStage::Response => RESPONSE_MESSAGE_TYPE,
        }
    }
}

/// `DidAuthAPI` proves control of a pairwise identifier with a signed nonce
///
/// The verifier creates a request and hands it to the peer out of band. The peer answers over
/// the established relationship, the verifier keeps the verdict on the stored response.
#[async_trait]
pub trait DidAuthAPI: Clone {
    /// create_request signs a fresh challenge with the key of the relationship with `their_did`
    async fn create_request(
        &self,
        tenant: &Tenant,
        their_did: &Did,
        meta: Option<Value>,
    ) -> Result<ExchangeMessage, DidAuthError>;

    /// create_response answers a request whose challenge was signed by the peer's pairwise key
    async fn create_response(
        &self,
        tenant: &Tenant,
        request: DidAuthRequest,
    ) -> Result<ExchangeMessage, DidAuthError>;

    /// receive_response returns `Ok(None)` when the response was dropped: unknown relationship,
    /// foreign signer, invalid signature or no pending request
    async fn receive_response(
        &self,
        tenant: &Tenant,
        response: DidAuthResponse,
        sender_key: &Verkey,
        recipient_key: &Verkey,
    ) -> Result<Option<ExchangeMessage>, DidAuthError>;

    async fn list(
        &self,
        tenant: &Tenant,
        stage: DidAuthStage,
    ) -> Result<Vec<ExchangeMessage>, DidAuthError>;

    async fn get(
        &self,
        tenant: &Tenant,
        stage: DidAuthStage,
        id: &str,
    ) -> Result<ExchangeMessage, DidAuthError>;

    async fn remove(
        &self,
        tenant: &Tenant,
        stage: DidAuthStage,
        id: &str,
    ) -> Result<(), DidAuthError>;
}
