use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::{Map, Value};
use rst_common::with_errors::thiserror::{self, Error};

use crate::connection::ConnectionError;
use crate::engine::EngineError;
use crate::envelope::EnvelopeError;
use crate::exchange::{ExchangeError, ExchangeMessage};
use crate::keystore::{Did, Verkey};
use crate::ledger::LedgerError;
use crate::tenant::Tenant;

use super::messages::{
    CredentialOffer, CredentialProposal, CredentialRequest, IssuedCredential, PreviewAttribute,
    CREDENTIAL_MESSAGE_TYPE, OFFER_MESSAGE_TYPE, PROPOSAL_MESSAGE_TYPE, REQUEST_MESSAGE_TYPE,
};

/// CredentialError is a base error types for the `credential` domain
#[derive(Debug, PartialEq, Error, Clone)]
pub enum CredentialError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("no applicable credential offer: {0}")]
    NoApplicableOffer(String),

    #[error("no applicable credential request: {0}")]
    NoApplicableRequest(String),

    #[error("invalid attributes: {0:?}")]
    InvalidAttribute(Vec<String>),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("value source error: {0}")]
    ValueSourceError(String),

    #[error("send error: {0}")]
    SendError(String),

    #[error("engine error: {0}")]
    EngineError(#[from] EngineError),

    #[error("ledger error: {0}")]
    LedgerError(#[from] LedgerError),

    #[error("exchange error: {0}")]
    ExchangeError(#[from] ExchangeError),

    #[error("connection error: {0}")]
    ConnectionError(#[from] ConnectionError),

    #[error("envelope error: {0}")]
    EnvelopeError(#[from] EnvelopeError),
}

/// CredentialStage names the stored steps of the issue flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStage {
    Proposal,
    Offer,
    Request,
    Issued,
}

impl CredentialStage {
    pub fn message_type(&self) -> &'static str {
        match self {
            CredentialStage::Proposal => PROPOSAL_MESSAGE_TYPE,
            CredentialStage::Offer => OFFER_MESSAGE_TYPE,
            CredentialStage::Request => REQUEST_MESSAGE_TYPE,
            CredentialStage::Issued => CREDENTIAL_MESSAGE_TYPE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProposalOptions {
    pub their_did: Did,
    pub comment: Option<String>,
    pub attributes: Vec<PreviewAttribute>,
    pub schema_id: Option<String>,
    pub definition_id: Option<String>,
}

impl ProposalOptions {
    pub fn new(their_did: Did) -> Self {
        Self {
            their_did,
            comment: None,
            attributes: Vec::new(),
            schema_id: None,
            definition_id: None,
        }
    }
}

/// OfferOptions describes an offer, either fresh or answering a received proposal
///
/// When `proposal_id` is set the offer joins the proposal's thread, and a missing definition
/// id or preview is taken from the proposal
#[derive(Debug, Clone)]
pub struct OfferOptions {
    pub their_did: Did,
    pub definition_id: Option<String>,
    pub comment: Option<String>,
    pub attributes: Option<Vec<PreviewAttribute>>,
    pub credential_location: Option<String>,
    pub proposal_id: Option<String>,
}

impl OfferOptions {
    pub fn new(their_did: Did) -> Self {
        Self {
            their_did,
            definition_id: None,
            comment: None,
            attributes: None,
            credential_location: None,
            proposal_id: None,
        }
    }
}

/// `ValueSource` pulls credential values from the location named by an offer
#[async_trait]
pub trait ValueSource: Clone + Send + Sync {
    async fn fetch(&self, location: &str) -> Result<Map<String, Value>, CredentialError>;
}

/// `CredentialAPI` is the issuer and holder side of the issue-credential flow
///
/// `receive_*` operations are driven by inbound messages, they return `Ok(None)` when the
/// message was dropped because nothing correlates with it
#[async_trait]
pub trait CredentialAPI: Clone {
    async fn propose(
        &self,
        tenant: &Tenant,
        options: ProposalOptions,
    ) -> Result<ExchangeMessage, CredentialError>;

    async fn receive_proposal(
        &self,
        tenant: &Tenant,
        proposal: CredentialProposal,
        sender_key: &Verkey,
        recipient_key: &Verkey,
    ) -> Result<Option<ExchangeMessage>, CredentialError>;

    async fn create_offer(
        &self,
        tenant: &Tenant,
        options: OfferOptions,
    ) -> Result<ExchangeMessage, CredentialError>;

    async fn receive_offer(
        &self,
        tenant: &Tenant,
        offer: CredentialOffer,
        sender_key: &Verkey,
        recipient_key: &Verkey,
    ) -> Result<Option<ExchangeMessage>, CredentialError>;

    async fn create_request(
        &self,
        tenant: &Tenant,
        offer_id: &str,
        comment: Option<String>,
    ) -> Result<ExchangeMessage, CredentialError>;

    async fn receive_request(
        &self,
        tenant: &Tenant,
        request: CredentialRequest,
        sender_key: &Verkey,
        recipient_key: &Verkey,
    ) -> Result<Option<ExchangeMessage>, CredentialError>;

    async fn issue(
        &self,
        tenant: &Tenant,
        request_id: &str,
        values: Map<String, Value>,
    ) -> Result<ExchangeMessage, CredentialError>;

    /// receive_credential stores the credential through the engine and returns its id
    async fn receive_credential(
        &self,
        tenant: &Tenant,
        credential: IssuedCredential,
        sender_key: &Verkey,
        recipient_key: &Verkey,
    ) -> Result<Option<String>, CredentialError>;

    /// revoke returns the registry delta produced by the revocation
    async fn revoke(&self, tenant: &Tenant, issued_id: &str) -> Result<Value, CredentialError>;

    async fn list(
        &self,
        tenant: &Tenant,
        stage: CredentialStage,
    ) -> Result<Vec<ExchangeMessage>, CredentialError>;

    async fn get(
        &self,
        tenant: &Tenant,
        stage: CredentialStage,
        id: &str,
    ) -> Result<ExchangeMessage, CredentialError>;

    async fn remove(
        &self,
        tenant: &Tenant,
        stage: CredentialStage,
        id: &str,
    ) -> Result<(), CredentialError>;
}
