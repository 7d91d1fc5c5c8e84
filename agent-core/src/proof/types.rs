use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::{Map, Value};
use rst_common::with_errors::thiserror::{self, Error};

use crate::connection::ConnectionError;
use crate::engine::EngineError;
use crate::envelope::EnvelopeError;
use crate::exchange::{ExchangeError, ExchangeMessage};
use crate::keystore::{Did, Verkey};
use crate::ledger::LedgerError;
use crate::tenant::{Tenant, TenantID};

use super::messages::{
    Presentation, PresentationProposal, PreviewAttribute, PreviewPredicate, RequestPresentation,
    PROPOSAL_MESSAGE_TYPE, REQUEST_MESSAGE_TYPE,
};
use super::proof::{Proof, ProofTemplate};
use super::request::ProofRequest;

/// ProofError is a base error types for the `proof` domain
#[derive(Debug, PartialEq, Error, Clone)]
pub enum ProofError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("invalid attributes: {0:?}")]
    InvalidAttribute(Vec<String>),

    #[error("no applicable proof request: {0}")]
    NoApplicableRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("template error: {0}")]
    TemplateError(String),

    #[error("entity error: {0}")]
    EntityError(String),

    #[error("store error: {0}")]
    StoreError(String),

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

/// ProofStage names the stored steps of the present-proof flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofStage {
    Proposal,
    Request,
}

impl ProofStage {
    pub fn message_type(&self) -> &'static str {
        match self {
            ProofStage::Proposal => PROPOSAL_MESSAGE_TYPE,
            ProofStage::Request => REQUEST_MESSAGE_TYPE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProposalOptions {
    pub their_did: Did,
    pub comment: Option<String>,
    pub attributes: Vec<PreviewAttribute>,
    pub predicates: Vec<PreviewPredicate>,
}

impl ProposalOptions {
    pub fn new(their_did: Did) -> Self {
        Self {
            their_did,
            comment: None,
            attributes: Vec::new(),
            predicates: Vec::new(),
        }
    }
}

/// RequestSource is where the content of a new proof request comes from
#[derive(Debug, Clone)]
pub enum RequestSource {
    Direct(ProofRequest),

    /// a stored template rendered with `values`
    Template {
        id: String,
        values: Map<String, Value>,
    },

    /// a received proposal, the request joins its thread
    Proposal {
        id: String,
        name: String,
        version: String,
    },
}

#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub their_did: Did,
    pub comment: Option<String>,
    pub source: RequestSource,
}

impl RequestOptions {
    pub fn new(their_did: Did, source: RequestSource) -> Self {
        Self {
            their_did,
            comment: None,
            source,
        }
    }
}

/// RepoProofBuilder is a `Proof Repository` abstraction for placeholders and templates,
/// partitioned by tenant
#[async_trait]
pub trait RepoProofBuilder: Clone + Sync + Send {
    async fn save_proof(&self, tenant: &TenantID, proof: &Proof) -> Result<(), ProofError>;
    async fn get_proof(&self, tenant: &TenantID, id: &str) -> Result<Option<Proof>, ProofError>;
    async fn list_proofs(&self, tenant: &TenantID) -> Result<Vec<Proof>, ProofError>;
    async fn remove_proof(&self, tenant: &TenantID, id: &str) -> Result<(), ProofError>;

    async fn save_template(
        &self,
        tenant: &TenantID,
        template: &ProofTemplate,
    ) -> Result<(), ProofError>;

    async fn get_template(
        &self,
        tenant: &TenantID,
        id: &str,
    ) -> Result<Option<ProofTemplate>, ProofError>;

    async fn list_templates(&self, tenant: &TenantID) -> Result<Vec<ProofTemplate>, ProofError>;
    async fn remove_template(&self, tenant: &TenantID, id: &str) -> Result<(), ProofError>;
}

/// `ProofAPI` is the prover and verifier side of the present-proof flow
///
/// As with the credential flow, `receive_*` operations return `Ok(None)` when an inbound
/// message was dropped
#[async_trait]
pub trait ProofAPI: Clone {
    async fn propose(
        &self,
        tenant: &Tenant,
        options: ProposalOptions,
    ) -> Result<ExchangeMessage, ProofError>;

    async fn receive_proposal(
        &self,
        tenant: &Tenant,
        proposal: PresentationProposal,
        sender_key: &Verkey,
        recipient_key: &Verkey,
    ) -> Result<Option<ExchangeMessage>, ProofError>;

    /// create_request sends the request and returns it together with its pending placeholder
    async fn create_request(
        &self,
        tenant: &Tenant,
        options: RequestOptions,
    ) -> Result<(ExchangeMessage, Proof), ProofError>;

    /// receive_request stores the request, or answers it right away when it matches a
    /// proposal we sent on the same thread, the returned record is the presentation then
    async fn receive_request(
        &self,
        tenant: &Tenant,
        request: RequestPresentation,
        sender_key: &Verkey,
        recipient_key: &Verkey,
    ) -> Result<Option<ExchangeMessage>, ProofError>;

    /// create_presentation answers a received request, `values` are self-attested values
    /// keyed by referent or attribute name
    async fn create_presentation(
        &self,
        tenant: &Tenant,
        request_id: &str,
        values: Map<String, Value>,
    ) -> Result<ExchangeMessage, ProofError>;

    async fn receive_presentation(
        &self,
        tenant: &Tenant,
        presentation: Presentation,
        sender_key: &Verkey,
        recipient_key: &Verkey,
    ) -> Result<Option<Proof>, ProofError>;

    /// get_proof verifies a received presentation and stores the verdict
    async fn get_proof(&self, tenant: &Tenant, id: &str) -> Result<Proof, ProofError>;
    async fn list_proofs(&self, tenant: &Tenant) -> Result<Vec<Proof>, ProofError>;
    async fn remove_proof(&self, tenant: &Tenant, id: &str) -> Result<(), ProofError>;

    async fn list(
        &self,
        tenant: &Tenant,
        stage: ProofStage,
    ) -> Result<Vec<ExchangeMessage>, ProofError>;

    async fn get(
        &self,
        tenant: &Tenant,
        stage: ProofStage,
        id: &str,
    ) -> Result<ExchangeMessage, ProofError>;

    async fn remove(&self, tenant: &Tenant, stage: ProofStage, id: &str)
        -> Result<(), ProofError>;

    async fn create_template(
        &self,
        tenant: &Tenant,
        name: String,
        template: String,
    ) -> Result<ProofTemplate, ProofError>;

    async fn get_template(&self, tenant: &Tenant, id: &str) -> Result<ProofTemplate, ProofError>;
    async fn list_templates(&self, tenant: &Tenant) -> Result<Vec<ProofTemplate>, ProofError>;
    async fn remove_template(&self, tenant: &Tenant, id: &str) -> Result<(), ProofError>;
}
