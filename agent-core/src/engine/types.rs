use std::collections::BTreeMap;

use derive_more::{From, Into};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::{Map, Value};
use rst_common::with_errors::thiserror::{self, Error};

use crate::ledger::CredentialDefinition;
use crate::proof::ProofRequest;
use crate::tenant::TenantID;

/// EngineError is an opaque failure reported by the credential engine
#[derive(Debug, PartialEq, Error, Clone)]
pub enum EngineError {
    #[error("engine operation error: {0}")]
    OperationError(String),

    #[error("engine not configured: {0}")]
    NotConfigured(String),

    #[error("invalid engine blob: {0}")]
    InvalidBlob(String),
}

fn text_field<'a>(blob: &'a Value, field: &str) -> Option<&'a str> {
    blob.get(field).and_then(Value::as_str)
}

/// OfferBlob is the engine's credential offer, carried untouched inside `offers~attach`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, From, Into)]
#[serde(crate = "self::serde", transparent)]
pub struct OfferBlob(Value);

impl OfferBlob {
    pub fn schema_id(&self) -> Option<&str> {
        text_field(&self.0, "schema_id")
    }

    pub fn cred_def_id(&self) -> Option<&str> {
        text_field(&self.0, "cred_def_id")
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, From, Into)]
#[serde(crate = "self::serde", transparent)]
pub struct RequestBlob(Value);

impl RequestBlob {
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, From, Into)]
#[serde(crate = "self::serde", transparent)]
pub struct CredentialBlob(Value);

impl CredentialBlob {
    pub fn cred_def_id(&self) -> Option<&str> {
        text_field(&self.0, "cred_def_id")
    }

    pub fn rev_reg_id(&self) -> Option<&str> {
        text_field(&self.0, "rev_reg_id")
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, From, Into)]
#[serde(crate = "self::serde", transparent)]
pub struct PresentationBlob(Value);

impl PresentationBlob {
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// CredentialValue is one attribute as handed to the engine, raw and encoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialValue {
    pub raw: String,
    pub encoded: String,
}

pub type CredentialValues = BTreeMap<String, CredentialValue>;

/// Issued is the issuance outcome, revocation fields are present for revocable definitions only
#[derive(Debug, Clone, PartialEq)]
pub struct Issued {
    pub credential: CredentialBlob,
    pub revocation_id: Option<String>,
    pub registry_delta: Option<Value>,
}

/// `CredentialEngine` wraps the zero-knowledge credential operations
///
/// Operations bound to a tenant's wallet take the tenant id, the engine keeps its own
/// per tenant material
#[async_trait]
pub trait CredentialEngine: Clone + Send + Sync {
    async fn create_offer(
        &self,
        tenant: &TenantID,
        definition_id: &str,
    ) -> Result<OfferBlob, EngineError>;

    /// create_request returns the request and the binding metadata that must be handed back
    /// to [`CredentialEngine::store_credential`]
    async fn create_request(
        &self,
        tenant: &TenantID,
        offer: &OfferBlob,
        definition: &CredentialDefinition,
        master_secret_id: &str,
    ) -> Result<(RequestBlob, Value), EngineError>;

    async fn issue(
        &self,
        tenant: &TenantID,
        offer: &OfferBlob,
        request: &RequestBlob,
        values: &CredentialValues,
        revocation_registry_id: Option<String>,
    ) -> Result<Issued, EngineError>;

    async fn store_credential(
        &self,
        tenant: &TenantID,
        binding: &Value,
        credential: &CredentialBlob,
        definition: &CredentialDefinition,
        revocation_definition: Option<Value>,
    ) -> Result<String, EngineError>;

    async fn create_presentation(
        &self,
        tenant: &TenantID,
        master_secret_id: &str,
        request: &ProofRequest,
        self_attested: &Map<String, Value>,
    ) -> Result<PresentationBlob, EngineError>;

    async fn verify_presentation(
        &self,
        request: &ProofRequest,
        presentation: &PresentationBlob,
    ) -> Result<bool, EngineError>;

    async fn revoke(
        &self,
        tenant: &TenantID,
        revocation_id: &str,
        registry_id: &str,
    ) -> Result<Value, EngineError>;
}
