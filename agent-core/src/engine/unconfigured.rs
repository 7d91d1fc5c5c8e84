use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::{Map, Value};

use crate::ledger::CredentialDefinition;
use crate::proof::ProofRequest;
use crate::tenant::TenantID;

use super::types::{
    CredentialBlob, CredentialEngine, CredentialValues, EngineError, Issued, OfferBlob,
    PresentationBlob, RequestBlob,
};

const MESSAGE: &str = "no credential engine configured";

/// UnconfiguredEngine fails every operation. Connections work without an engine, credential
/// and proof operations report [`EngineError::NotConfigured`]
#[derive(Clone, Default)]
pub struct UnconfiguredEngine;

fn not_configured<T>(operation: &str) -> Result<T, EngineError> {
    Err(EngineError::NotConfigured(format!("{}: {}", MESSAGE, operation)))
}

#[async_trait]
impl CredentialEngine for UnconfiguredEngine {
    async fn create_offer(&self, _: &TenantID, _: &str) -> Result<OfferBlob, EngineError> {
        not_configured("create_offer")
    }

    async fn create_request(
        &self,
        _: &TenantID,
        _: &OfferBlob,
        _: &CredentialDefinition,
        _: &str,
    ) -> Result<(RequestBlob, Value), EngineError> {
        not_configured("create_request")
    }

    async fn issue(
        &self,
        _: &TenantID,
        _: &OfferBlob,
        _: &RequestBlob,
        _: &CredentialValues,
        _: Option<String>,
    ) -> Result<Issued, EngineError> {
        not_configured("issue")
    }

    async fn store_credential(
        &self,
        _: &TenantID,
        _: &Value,
        _: &CredentialBlob,
        _: &CredentialDefinition,
        _: Option<Value>,
    ) -> Result<String, EngineError> {
        not_configured("store_credential")
    }

    async fn create_presentation(
        &self,
        _: &TenantID,
        _: &str,
        _: &ProofRequest,
        _: &Map<String, Value>,
    ) -> Result<PresentationBlob, EngineError> {
        not_configured("create_presentation")
    }

    async fn verify_presentation(
        &self,
        _: &ProofRequest,
        _: &PresentationBlob,
    ) -> Result<bool, EngineError> {
        not_configured("verify_presentation")
    }

    async fn revoke(&self, _: &TenantID, _: &str, _: &str) -> Result<Value, EngineError> {
        not_configured("revoke")
    }
}
