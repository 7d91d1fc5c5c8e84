use rst_common::standard::chrono::serde::ts_seconds;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;
use rst_common::standard::uuid::Uuid;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::engine::PresentationBlob;
use crate::keystore::Did;

use super::request::ProofRequest;
use super::types::ProofError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(crate = "self::serde", rename_all = "lowercase")]
pub enum ProofStatus {
    Pending,
    Received,
}

/// Proof is the verifier's placeholder for an expected presentation
///
/// It exists from the moment the request is sent, so its status can be polled. Deleting it
/// means the verifier lost interest, a presentation arriving afterwards is discarded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Proof {
    pub(crate) id: String,

    #[serde(rename = "theirDid")]
    pub(crate) their_did: Option<Did>,

    pub(crate) status: ProofStatus,
    pub(crate) request: ProofRequest,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) presentation: Option<PresentationBlob>,

    #[serde(rename = "isValid", default, skip_serializing_if = "Option::is_none")]
    pub(crate) is_valid: Option<bool>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "createdAt")]
    pub(crate) created_at: DateTime<Utc>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "updatedAt")]
    pub(crate) updated_at: DateTime<Utc>,
}

impl Proof {
    pub fn new(their_did: Option<Did>, request: ProofRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            their_did,
            status: ProofStatus::Pending,
            request,
            presentation: None,
            is_valid: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn receive(&mut self, presentation: PresentationBlob) {
        self.status = ProofStatus::Received;
        self.presentation = Some(presentation);
        self.is_valid = None;
        self.updated_at = Utc::now();
    }

    pub fn set_verdict(&mut self, is_valid: bool) {
        self.is_valid = Some(is_valid);
        self.updated_at = Utc::now();
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_their_did(&self) -> Option<&Did> {
        self.their_did.as_ref()
    }

    pub fn get_status(&self) -> ProofStatus {
        self.status
    }

    pub fn get_request(&self) -> &ProofRequest {
        &self.request
    }

    pub fn get_presentation(&self) -> Option<&PresentationBlob> {
        self.presentation.as_ref()
    }

    pub fn is_valid(&self) -> Option<bool> {
        self.is_valid
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn get_updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl ToJSON for Proof {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|e| BaseError::ToJSONError(e.to_string()))
    }
}

impl TryInto<Vec<u8>> for Proof {
    type Error = ProofError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|e| ProofError::EntityError(e.to_string()))
    }
}

impl TryFrom<Vec<u8>> for Proof {
    type Error = ProofError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&bytes).map_err(|e| ProofError::EntityError(e.to_string()))
    }
}

/// ProofTemplate is a stored proof request with `{{name}}` placeholders
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ProofTemplate {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) template: String,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "createdAt")]
    pub(crate) created_at: DateTime<Utc>,
}

impl ProofTemplate {
    pub fn new(name: String, template: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            template,
            created_at: Utc::now(),
        }
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_template(&self) -> &str {
        &self.template
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl TryInto<Vec<u8>> for ProofTemplate {
    type Error = ProofError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|e| ProofError::EntityError(e.to_string()))
    }
}

impl TryFrom<Vec<u8>> for ProofTemplate {
    type Error = ProofError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&bytes).map_err(|e| ProofError::EntityError(e.to_string()))
    }
}
