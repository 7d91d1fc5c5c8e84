use rst_common::standard::async_trait::async_trait;
use rst_common::standard::chrono::serde::ts_seconds;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::{self, Value};
use rst_common::with_errors::thiserror::{self, Error};

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::engine::{OfferBlob, RequestBlob};
use crate::keystore::Did;
use crate::proof::ProofRequest;
use crate::tenant::TenantID;

/// ExchangeError is a base error types for the `exchange` domain
#[derive(Debug, PartialEq, Error, Clone)]
pub enum ExchangeError {
    #[error("entity error: {0}")]
    EntityError(String),

    #[error("store error: {0}")]
    StoreError(String),
}

/// OfferMeta is kept by the issuer for every offer it sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "camelCase")]
pub struct OfferMeta {
    pub offer: OfferBlob,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_location: Option<String>,
}

/// RequestSentMeta is kept by the holder, `binding` is echoed to the engine at storage time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "camelCase")]
pub struct RequestSentMeta {
    pub offer: OfferBlob,
    pub request: RequestBlob,
    pub binding: Value,
}

/// RequestReceivedMeta is kept by the issuer until the credential is issued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "camelCase")]
pub struct RequestReceivedMeta {
    pub offer: OfferBlob,
    pub request: RequestBlob,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_location: Option<String>,
}

/// IssuedMeta is kept by the issuer, revocation fields are only set for revocable definitions
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "camelCase")]
pub struct IssuedMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_registry_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_delta: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "camelCase")]
pub struct ProofRequestMeta {
    pub request: ProofRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_id: Option<String>,
}

/// DidAuthMeta follows a did-auth request into its response, the verdict and the verified
/// content are set once the response arrived
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "camelCase")]
pub struct DidAuthMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_valid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

/// ExchangeMeta is the stage specific metadata of a stored step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    crate = "self::serde",
    tag = "stage",
    content = "data",
    rename_all = "snake_case"
)]
pub enum ExchangeMeta {
    Proposal,
    Offer(OfferMeta),
    RequestSent(RequestSentMeta),
    RequestReceived(RequestReceivedMeta),
    Issued(IssuedMeta),
    ProofRequest(ProofRequestMeta),
    Presentation,
    DidAuth(DidAuthMeta),
}

/// ExchangeMessage is one in-flight protocol step, stored per tenant
///
/// Most of them are consumed once the next step of the same thread arrives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ExchangeMessage {
    pub(crate) id: String,

    #[serde(rename = "type")]
    pub(crate) message_type: String,

    #[serde(rename = "threadId")]
    pub(crate) thread_id: String,

    #[serde(rename = "senderDid")]
    pub(crate) sender_did: Option<Did>,

    #[serde(rename = "recipientDid")]
    pub(crate) recipient_did: Option<Did>,

    pub(crate) payload: Value,
    pub(crate) meta: ExchangeMeta,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "createdAt")]
    pub(crate) created_at: DateTime<Utc>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "updatedAt")]
    pub(crate) updated_at: DateTime<Utc>,
}

impl ExchangeMessage {
    pub fn new(
        id: String,
        message_type: &str,
        thread_id: String,
        payload: Value,
        meta: ExchangeMeta,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            message_type: message_type.to_string(),
            thread_id,
            sender_did: None,
            recipient_did: None,
            payload,
            meta,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_parties(mut self, sender_did: Option<Did>, recipient_did: Option<Did>) -> Self {
        self.sender_did = sender_did;
        self.recipient_did = recipient_did;
        self
    }

    pub fn update_meta(&mut self, meta: ExchangeMeta) {
        self.meta = meta;
        self.updated_at = Utc::now();
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_message_type(&self) -> &str {
        &self.message_type
    }

    pub fn get_thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn get_sender_did(&self) -> Option<&Did> {
        self.sender_did.as_ref()
    }

    pub fn get_recipient_did(&self) -> Option<&Did> {
        self.recipient_did.as_ref()
    }

    pub fn get_payload(&self) -> &Value {
        &self.payload
    }

    pub fn get_meta(&self) -> &ExchangeMeta {
        &self.meta
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn get_updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// involves reports whether `did` took part in this step on either side
    pub fn involves(&self, did: &Did) -> bool {
        self.sender_did.as_ref() == Some(did) || self.recipient_did.as_ref() == Some(did)
    }
}

impl ToJSON for ExchangeMessage {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|e| BaseError::ToJSONError(e.to_string()))
    }
}

impl TryInto<Vec<u8>> for ExchangeMessage {
    type Error = ExchangeError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|e| ExchangeError::EntityError(e.to_string()))
    }
}

impl TryFrom<Vec<u8>> for ExchangeMessage {
    type Error = ExchangeError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&bytes).map_err(|e| ExchangeError::EntityError(e.to_string()))
    }
}

/// RepoExchangeBuilder is an `Exchange Message Repository` abstraction, every record is
/// partitioned by its owning tenant
#[async_trait]
pub trait RepoExchangeBuilder: Clone + Sync + Send {
    async fn save(&self, tenant: &TenantID, message: &ExchangeMessage)
        -> Result<(), ExchangeError>;

    async fn get(
        &self,
        tenant: &TenantID,
        id: &str,
    ) -> Result<Option<ExchangeMessage>, ExchangeError>;

    async fn find_by_thread(
        &self,
        tenant: &TenantID,
        message_type: &str,
        thread_id: &str,
    ) -> Result<Option<ExchangeMessage>, ExchangeError>;

    async fn list(
        &self,
        tenant: &TenantID,
        message_type: Option<&str>,
    ) -> Result<Vec<ExchangeMessage>, ExchangeError>;

    async fn remove(&self, tenant: &TenantID, id: &str) -> Result<(), ExchangeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::standard::serde_json::json;

    #[test]
    fn test_meta_tagging() {
        let meta = ExchangeMeta::Offer(OfferMeta {
            offer: OfferBlob::from(json!({"cred_def_id": "def-1"})),
            credential_location: Some("http://values/1".to_string()),
        });

        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["stage"], "offer");
        assert_eq!(value["data"]["credentialLocation"], "http://values/1");
        assert_eq!(value["data"]["offer"]["cred_def_id"], "def-1");

        let proposal = serde_json::to_value(ExchangeMeta::Proposal).unwrap();
        assert_eq!(proposal, json!({"stage": "proposal"}))
    }

    #[test]
    fn test_entity_bytes() {
        let message = ExchangeMessage::new(
            "msg-1".to_string(),
            "offer",
            "msg-1".to_string(),
            json!({"@id": "msg-1"}),
            ExchangeMeta::Proposal,
        )
        .with_parties(Some(Did::from("me".to_string())), None);

        let bytes: Result<Vec<u8>, _> = message.try_into();
        assert!(!bytes.is_err());

        let restored = ExchangeMessage::try_from(bytes.unwrap());
        assert!(!restored.is_err());

        let restored = restored.unwrap();
        assert_eq!(restored.get_thread_id(), "msg-1");
        assert!(restored.involves(&Did::from("me".to_string())));
        assert!(matches!(restored.get_meta(), ExchangeMeta::Proposal))
    }

    #[test]
    fn test_entity_from_invalid_bytes() {
        let restored = ExchangeMessage::try_from(b"invalid".to_vec());
        assert!(matches!(
            restored.unwrap_err(),
            ExchangeError::EntityError(_)
        ))
    }
}
