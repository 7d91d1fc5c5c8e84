use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;

use crate::envelope::{Attachment, Thread};

pub const PROPOSAL_MESSAGE_TYPE: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/issue-credential/1.0/propose-credential";
pub const PREVIEW_TYPE: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/issue-credential/1.0/credential-preview";
pub const OFFER_MESSAGE_TYPE: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/issue-credential/1.0/offer-credential";
pub const REQUEST_MESSAGE_TYPE: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/issue-credential/1.0/request-credential";
pub const CREDENTIAL_MESSAGE_TYPE: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/issue-credential/1.0/issue-credential";

pub fn message_types() -> [&'static str; 4] {
    [
        PROPOSAL_MESSAGE_TYPE,
        OFFER_MESSAGE_TYPE,
        REQUEST_MESSAGE_TYPE,
        CREDENTIAL_MESSAGE_TYPE,
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct PreviewAttribute {
    pub name: String,

    #[serde(rename = "mime-type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    pub value: Value,
}

impl PreviewAttribute {
    pub fn new(name: &str, value: Value) -> Self {
        Self {
            name: name.to_string(),
            mime_type: None,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialPreview {
    #[serde(rename = "@type")]
    pub preview_type: String,

    #[serde(default)]
    pub attributes: Vec<PreviewAttribute>,
}

impl CredentialPreview {
    pub fn new(attributes: Vec<PreviewAttribute>) -> Self {
        Self {
            preview_type: PREVIEW_TYPE.to_string(),
            attributes,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|attr| attr.name.as_str())
    }

    /// same_attributes compares names and values, ignoring their order
    pub fn same_attributes(&self, other: &CredentialPreview) -> bool {
        let sorted = |preview: &CredentialPreview| {
            let mut pairs: Vec<(String, String)> = preview
                .attributes
                .iter()
                .map(|attr| (attr.name.clone(), attr.value.to_string()))
                .collect();
            pairs.sort();
            pairs
        };

        sorted(self) == sorted(other)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialProposal {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@type")]
    pub message_type: String,

    #[serde(rename = "~thread", default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,

    #[serde(default)]
    pub comment: String,

    pub credential_proposal: CredentialPreview,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialOffer {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@type")]
    pub message_type: String,

    #[serde(rename = "~thread", default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,

    #[serde(default)]
    pub comment: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_preview: Option<CredentialPreview>,

    #[serde(rename = "offers~attach")]
    pub offers_attach: Vec<Attachment>,
}

impl CredentialOffer {
    pub fn thread_id(&self) -> &str {
        self.thread
            .as_ref()
            .map(|thread| thread.thid.as_str())
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialRequest {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@type")]
    pub message_type: String,

    #[serde(rename = "~thread")]
    pub thread: Thread,

    #[serde(default)]
    pub comment: String,

    #[serde(rename = "requests~attach")]
    pub requests_attach: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct IssuedCredential {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@type")]
    pub message_type: String,

    #[serde(rename = "~thread")]
    pub thread: Thread,

    #[serde(default)]
    pub comment: String,

    #[serde(rename = "credentials~attach")]
    pub credentials_attach: Vec<Attachment>,
}
