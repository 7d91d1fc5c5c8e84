use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;

use crate::envelope::message::MESSAGE_TYPE_PREFIX;
use crate::envelope::{SignedField, Target, Thread};
use crate::keystore::Verkey;

use super::diddoc::DidDoc;

pub const INVITATION_MESSAGE_TYPE: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/didexchange/1.0/invitation";
pub const REQUEST_MESSAGE_TYPE: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/didexchange/1.0/request";
pub const RESPONSE_MESSAGE_TYPE: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/didexchange/1.0/response";

/// message_types lists every type handled by the connection state machine
pub fn message_types() -> [&'static str; 3] {
    [
        INVITATION_MESSAGE_TYPE,
        REQUEST_MESSAGE_TYPE,
        RESPONSE_MESSAGE_TYPE,
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "camelCase")]
pub struct Invitation {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@type")]
    pub message_type: String,

    #[serde(default)]
    pub label: Option<String>,

    pub recipient_keys: Vec<Verkey>,

    #[serde(default)]
    pub routing_keys: Vec<Verkey>,

    pub service_endpoint: String,

    #[serde(rename = "~attach", default, skip_serializing_if = "Option::is_none")]
    pub attach: Option<Value>,
}

impl Invitation {
    /// target is where a request answering this invitation must go, always anonymous
    pub fn target(&self) -> Target {
        Target::new(
            self.recipient_keys.to_owned(),
            self.routing_keys.to_owned(),
            self.service_endpoint.to_owned(),
        )
    }
}

/// ConnectionField is the signed part of a response and the body of a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ConnectionField {
    pub did: String,
    pub did_doc: DidDoc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ConnectionRequest {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@type")]
    pub message_type: String,

    #[serde(default)]
    pub label: Option<String>,

    pub connection: ConnectionField,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ConnectionResponse {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@type")]
    pub message_type: String,

    #[serde(rename = "~thread")]
    pub thread: Thread,

    #[serde(rename = "connection~sig")]
    pub connection_sig: SignedField,
}
