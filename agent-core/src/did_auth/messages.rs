use rst_common::standard::serde::{self, Deserialize, Serialize};

use crate::envelope::SignedField;
use crate::keystore::Did;

pub const REQUEST_MESSAGE_TYPE: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/didauth/1.0/request";
pub const RESPONSE_MESSAGE_TYPE: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/didauth/1.0/response";

/// message_types lists the inbound types handled by the router, requests travel out of band
pub fn message_types() -> [&'static str; 1] {
    [RESPONSE_MESSAGE_TYPE]
}

/// Challenge is the signed content of a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Challenge {
    pub nonce: String,
}

/// Answer is the signed content of a response, the challenge nonce and the answering identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Answer {
    pub nonce: String,
    pub did: Did,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct DidAuthRequest {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@type")]
    pub message_type: String,

    pub origin: Did,

    #[serde(rename = "challenge~sig")]
    pub challenge: SignedField,
}

/// DidAuthResponse keeps the id of the request it answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct DidAuthResponse {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@type")]
    pub message_type: String,

    pub origin: Did,

    #[serde(rename = "answer~sig")]
    pub answer: SignedField,
}
