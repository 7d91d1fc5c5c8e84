use base64::{engine::general_purpose::STANDARD, Engine};
use url::Url;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::{self, Value};
use rst_common::with_errors::thiserror::{self, Error};

use crate::keystore::{KeyError, Verkey};

use super::message;

pub const FORWARD_MESSAGE_TYPE: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/routing/1.0/forward";

/// EnvelopeError is a base error types for the `envelope` domain
#[derive(Debug, PartialEq, Error, Clone)]
pub enum EnvelopeError {
    #[error("key error: {0}")]
    KeyError(#[from] KeyError),

    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("invalid signed field: {0}")]
    InvalidSignedField(String),

    #[error("attachment error: {0}")]
    AttachmentError(String),

    #[error("json error: {0}")]
    JSONError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "lowercase")]
pub enum Algorithm {
    Anoncrypt,
    Authcrypt,
}

/// Envelope is a single encrypted hop. The ciphertext is the raw output of the
/// keystore primitives, base64 encoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Envelope {
    pub alg: Algorithm,
    pub ciphertext: String,
}

impl Envelope {
    pub fn new(alg: Algorithm, raw: &[u8]) -> Self {
        Self {
            alg,
            ciphertext: STANDARD.encode(raw),
        }
    }

    pub fn raw(&self) -> Result<Vec<u8>, EnvelopeError> {
        STANDARD
            .decode(&self.ciphertext)
            .map_err(|err| EnvelopeError::InvalidEnvelope(err.to_string()))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(bytes).map_err(|err| EnvelopeError::InvalidEnvelope(err.to_string()))
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, EnvelopeError> {
        serde_json::to_vec(self).map_err(|err| EnvelopeError::JSONError(err.to_string()))
    }
}

/// Forward is the routing message carried inside every onion layer except the innermost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Forward {
    #[serde(rename = "@type")]
    pub message_type: String,
    pub to: Verkey,
    pub msg: Envelope,
}

impl Forward {
    pub fn new(to: Verkey, msg: Envelope) -> Self {
        Self {
            message_type: FORWARD_MESSAGE_TYPE.to_string(),
            to,
            msg,
        }
    }

    /// from_message returns `None` for anything that isn't a forward message
    pub fn from_message(message: &Value) -> Result<Option<Self>, EnvelopeError> {
        if message::message_type(message) != Some(FORWARD_MESSAGE_TYPE) {
            return Ok(None);
        }

        let forward = serde_json::from_value(message.to_owned())
            .map_err(|err| EnvelopeError::InvalidEnvelope(err.to_string()))?;
        Ok(Some(forward))
    }
}

/// Target describes where and how a message should be delivered
///
/// When `sender_key` is present the message is authcrypted, otherwise it is anoncrypted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(crate = "self::serde", rename_all = "camelCase")]
pub struct Target {
    pub recipient_keys: Vec<Verkey>,
    #[serde(default)]
    pub routing_keys: Vec<Verkey>,
    pub service_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_key: Option<Verkey>,
}

impl Target {
    pub fn new(recipient_keys: Vec<Verkey>, routing_keys: Vec<Verkey>, service_endpoint: String) -> Self {
        Self {
            recipient_keys,
            routing_keys,
            service_endpoint,
            sender_key: None,
        }
    }

    pub fn with_sender(mut self, sender_key: Verkey) -> Self {
        self.sender_key = Some(sender_key);
        self
    }

    pub fn anonymous(&self) -> Self {
        let mut target = self.clone();
        target.sender_key = None;
        target
    }

    pub fn recipient(&self) -> Result<&Verkey, EnvelopeError> {
        self.recipient_keys
            .first()
            .ok_or_else(|| EnvelopeError::InvalidTarget("missing recipient key".to_string()))
    }

    pub fn scheme(&self) -> Result<String, EnvelopeError> {
        let endpoint = Url::parse(&self.service_endpoint).map_err(|err| {
            EnvelopeError::InvalidTarget(format!(
                "invalid endpoint {}: {}",
                self.service_endpoint, err
            ))
        })?;

        Ok(endpoint.scheme().to_string())
    }
}

/// Unpacked is a fully decrypted message with the keys it travelled between
#[derive(Debug, Clone, PartialEq)]
pub struct Unpacked {
    pub message: Value,
    pub sender_key: Option<Verkey>,
    pub recipient_key: Verkey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Thread {
    pub thid: String,
}

impl Thread {
    pub fn new(thid: impl Into<String>) -> Self {
        Self { thid: thid.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::standard::serde_json::json;

    #[test]
    fn test_target_scheme() {
        let target = Target::new(vec![], vec![], "https://agent.example.com/indy".to_string());
        assert_eq!(target.scheme().unwrap(), "https");

        let target = Target::new(vec![], vec![], "local://agent".to_string());
        assert_eq!(target.scheme().unwrap(), "local");

        let target = Target::new(vec![], vec![], "agent.example.com".to_string());
        assert!(matches!(
            target.scheme().unwrap_err(),
            EnvelopeError::InvalidTarget(_)
        ));

        let target = Target::new(vec![], vec![], "".to_string());
        assert!(matches!(
            target.scheme().unwrap_err(),
            EnvelopeError::InvalidTarget(_)
        ))
    }

    #[test]
    fn test_target_wire_names() {
        let target = Target::new(
            vec![Verkey::from("abc".to_string())],
            vec![],
            "local://agent".to_string(),
        );

        let value = serde_json::to_value(&target).unwrap();
        assert_eq!(value["recipientKeys"][0], "abc");
        assert_eq!(value["serviceEndpoint"], "local://agent");
        assert!(value.get("senderKey").is_none())
    }

    #[test]
    fn test_forward_detection() {
        let message = json!({"@type": "something/else", "to": "abc"});
        assert!(Forward::from_message(&message).unwrap().is_none());

        let forward = Forward::new(
            Verkey::from("abc".to_string()),
            Envelope::new(Algorithm::Anoncrypt, b"raw"),
        );
        let value = serde_json::to_value(&forward).unwrap();
        let parsed = Forward::from_message(&value).unwrap();
        assert_eq!(parsed, Some(forward))
    }
}
