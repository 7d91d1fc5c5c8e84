use base64::{engine::general_purpose::STANDARD, Engine};

use rst_common::standard::serde::{self, de::DeserializeOwned, Deserialize, Serialize};
use rst_common::standard::serde_json;

use super::types::EnvelopeError;

pub const MIME_TYPE_JSON: &str = "application/json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
struct AttachmentData {
    base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
struct AttachmentWire {
    #[serde(rename = "@id")]
    id: String,

    #[serde(rename = "mime-type")]
    mime_type: String,

    data: AttachmentData,
}

/// Attachment is one entry of a `<name>~attach` list
///
/// On the wire the payload is base64 encoded, here it is always the decoded bytes, so
/// every decoder below works on raw payloads only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde", try_from = "AttachmentWire", into = "AttachmentWire")]
pub struct Attachment {
    pub id: String,
    pub mime_type: String,
    pub payload: Vec<u8>,
}

impl Attachment {
    /// json builds an `application/json` attachment, ids follow the `<message id>-<n>` convention
    pub fn json<T: Serialize>(message_id: &str, value: &T) -> Result<Self, EnvelopeError> {
        let payload =
            serde_json::to_vec(value).map_err(|err| EnvelopeError::JSONError(err.to_string()))?;

        Ok(Self {
            id: format!("{}-1", message_id),
            mime_type: MIME_TYPE_JSON.to_string(),
            payload,
        })
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, EnvelopeError> {
        if self.mime_type != MIME_TYPE_JSON {
            return Err(EnvelopeError::AttachmentError(format!(
                "unsupported mime type: {}",
                self.mime_type
            )));
        }

        serde_json::from_slice(&self.payload)
            .map_err(|err| EnvelopeError::AttachmentError(err.to_string()))
    }

    /// first decodes the first attachment of a list, protocol messages only ever carry one
    pub fn first<T: DeserializeOwned>(attachments: &[Attachment]) -> Result<T, EnvelopeError> {
        attachments
            .first()
            .ok_or_else(|| EnvelopeError::AttachmentError("missing attachment".to_string()))?
            .decode()
    }
}

impl TryFrom<AttachmentWire> for Attachment {
    type Error = EnvelopeError;

    fn try_from(wire: AttachmentWire) -> Result<Self, Self::Error> {
        let payload = STANDARD
            .decode(wire.data.base64)
            .map_err(|err| EnvelopeError::AttachmentError(err.to_string()))?;

        Ok(Self {
            id: wire.id,
            mime_type: wire.mime_type,
            payload,
        })
    }
}

impl From<Attachment> for AttachmentWire {
    fn from(attachment: Attachment) -> Self {
        Self {
            id: attachment.id,
            mime_type: attachment.mime_type,
            data: AttachmentData {
                base64: STANDARD.encode(attachment.payload),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::standard::serde_json::{json, Value};

    #[test]
    fn test_wire_format() {
        let attachment = Attachment::json("msg", &json!({"nonce": "1"})).unwrap();
        let value = serde_json::to_value(&attachment).unwrap();

        assert_eq!(value["@id"], "msg-1");
        assert_eq!(value["mime-type"], MIME_TYPE_JSON);

        let encoded = value["data"]["base64"].as_str().unwrap();
        let decoded = STANDARD.decode(encoded).unwrap();
        let payload: Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(payload, json!({"nonce": "1"}))
    }

    #[test]
    fn test_decode_from_wire() {
        let wire = json!({
            "@id": "a-1",
            "mime-type": "application/json",
            "data": {"base64": STANDARD.encode(b"{\"cred_def_id\":\"d\"}")}
        });

        let attachment: Attachment = serde_json::from_value(wire).unwrap();
        let payload: Value = attachment.decode().unwrap();
        assert_eq!(payload["cred_def_id"], "d")
    }

    #[test]
    fn test_decode_invalid_base64() {
        let wire = json!({
            "@id": "a-1",
            "mime-type": "application/json",
            "data": {"base64": "***"}
        });

        let attachment: Result<Attachment, _> = serde_json::from_value(wire);
        assert!(attachment.is_err())
    }

    #[test]
    fn test_first_missing() {
        let result: Result<Value, EnvelopeError> = Attachment::first(&[]);
        assert!(matches!(
            result.unwrap_err(),
            EnvelopeError::AttachmentError(_)
        ))
    }
}
