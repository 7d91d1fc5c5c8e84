use rst_common::standard::serde::{de::DeserializeOwned, Serialize};
use rst_common::standard::serde_json::{self, Value};
use rst_common::standard::uuid::Uuid;

use super::types::EnvelopeError;

pub const MESSAGE_TYPE_PREFIX: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/";

/// message_type reads `@type`, falling back to the legacy `type` field
pub fn message_type(message: &Value) -> Option<&str> {
    message
        .get("@type")
        .or_else(|| message.get("type"))
        .and_then(Value::as_str)
}

pub fn message_id(message: &Value) -> Option<&str> {
    message.get("@id").and_then(Value::as_str)
}

/// thread_id is the `~thread.thid` value or, for the first message of a thread, its own id
pub fn thread_id(message: &Value) -> Option<&str> {
    message
        .get("~thread")
        .and_then(|thread| thread.get("thid"))
        .and_then(Value::as_str)
        .or_else(|| message_id(message))
}

pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn to_value<T: Serialize>(message: &T) -> Result<Value, EnvelopeError> {
    serde_json::to_value(message).map_err(|err| EnvelopeError::JSONError(err.to_string()))
}

pub fn from_value<T: DeserializeOwned>(message: &Value) -> Result<T, EnvelopeError> {
    serde_json::from_value(message.to_owned())
        .map_err(|err| EnvelopeError::InvalidEnvelope(err.to_string()))
}
