use base64::{engine::general_purpose::STANDARD, Engine};

use rst_common::standard::chrono::Utc;
use rst_common::standard::serde::{self, de::DeserializeOwned, Deserialize, Serialize};
use rst_common::standard::serde_json;

use crate::keystore::{sealed, SecureStore, Verkey};

use super::types::EnvelopeError;

pub const SIGNATURE_TYPE: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/signature/1.0/ed25519Sha512_single";

/// SignedField proves that whoever controls `signer` vouched for the payload at a point in time
///
/// `sig_data` is the decimal unix timestamp immediately followed by the JSON payload. The split
/// happens at the first `{`, so the payload must always be a JSON object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct SignedField {
    #[serde(rename = "@type")]
    pub field_type: String,
    pub signature: String,
    pub sig_data: String,
    pub signer: Verkey,
}

pub async fn wrap_signed_field<T: Serialize>(
    store: &dyn SecureStore,
    key: &Verkey,
    data: &T,
) -> Result<SignedField, EnvelopeError> {
    wrap_signed_field_at(store, key, data, Utc::now().timestamp()).await
}

pub async fn wrap_signed_field_at<T: Serialize>(
    store: &dyn SecureStore,
    key: &Verkey,
    data: &T,
    timestamp: i64,
) -> Result<SignedField, EnvelopeError> {
    let payload =
        serde_json::to_string(data).map_err(|err| EnvelopeError::JSONError(err.to_string()))?;
    if !payload.starts_with('{') {
        return Err(EnvelopeError::InvalidSignedField(
            "payload must be a json object".to_string(),
        ));
    }

    let sig_data = format!("{}{}", timestamp, payload).into_bytes();
    let signature = store.sign(key, &sig_data).await?;

    Ok(SignedField {
        field_type: SIGNATURE_TYPE.to_string(),
        signature: STANDARD.encode(signature),
        sig_data: STANDARD.encode(sig_data),
        signer: key.to_owned(),
    })
}

/// unwrap_signed_field returns the timestamp and the payload, it does not verify the signature
pub fn unwrap_signed_field<T: DeserializeOwned>(
    field: &SignedField,
) -> Result<(i64, T), EnvelopeError> {
    let sig_data = decode(&field.sig_data)?;
    let sig_data = String::from_utf8(sig_data)
        .map_err(|err| EnvelopeError::InvalidSignedField(err.to_string()))?;

    let split = sig_data
        .find('{')
        .ok_or_else(|| EnvelopeError::InvalidSignedField("missing payload".to_string()))?;
    let (timestamp, payload) = sig_data.split_at(split);

    let timestamp = timestamp
        .parse::<i64>()
        .map_err(|err| EnvelopeError::InvalidSignedField(err.to_string()))?;
    let data = serde_json::from_str(payload)
        .map_err(|err| EnvelopeError::InvalidSignedField(err.to_string()))?;

    Ok((timestamp, data))
}

pub fn verify_signed_field(field: &SignedField) -> Result<bool, EnvelopeError> {
    let sig_data = decode(&field.sig_data)?;
    let signature = decode(&field.signature)?;

    match sealed::verify(&field.signer, &sig_data, &signature) {
        Ok(valid) => Ok(valid),
        Err(_) => Ok(false),
    }
}

fn decode(value: &str) -> Result<Vec<u8>, EnvelopeError> {
    STANDARD
        .decode(value)
        .map_err(|err| EnvelopeError::InvalidSignedField(err.to_string()))
}
