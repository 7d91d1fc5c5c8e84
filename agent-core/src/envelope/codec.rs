use rst_common::standard::serde_json::{self, Value};

use crate::keystore::{sealed, SecureStore, Verkey};

use super::types::{Algorithm, Envelope, EnvelopeError, Forward, Target, Unpacked};

pub fn anonymous_encrypt(recipient: &Verkey, message: &Value) -> Result<Envelope, EnvelopeError> {
    let plaintext = serialize(message)?;
    let raw = sealed::anon_encrypt(recipient, &plaintext)?;
    Ok(Envelope::new(Algorithm::Anoncrypt, &raw))
}

/// anonymous_decrypt fails with [`crate::keystore::KeyError::KeyMismatch`] when the store
/// doesn't hold `key`
pub async fn anonymous_decrypt(
    store: &dyn SecureStore,
    key: &Verkey,
    envelope: &Envelope,
) -> Result<Value, EnvelopeError> {
    expect_algorithm(envelope, Algorithm::Anoncrypt)?;

    let plaintext = store.anon_decrypt(key, &envelope.raw()?).await?;
    deserialize(&plaintext)
}

pub async fn authenticated_encrypt(
    store: &dyn SecureStore,
    sender: &Verkey,
    recipient: &Verkey,
    message: &Value,
) -> Result<Envelope, EnvelopeError> {
    let plaintext = serialize(message)?;
    let raw = store.auth_encrypt(sender, recipient, &plaintext).await?;
    Ok(Envelope::new(Algorithm::Authcrypt, &raw))
}

pub async fn authenticated_decrypt(
    store: &dyn SecureStore,
    recipient: &Verkey,
    envelope: &Envelope,
) -> Result<(Verkey, Value), EnvelopeError> {
    expect_algorithm(envelope, Algorithm::Authcrypt)?;

    let (sender, plaintext) = store.auth_decrypt(recipient, &envelope.raw()?).await?;
    Ok((sender, deserialize(&plaintext)?))
}

/// forward_wrap nests `envelope` inside one forward layer per routing key, in order.
/// The returned envelope is addressed to the last routing key
pub fn forward_wrap(
    envelope: Envelope,
    recipient: &Verkey,
    routing_keys: &[Verkey],
) -> Result<Envelope, EnvelopeError> {
    let mut packed = envelope;
    let mut to = recipient.to_owned();

    for key in routing_keys {
        let forward = Forward::new(to, packed);
        let value = serde_json::to_value(&forward)
            .map_err(|err| EnvelopeError::JSONError(err.to_string()))?;

        packed = anonymous_encrypt(key, &value)?;
        to = key.to_owned();
    }

    Ok(packed)
}

/// pack builds the wire envelope for `target`: authcrypt when a sender key is set,
/// anoncrypt otherwise, then forward wrapped through the routing keys
pub async fn pack(
    store: &dyn SecureStore,
    message: &Value,
    target: &Target,
) -> Result<Envelope, EnvelopeError> {
    let recipient = target.recipient()?;
    let envelope = match &target.sender_key {
        Some(sender) => authenticated_encrypt(store, sender, recipient, message).await?,
        None => anonymous_encrypt(recipient, message)?,
    };

    forward_wrap(envelope, recipient, &target.routing_keys)
}

/// unpack removes exactly one layer, using the algorithm announced by the envelope
pub async fn unpack(
    store: &dyn SecureStore,
    key: &Verkey,
    envelope: &Envelope,
) -> Result<Unpacked, EnvelopeError> {
    match envelope.alg {
        Algorithm::Anoncrypt => {
            let message = anonymous_decrypt(store, key, envelope).await?;
            Ok(Unpacked {
                message,
                sender_key: None,
                recipient_key: key.to_owned(),
            })
        }
        Algorithm::Authcrypt => {
            let (sender, message) = authenticated_decrypt(store, key, envelope).await?;
            Ok(Unpacked {
                message,
                sender_key: Some(sender),
                recipient_key: key.to_owned(),
            })
        }
    }
}

fn expect_algorithm(envelope: &Envelope, alg: Algorithm) -> Result<(), EnvelopeError> {
    if envelope.alg != alg {
        return Err(EnvelopeError::InvalidEnvelope(format!(
            "unexpected algorithm: {:?}",
            envelope.alg
        )));
    }

    Ok(())
}

fn serialize(message: &Value) -> Result<Vec<u8>, EnvelopeError> {
    serde_json::to_vec(message).map_err(|err| EnvelopeError::JSONError(err.to_string()))
}

fn deserialize(plaintext: &[u8]) -> Result<Value, EnvelopeError> {
    serde_json::from_slice(plaintext).map_err(|err| EnvelopeError::JSONError(err.to_string()))
}
