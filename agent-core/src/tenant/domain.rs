use std::sync::Arc;

use rst_common::with_logging::log::debug;

use crate::envelope::codec;
use crate::envelope::{Algorithm, Envelope, EnvelopeError, Forward};
use crate::keystore::{Did, KeyError, SecureStore, Verkey};

use super::types::TenantError;

/// Domain is the agent's own secure context. Its key is the last routing key of every
/// invitation and DID document issued here, so it always holds the outermost layer
#[derive(Clone)]
pub struct Domain {
    did: Did,
    key: Verkey,
    endpoint: String,
    store: Arc<dyn SecureStore>,
}

impl Domain {
    pub async fn provision(
        store: Arc<dyn SecureStore>,
        endpoint: String,
    ) -> Result<Self, TenantError> {
        let (did, key) = store.create_did().await?;
        Ok(Self {
            did,
            key,
            endpoint,
            store,
        })
    }

    pub fn did(&self) -> &Did {
        &self.did
    }

    pub fn key(&self) -> &Verkey {
        &self.key
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// open removes the domain layer. `None` means the envelope was not addressed to the domain
    pub async fn open(&self, envelope: &Envelope) -> Result<Option<Forward>, TenantError> {
        if envelope.alg != Algorithm::Anoncrypt {
            return Ok(None);
        }

        let message = match codec::anonymous_decrypt(self.store.as_ref(), &self.key, envelope).await {
            Ok(message) => message,
            Err(EnvelopeError::KeyError(KeyError::StoreError(err))) => {
                return Err(TenantError::StoreError(err))
            }
            Err(err) => {
                debug!("envelope not addressed to the domain: {}", err);
                return Ok(None);
            }
        };

        match Forward::from_message(&message)? {
            Some(forward) => Ok(Some(forward)),
            None => Err(TenantError::EnvelopeError(EnvelopeError::InvalidEnvelope(
                "domain accepts forward messages only".to_string(),
            ))),
        }
    }
}
