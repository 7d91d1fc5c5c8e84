use std::collections::HashMap;
use std::sync::Arc;

use ed25519_dalek::SigningKey;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_tokio::tokio::sync::RwLock;

use super::sealed;
use super::types::{Did, KeyError, Pairwise, SecureStore, Verkey};

/// MemoryStore keeps Ed25519 signing keys, local identifiers and pairwise records in process memory
///
/// Cloning is cheap and every clone shares the same underlying maps
#[derive(Clone, Default)]
pub struct MemoryStore {
    keys: Arc<RwLock<HashMap<Verkey, SigningKey>>>,
    dids: Arc<RwLock<HashMap<Did, Verkey>>>,
    pairwise: Arc<RwLock<HashMap<Did, Pairwise>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn signing_key(&self, key: &Verkey) -> Result<SigningKey, KeyError> {
        let keys = self.keys.read().await;
        keys.get(key)
            .cloned()
            .ok_or_else(|| KeyError::KeyMismatch(key.to_string()))
    }
}

#[async_trait]
impl SecureStore for MemoryStore {
    async fn create_key(&self) -> Result<Verkey, KeyError> {
        let signing = sealed::generate_signing_key();
        let verkey = sealed::verkey_of(&signing);

        let mut keys = self.keys.write().await;
        keys.insert(verkey.clone(), signing);
        Ok(verkey)
    }

    async fn create_did(&self) -> Result<(Did, Verkey), KeyError> {
        let verkey = self.create_key().await?;
        let did = Did::from_verkey(&verkey)?;

        let mut dids = self.dids.write().await;
        dids.insert(did.clone(), verkey.clone());
        Ok((did, verkey))
    }

    async fn key_for_local_did(&self, did: &Did) -> Result<Verkey, KeyError> {
        let dids = self.dids.read().await;
        dids.get(did)
            .cloned()
            .ok_or_else(|| KeyError::KeyMismatch(format!("unknown local did: {}", did)))
    }

    async fn has_key(&self, key: &Verkey) -> Result<bool, KeyError> {
        let keys = self.keys.read().await;
        Ok(keys.contains_key(key))
    }

    async fn sign(&self, key: &Verkey, data: &[u8]) -> Result<Vec<u8>, KeyError> {
        let signing = self.signing_key(key).await?;
        Ok(sealed::sign(&signing, data))
    }

    async fn anon_decrypt(&self, key: &Verkey, ciphertext: &[u8]) -> Result<Vec<u8>, KeyError> {
        let signing = self.signing_key(key).await?;
        sealed::anon_decrypt(&signing, ciphertext)
    }

    async fn auth_encrypt(
        &self,
        sender: &Verkey,
        recipient: &Verkey,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, KeyError> {
        let signing = self.signing_key(sender).await?;
        sealed::auth_encrypt(&signing, recipient, plaintext)
    }

    async fn auth_decrypt(
        &self,
        recipient: &Verkey,
        ciphertext: &[u8],
    ) -> Result<(Verkey, Vec<u8>), KeyError> {
        let signing = self.signing_key(recipient).await?;
        sealed::auth_decrypt(&signing, ciphertext)
    }

    async fn store_pairwise(&self, pairwise: Pairwise) -> Result<(), KeyError> {
        let mut records = self.pairwise.write().await;
        records.insert(pairwise.their_did.clone(), pairwise);
        Ok(())
    }

    async fn get_pairwise(&self, their_did: &Did) -> Result<Option<Pairwise>, KeyError> {
        let records = self.pairwise.read().await;
        Ok(records.get(their_did).cloned())
    }
}
