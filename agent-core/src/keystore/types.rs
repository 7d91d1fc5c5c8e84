use derive_more::{AsRef, Display, From, Into};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;
use rst_common::with_errors::thiserror::{self, Error};

pub const VERKEY_LENGTH: usize = 32;

/// KeyError is a base error types for the `keystore` domain
///
/// [`KeyError::KeyMismatch`] is special: it means the store simply doesn't hold the private key,
/// callers doing trial decryption treat it as "try the next one", while [`KeyError::StoreError`]
/// is a local resource failure that must always be surfaced
#[derive(Debug, PartialEq, Error, Clone)]
pub enum KeyError {
    #[error("key mismatch: {0}")]
    KeyMismatch(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("encrypt error: {0}")]
    EncryptError(String),

    #[error("decrypt error: {0}")]
    DecryptError(String),

    #[error("signature error: {0}")]
    SignatureError(String),

    #[error("store error: {0}")]
    StoreError(String),
}

/// Verkey is the base58 encoded Ed25519 public key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, From, Into, AsRef, Display)]
#[serde(crate = "self::serde")]
pub struct Verkey(String);

impl Verkey {
    pub fn from_bytes(bytes: &[u8; VERKEY_LENGTH]) -> Self {
        Self(bs58::encode(bytes).into_string())
    }

    pub fn to_bytes(&self) -> Result<[u8; VERKEY_LENGTH], KeyError> {
        let decoded = bs58::decode(&self.0)
            .into_vec()
            .map_err(|err| KeyError::InvalidKey(err.to_string()))?;

        decoded
            .try_into()
            .map_err(|_| KeyError::InvalidKey(format!("verkey must be {} bytes", VERKEY_LENGTH)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Did is a pairwise or public identifier. Local identifiers are derived from the first
/// half of their verkey bytes, peers may send any non-empty string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, From, Into, AsRef, Display)]
#[serde(crate = "self::serde")]
pub struct Did(String);

impl Did {
    pub fn from_verkey(verkey: &Verkey) -> Result<Self, KeyError> {
        let bytes = verkey.to_bytes()?;
        Ok(Self(bs58::encode(&bytes[..16]).into_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Pairwise binds one of our identifiers to a remote party's identifier and key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Pairwise {
    pub their_did: Did,
    pub their_key: Verkey,
    pub my_did: Did,
    pub metadata: Option<Value>,
}

/// `SecureStore` is the tenant's secure context. Private keys never leave the implementation,
/// every operation needing them is executed by the store itself.
///
/// Anonymous encryption and signature verification only need public keys, they live in
/// [`super::sealed`] as free functions
#[async_trait]
pub trait SecureStore: Send + Sync {
    async fn create_key(&self) -> Result<Verkey, KeyError>;
    async fn create_did(&self) -> Result<(Did, Verkey), KeyError>;
    async fn key_for_local_did(&self, did: &Did) -> Result<Verkey, KeyError>;
    async fn has_key(&self, key: &Verkey) -> Result<bool, KeyError>;

    async fn sign(&self, key: &Verkey, data: &[u8]) -> Result<Vec<u8>, KeyError>;

    /// fails with [`KeyError::KeyMismatch`] if this store holds no private key for `key`
    async fn anon_decrypt(&self, key: &Verkey, ciphertext: &[u8]) -> Result<Vec<u8>, KeyError>;

    async fn auth_encrypt(
        &self,
        sender: &Verkey,
        recipient: &Verkey,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, KeyError>;

    async fn auth_decrypt(
        &self,
        recipient: &Verkey,
        ciphertext: &[u8],
    ) -> Result<(Verkey, Vec<u8>), KeyError>;

    async fn store_pairwise(&self, pairwise: Pairwise) -> Result<(), KeyError>;
    async fn get_pairwise(&self, their_did: &Did) -> Result<Option<Pairwise>, KeyError>;
}
