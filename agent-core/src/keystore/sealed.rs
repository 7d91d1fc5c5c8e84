use chacha20poly1305::aead::{Aead, AeadCore, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hkdf::Hkdf;
use rand_core::OsRng;
use sha2::{Digest, Sha256, Sha512};
use x25519_dalek::{EphemeralSecret, PublicKey as X25519Public, StaticSecret};

use super::types::{KeyError, Verkey, VERKEY_LENGTH};

const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;
const ANON_INFO: &[u8] = b"prople-agent/anoncrypt";
const AUTH_INFO: &[u8] = b"prople-agent/authcrypt";

/// size of the anonymously sealed sender verkey prefixed to every authcrypt payload
pub const SEALED_SENDER_LENGTH: usize = VERKEY_LENGTH + NONCE_LENGTH + VERKEY_LENGTH + TAG_LENGTH;

pub fn generate_signing_key() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

pub fn verkey_of(key: &SigningKey) -> Verkey {
    Verkey::from_bytes(&key.verifying_key().to_bytes())
}

pub fn sign(key: &SigningKey, data: &[u8]) -> Vec<u8> {
    key.sign(data).to_bytes().to_vec()
}

/// verify returns `Ok(false)` for a well formed but wrong signature, errors are kept
/// for malformed keys or signatures
pub fn verify(signer: &Verkey, data: &[u8], signature: &[u8]) -> Result<bool, KeyError> {
    let verifying = verifying_key(signer)?;
    let signature =
        Signature::from_slice(signature).map_err(|err| KeyError::SignatureError(err.to_string()))?;

    Ok(verifying.verify(data, &signature).is_ok())
}

pub fn anon_encrypt(recipient: &Verkey, plaintext: &[u8]) -> Result<Vec<u8>, KeyError> {
    let recipient_public = x25519_public(recipient)?;
    anon_seal(&recipient_public, plaintext)
}

pub fn anon_decrypt(
    key: &SigningKey,
    ciphertext: &[u8],
) -> Result<Vec<u8>, KeyError> {
    if ciphertext.len() < VERKEY_LENGTH + NONCE_LENGTH + TAG_LENGTH {
        return Err(KeyError::DecryptError("ciphertext too short".to_string()));
    }

    let secret = x25519_secret(key);
    let own_public = X25519Public::from(&secret);

    let mut epk = [0u8; VERKEY_LENGTH];
    epk.copy_from_slice(&ciphertext[..VERKEY_LENGTH]);
    let ephemeral_public = X25519Public::from(epk);

    let shared = secret.diffie_hellman(&ephemeral_public);
    let symmetric = derive_key(
        shared.as_bytes(),
        &[ANON_INFO, ephemeral_public.as_bytes(), own_public.as_bytes()],
    )?;

    open(&symmetric, &ciphertext[VERKEY_LENGTH..])
}

pub fn auth_encrypt(
    sender: &SigningKey,
    recipient: &Verkey,
    plaintext: &[u8],
) -> Result<Vec<u8>, KeyError> {
    let recipient_public = x25519_public(recipient)?;
    let sender_verkey = sender.verifying_key().to_bytes();

    let mut sealed = anon_seal(&recipient_public, &sender_verkey)?;

    let shared = x25519_secret(sender).diffie_hellman(&recipient_public);
    let symmetric = derive_key(
        shared.as_bytes(),
        &[AUTH_INFO, &sender_verkey, recipient_public.as_bytes()],
    )?;

    sealed.extend(seal(&symmetric, plaintext)?);
    Ok(sealed)
}

pub fn auth_decrypt(
    key: &SigningKey,
    ciphertext: &[u8],
) -> Result<(Verkey, Vec<u8>), KeyError> {
    if ciphertext.len() < SEALED_SENDER_LENGTH + NONCE_LENGTH + TAG_LENGTH {
        return Err(KeyError::DecryptError("ciphertext too short".to_string()));
    }

    let sender_bytes = anon_decrypt(key, &ciphertext[..SEALED_SENDER_LENGTH])?;
    let sender_bytes: [u8; VERKEY_LENGTH] = sender_bytes
        .try_into()
        .map_err(|_| KeyError::DecryptError("invalid sealed sender".to_string()))?;
    let sender = Verkey::from_bytes(&sender_bytes);

    let secret = x25519_secret(key);
    let own_public = X25519Public::from(&secret);
    let shared = secret.diffie_hellman(&x25519_public(&sender)?);
    let symmetric = derive_key(
        shared.as_bytes(),
        &[AUTH_INFO, &sender_bytes, own_public.as_bytes()],
    )?;

    let plaintext = open(&symmetric, &ciphertext[SEALED_SENDER_LENGTH..])?;
    Ok((sender, plaintext))
}

fn anon_seal(recipient: &X25519Public, plaintext: &[u8]) -> Result<Vec<u8>, KeyError> {
    let ephemeral = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = X25519Public::from(&ephemeral);

    let shared = ephemeral.diffie_hellman(recipient);
    let symmetric = derive_key(
        shared.as_bytes(),
        &[ANON_INFO, ephemeral_public.as_bytes(), recipient.as_bytes()],
    )?;

    let mut out = ephemeral_public.as_bytes().to_vec();
    out.extend(seal(&symmetric, plaintext)?);
    Ok(out)
}

fn verifying_key(key: &Verkey) -> Result<VerifyingKey, KeyError> {
    VerifyingKey::from_bytes(&key.to_bytes()?).map_err(|err| KeyError::InvalidKey(err.to_string()))
}

fn x25519_public(key: &Verkey) -> Result<X25519Public, KeyError> {
    let verifying = verifying_key(key)?;
    Ok(X25519Public::from(verifying.to_montgomery().to_bytes()))
}

// clamped on use by x25519, matches the scalar behind the ed25519 public key
fn x25519_secret(key: &SigningKey) -> StaticSecret {
    let digest = Sha512::digest(key.to_bytes());
    let mut scalar = [0u8; 32];
    scalar.copy_from_slice(&digest[..32]);
    StaticSecret::from(scalar)
}

fn derive_key(shared: &[u8], info: &[&[u8]]) -> Result<[u8; 32], KeyError> {
    let hkdf = Hkdf::<Sha256>::new(None, shared);
    let mut okm = [0u8; 32];
    hkdf.expand(&info.concat(), &mut okm)
        .map_err(|err| KeyError::EncryptError(err.to_string()))?;

    Ok(okm)
}

fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, KeyError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|err| KeyError::EncryptError(err.to_string()))?;

    let mut out = nonce.to_vec();
    out.extend(ciphertext);
    Ok(out)
}

fn open(key: &[u8; 32], data: &[u8]) -> Result<Vec<u8>, KeyError> {
    if data.len() < NONCE_LENGTH + TAG_LENGTH {
        return Err(KeyError::DecryptError("ciphertext too short".to_string()));
    }

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = Nonce::from_slice(&data[..NONCE_LENGTH]);
    cipher
        .decrypt(nonce, &data[NONCE_LENGTH..])
        .map_err(|err| KeyError::DecryptError(err.to_string()))
}
