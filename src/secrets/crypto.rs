//! Encryption of secrets for the oracle network.
//!
//! Secrets are sealed to a public key published by the network's coordinator
//! using an ephemeral-static X25519 exchange:
//!
//! ```text
//! ephemeral_sk ──┐
//!                ├─► X25519 ─► HKDF-SHA256(salt = ephemeral_pk, info = context) ─► AES-256-GCM key
//! network_pk ────┘
//! ```
//!
//! The context string is also bound as associated data, so a payload sealed
//! for one purpose cannot be opened as another. The serialized envelope is
//! `ephemeral_pk (32) || nonce (12) || ciphertext || tag (16)`.
//!
//! This envelope is a local stand-in for the network's own encryption. A live
//! DON publishes a JSON threshold key and a secp256k1 DON key, and cannot open
//! these envelopes, so requests sealed here are only fulfillable by nodes
//! holding the matching [`DecryptionKeys`] (the test helpers and local
//! simulation). Talking to a real network needs an [`EncryptionKeySource`]
//! and sealing scheme that speak its formats.
//!
//! [`EncryptionKeySource`]: super::EncryptionKeySource

use std::fmt;

use aes_gcm::{
    Aes256Gcm, KeyInit, Nonce,
    aead::{Aead, AeadCore, OsRng, Payload},
};
use alloy::primitives::Bytes;
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use url::Url;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use super::{SecretBundle, SecretsError};

/// Context for the secrets payload stored off-chain.
pub const PAYLOAD_CONTEXT: &str = "functions-relay/secrets/v1";

/// Context for the payload locator included on-chain.
pub const LOCATOR_CONTEXT: &str = "functions-relay/secrets-urls/v1";

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;

/// Public encryption material of an oracle network.
///
/// The payload and its locator are sealed to different keys: the payload key
/// is only usable by the node quorum, the locator key by each node.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EncryptionKeys {
    /// Key the secrets payload is sealed to.
    pub threshold_public_key: PublicKey,
    /// Key the locator is sealed to.
    pub don_public_key: PublicKey,
}

impl EncryptionKeys {
    /// Parses the raw 32-byte keys returned by the coordinator.
    pub fn from_raw(threshold: &[u8], don: &[u8]) -> Result<Self, SecretsError> {
        Ok(Self {
            threshold_public_key: parse_public_key(threshold, "threshold")?,
            don_public_key: parse_public_key(don, "DON")?,
        })
    }
}

impl fmt::Debug for EncryptionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKeys")
            .field("threshold_public_key", &hex::encode(self.threshold_public_key.as_bytes()))
            .field("don_public_key", &hex::encode(self.don_public_key.as_bytes()))
            .finish()
    }
}

fn parse_public_key(raw: &[u8], which: &str) -> Result<PublicKey, SecretsError> {
    let bytes: [u8; 32] = raw.try_into().map_err(|_| {
        SecretsError::KeySource(format!("{which} public key must be 32 bytes, got {}", raw.len()))
    })?;
    Ok(PublicKey::from(bytes))
}

/// Private counterpart of [`EncryptionKeys`], held by oracle nodes.
///
/// Used here to open requests during local simulation and in tests.
pub struct DecryptionKeys {
    threshold_secret: StaticSecret,
    don_secret: StaticSecret,
}

impl DecryptionKeys {
    /// Generates a fresh random key pair set.
    pub fn generate() -> Self {
        Self {
            threshold_secret: StaticSecret::random_from_rng(OsRng),
            don_secret: StaticSecret::random_from_rng(OsRng),
        }
    }

    /// The matching public keys.
    pub fn public_keys(&self) -> EncryptionKeys {
        EncryptionKeys {
            threshold_public_key: PublicKey::from(&self.threshold_secret),
            don_public_key: PublicKey::from(&self.don_secret),
        }
    }

    /// Decrypts a staged secrets payload back into a bundle.
    pub fn open_payload(&self, payload: &EncryptedSecretsPayload) -> Result<SecretBundle, SecretsError> {
        let envelope = SealedEnvelope::from_bytes(&payload.encrypted_secrets)?;
        let plaintext = envelope.open(&self.threshold_secret, PAYLOAD_CONTEXT)?;
        SecretBundle::from_plaintext_json(&plaintext)
    }

    /// Decrypts the on-chain reference back into the payload locator.
    pub fn open_reference(&self, encrypted_reference: &[u8]) -> Result<Url, SecretsError> {
        let envelope = SealedEnvelope::from_bytes(encrypted_reference)?;
        let plaintext = envelope.open(&self.don_secret, LOCATOR_CONTEXT)?;
        let locator = String::from_utf8(plaintext)
            .map_err(|_| SecretsError::Decryption("locator is not valid UTF-8".into()))?;
        Url::parse(&locator).map_err(|e| SecretsError::Decryption(format!("invalid locator: {e}")))
    }
}

impl fmt::Debug for DecryptionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptionKeys").field("public_keys", &self.public_keys()).finish()
    }
}

/// The document written to the off-chain store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecretsPayload {
    /// Serialized [`SealedEnvelope`] of the secrets JSON.
    #[serde(rename = "encryptedSecrets")]
    pub encrypted_secrets: Bytes,
}

impl EncryptedSecretsPayload {
    /// Encrypts `bundle` for the network described by `keys`.
    pub fn seal(bundle: &SecretBundle, keys: &EncryptionKeys) -> Result<Self, SecretsError> {
        if bundle.is_empty() {
            return Err(SecretsError::InvalidBundle("refusing to stage an empty bundle".into()));
        }
        let plaintext = bundle.to_plaintext_json()?;
        let envelope = SealedEnvelope::seal(&keys.threshold_public_key, PAYLOAD_CONTEXT, &plaintext)?;
        Ok(Self { encrypted_secrets: envelope.to_bytes().into() })
    }
}

/// Encrypts a payload locator for on-chain inclusion.
pub fn seal_reference(locator: &Url, keys: &EncryptionKeys) -> Result<Bytes, SecretsError> {
    let envelope =
        SealedEnvelope::seal(&keys.don_public_key, LOCATOR_CONTEXT, locator.as_str().as_bytes())?;
    Ok(envelope.to_bytes().into())
}

/// An ephemeral-static sealed box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedEnvelope {
    ephemeral_public_key: [u8; 32],
    nonce: [u8; NONCE_SIZE],
    ciphertext: Vec<u8>,
}

impl SealedEnvelope {
    /// Seals `plaintext` to `recipient` under `context`.
    pub fn seal(recipient: &PublicKey, context: &str, plaintext: &[u8]) -> Result<Self, SecretsError> {
        let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_public_key = PublicKey::from(&ephemeral_secret).to_bytes();
        let shared = ephemeral_secret.diffie_hellman(recipient);

        let key = derive_key(shared.as_bytes(), &ephemeral_public_key, context)?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| SecretsError::Encryption(format!("Failed to create cipher: {e}")))?;

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, Payload { msg: plaintext, aad: context.as_bytes() })
            .map_err(|e| SecretsError::Encryption(format!("Encryption failed: {e}")))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(&nonce);
        Ok(Self { ephemeral_public_key, nonce: nonce_bytes, ciphertext })
    }

    /// Opens the envelope with the recipient's secret key.
    pub fn open(&self, recipient: &StaticSecret, context: &str) -> Result<Vec<u8>, SecretsError> {
        let shared = recipient.diffie_hellman(&PublicKey::from(self.ephemeral_public_key));
        let key = derive_key(shared.as_bytes(), &self.ephemeral_public_key, context)?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| SecretsError::Decryption(format!("Failed to create cipher: {e}")))?;

        cipher
            .decrypt(
                Nonce::from_slice(&self.nonce),
                Payload { msg: &self.ciphertext, aad: context.as_bytes() },
            )
            .map_err(|e| SecretsError::Decryption(format!("Decryption failed: {e}")))
    }

    /// Serializes as `ephemeral_pk || nonce || ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + NONCE_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.ephemeral_public_key);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Parses the serialized form produced by [`SealedEnvelope::to_bytes`].
    pub fn from_bytes(raw: &[u8]) -> Result<Self, SecretsError> {
        if raw.len() < 32 + NONCE_SIZE + TAG_SIZE {
            return Err(SecretsError::MalformedEnvelope(format!(
                "envelope too short: {} bytes",
                raw.len()
            )));
        }
        let (pk, rest) = raw.split_at(32);
        let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

        let mut ephemeral_public_key = [0u8; 32];
        ephemeral_public_key.copy_from_slice(pk);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(nonce);
        Ok(Self { ephemeral_public_key, nonce: nonce_bytes, ciphertext: ciphertext.to_vec() })
    }
}

fn derive_key(
    shared_secret: &[u8],
    ephemeral_public_key: &[u8],
    context: &str,
) -> Result<[u8; KEY_SIZE], SecretsError> {
    let hk = Hkdf::<Sha256>::new(Some(ephemeral_public_key), shared_secret);
    let mut derived = [0u8; KEY_SIZE];
    hk.expand(context.as_bytes(), &mut derived)
        .map_err(|_| SecretsError::Encryption("HKDF expansion failed".to_string()))?;
    Ok(derived)
}
