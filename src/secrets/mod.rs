//! Staging of request secrets.
//!
//! A [`SecretBundle`] is encrypted for the oracle network, written to an
//! off-chain [`SecretStore`], and the resulting locator is encrypted a second
//! time so it can be placed on-chain without revealing where the secrets live.

mod bearer;
mod bundle;
mod crypto;
mod publisher;
mod store;

pub use bearer::fetch_bearer_token;
pub use bundle::{API_KEY_SECRET, BEARER_TOKEN_SECRET, SecretBundle};
pub use crypto::{
    DecryptionKeys, EncryptedSecretsPayload, EncryptionKeys, LOCATOR_CONTEXT, PAYLOAD_CONTEXT,
    SealedEnvelope, seal_reference,
};
pub use publisher::{EncryptionKeySource, PublishError, SecretPublisher, SecretReference};
pub use store::{GistStore, SecretStore, StoreError};

#[cfg(test)]
pub use publisher::MockEncryptionKeySource;
#[cfg(test)]
pub use store::MockSecretStore;

use thiserror::Error;

/// Errors produced while building, encrypting or decrypting secrets.
#[derive(Debug, Error)]
pub enum SecretsError {
    /// The bundle itself is malformed.
    #[error("Invalid secret bundle: {0}")]
    InvalidBundle(String),

    /// Encryption failed.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Decryption failed, usually a wrong key or context.
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// The envelope bytes could not be parsed.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The network's encryption keys are unusable.
    #[error("Invalid network key: {0}")]
    KeySource(String),

    /// The bearer-token endpoint refused the exchange.
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// Transport failure while talking to a credential endpoint.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest_middleware::Error),

    /// The plaintext JSON could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
