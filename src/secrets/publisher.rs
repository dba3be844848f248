//! Stages a [`SecretBundle`] for an oracle request.

use std::sync::Arc;

use alloy::primitives::Bytes;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use url::Url;

use super::{
    EncryptedSecretsPayload, EncryptionKeys, SecretBundle, SecretStore, SecretsError, StoreError,
    seal_reference,
};

/// Errors that abort secret staging.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The network's public keys could not be obtained.
    #[error("Failed to obtain network encryption keys: {0}")]
    Keys(String),

    /// Encrypting the payload or its locator failed.
    #[error(transparent)]
    Secrets(#[from] SecretsError),

    /// The store rejected the upload.
    #[error("Failed to upload encrypted secrets: {0}")]
    Store(#[from] StoreError),
}

/// Supplies the network's current public encryption material.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EncryptionKeySource: Send + Sync {
    /// Returns the keys for the network the request targets.
    async fn encryption_keys(&self) -> Result<EncryptionKeys, PublishError>;
}

/// Where a request's secrets live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretReference {
    /// Node-visible locator of the stored payload.
    pub locator: Url,
    /// The locator sealed for on-chain inclusion.
    pub encrypted_reference: Bytes,
}

/// Encrypts secrets, uploads them and seals the resulting locator.
pub struct SecretPublisher {
    keys: Arc<dyn EncryptionKeySource>,
    store: Arc<dyn SecretStore>,
}

impl SecretPublisher {
    /// Creates a new publisher.
    pub fn new(keys: Arc<dyn EncryptionKeySource>, store: Arc<dyn SecretStore>) -> Self {
        Self { keys, store }
    }

    /// The store payloads are written to.
    pub fn store(&self) -> &Arc<dyn SecretStore> {
        &self.store
    }

    /// Publishes `secrets` and returns their sealed reference.
    ///
    /// Nothing is uploaded unless encryption succeeds, and nothing is returned
    /// unless the upload does.
    #[tracing::instrument(skip(self, secrets), fields(secret_count = secrets.len()), level = "debug")]
    pub async fn publish(&self, secrets: &SecretBundle) -> Result<SecretReference, PublishError> {
        let keys = self.keys.encryption_keys().await?;
        let payload = EncryptedSecretsPayload::seal(secrets, &keys)?;
        tracing::debug!(names = ?secrets.names().collect::<Vec<_>>(), "Secrets encrypted.");

        let locator = self.store.write(&payload).await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to upload encrypted secrets.");
        })?;
        let encrypted_reference = seal_reference(&locator, &keys)?;

        tracing::info!(reference_len = encrypted_reference.len(), "Secrets staged.");
        Ok(SecretReference { locator, encrypted_reference })
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::secrets::{DecryptionKeys, MockEncryptionKeySource, MockSecretStore};

    fn bundle() -> SecretBundle {
        SecretBundle::new([("apiKey", SecretString::from("k".to_string()))]).unwrap()
    }

    fn key_source(keys: EncryptionKeys) -> Arc<dyn EncryptionKeySource> {
        let mut source = MockEncryptionKeySource::new();
        source.expect_encryption_keys().returning(move || Ok(keys));
        Arc::new(source)
    }

    #[tokio::test]
    async fn test_publish_uploads_ciphertext_and_seals_locator() {
        let decryption = DecryptionKeys::generate();
        let locator = Url::parse("https://gist.example/u/1/raw").unwrap();

        let mut store = MockSecretStore::new();
        let returned = locator.clone();
        store.expect_write().times(1).returning(move |_| Ok(returned.clone()));

        let publisher = SecretPublisher::new(key_source(decryption.public_keys()), Arc::new(store));
        let reference = publisher.publish(&bundle()).await.unwrap();

        assert_eq!(reference.locator, locator);
        assert_eq!(decryption.open_reference(&reference.encrypted_reference).unwrap(), locator);
    }

    #[tokio::test]
    async fn test_publish_stores_payload_for_the_bundle() {
        let decryption = DecryptionKeys::generate();
        let public = decryption.public_keys();

        let mut store = MockSecretStore::new();
        store
            .expect_write()
            .withf(move |payload| decryption.open_payload(payload).unwrap() == bundle())
            .returning(|_| Ok(Url::parse("https://gist.example/u/1/raw").unwrap()));

        let publisher = SecretPublisher::new(key_source(public), Arc::new(store));
        publisher.publish(&bundle()).await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_failure_aborts() {
        let mut store = MockSecretStore::new();
        store.expect_write().returning(|_| {
            Err(StoreError::Status { status: 500, body: "boom".to_string() })
        });

        let publisher = SecretPublisher::new(
            key_source(DecryptionKeys::generate().public_keys()),
            Arc::new(store),
        );
        let err = publisher.publish(&bundle()).await.unwrap_err();
        assert!(matches!(err, PublishError::Store(_)));
    }

    #[tokio::test]
    async fn test_key_failure_skips_upload() {
        let mut source = MockEncryptionKeySource::new();
        source
            .expect_encryption_keys()
            .returning(|| Err(PublishError::Keys("rpc down".to_string())));
        let mut store = MockSecretStore::new();
        store.expect_write().never();

        let publisher = SecretPublisher::new(Arc::new(source), Arc::new(store));
        let err = publisher.publish(&bundle()).await.unwrap_err();
        assert!(matches!(err, PublishError::Keys(_)));
    }
}
