//! Secret staging fakes.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::Mutex;
use url::Url;

use crate::secrets::{
    API_KEY_SECRET, BEARER_TOKEN_SECRET, DecryptionKeys, EncryptedSecretsPayload, EncryptionKeySource,
    EncryptionKeys, PublishError, SecretBundle, SecretStore, StoreError,
};

/// The bundle `{apiKey: "k", bearerToken: "t"}`.
pub fn test_secrets() -> SecretBundle {
    SecretBundle::new([
        (API_KEY_SECRET, SecretString::from("k".to_string())),
        (BEARER_TOKEN_SECRET, SecretString::from("t".to_string())),
    ])
    .expect("static bundle is valid")
}

/// A fresh set of network decryption keys.
pub fn test_decryption_keys() -> DecryptionKeys {
    DecryptionKeys::generate()
}

/// An [`EncryptionKeySource`] returning fixed keys.
pub struct StaticKeySource(pub EncryptionKeys);

#[async_trait]
impl EncryptionKeySource for StaticKeySource {
    async fn encryption_keys(&self) -> Result<EncryptionKeys, PublishError> {
        Ok(self.0)
    }
}

/// A [`SecretStore`] that keeps payloads in memory under
/// `memory://secrets/<n>` locators.
#[derive(Default)]
pub struct InMemorySecretStore {
    payloads: Mutex<HashMap<Url, EncryptedSecretsPayload>>,
    writes: AtomicUsize,
}

impl InMemorySecretStore {
    /// Number of payloads currently stored.
    pub async fn len(&self) -> usize {
        self.payloads.lock().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.payloads.lock().await.is_empty()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn write(&self, payload: &EncryptedSecretsPayload) -> Result<Url, StoreError> {
        let index = self.writes.fetch_add(1, Ordering::Relaxed);
        let locator = Url::parse(&format!("memory://secrets/{index}"))
            .map_err(|e| StoreError::InvalidLocator(e.to_string()))?;
        self.payloads.lock().await.insert(locator.clone(), payload.clone());
        Ok(locator)
    }

    async fn read(&self, locator: &Url) -> Result<EncryptedSecretsPayload, StoreError> {
        self.payloads
            .lock()
            .await
            .get(locator)
            .cloned()
            .ok_or_else(|| StoreError::Status { status: 404, body: locator.to_string() })
    }

    async fn delete(&self, locator: &Url) -> Result<(), StoreError> {
        self.payloads.lock().await.remove(locator);
        Ok(())
    }
}
