//! Shared HTTP clients, one per retry policy.
//!
//! The secret store, the token endpoint and the sandbox capabilities each ask
//! for a client with their own policy. Collaborators with equal policies share
//! one client and its connection pool.

use std::{collections::HashMap, sync::Arc};

use reqwest_middleware::ClientWithMiddleware;
use thiserror::Error;
use tokio::sync::Mutex;

use super::client::create_retryable_http_client;
use crate::config::{BaseHttpClientConfig, HttpRetryConfig};

/// Errors raised while building a pooled client.
#[derive(Debug, Error)]
pub enum HttpClientPoolError {
    /// The underlying `reqwest::Client` could not be built.
    #[error("Failed to create HTTP client: {0}")]
    HttpClientBuildError(String),
}

/// Lazily built HTTP clients keyed by retry policy.
///
/// Every client uses the same [`BaseHttpClientConfig`] connection settings.
pub struct HttpClientPool {
    base_config: BaseHttpClientConfig,
    clients: Mutex<HashMap<HttpRetryConfig, Arc<ClientWithMiddleware>>>,
}

impl HttpClientPool {
    /// Creates an empty pool with default connection settings.
    pub fn new() -> Self {
        Self::with_base_config(BaseHttpClientConfig::default())
    }

    /// Creates an empty pool with the given connection settings.
    pub fn with_base_config(base_config: BaseHttpClientConfig) -> Self {
        Self { base_config, clients: Mutex::new(HashMap::new()) }
    }

    /// The client for `retry_policy`, built on first use.
    pub async fn get_or_create(
        &self,
        retry_policy: &HttpRetryConfig,
    ) -> Result<Arc<ClientWithMiddleware>, HttpClientPoolError> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(retry_policy) {
            return Ok(Arc::clone(client));
        }

        let base_client = self.base_config.client_builder().build().map_err(|e| {
            tracing::error!(error = %e, "Failed to build HTTP client.");
            HttpClientPoolError::HttpClientBuildError(e.to_string())
        })?;
        let client = Arc::new(create_retryable_http_client(retry_policy, base_client));
        clients.insert(retry_policy.clone(), Arc::clone(&client));
        tracing::debug!(max_retries = retry_policy.max_retries, "HTTP client created.");
        Ok(client)
    }

    /// Number of distinct clients built so far.
    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Whether no client has been built yet.
    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }
}

impl Default for HttpClientPool {
    fn default() -> Self {
        Self::new()
    }
}
