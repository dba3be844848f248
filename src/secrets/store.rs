//! Off-chain storage for encrypted secrets payloads.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest_middleware::ClientWithMiddleware;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::EncryptedSecretsPayload;

/// Errors returned by a [`SecretStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never got a response.
    #[error("Store request failed: {0}")]
    Http(#[from] reqwest_middleware::Error),

    /// The response body could not be read.
    #[error("Failed to read store response: {0}")]
    Body(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("Store returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The store's answer did not have the expected shape.
    #[error("Unexpected store response: {0}")]
    InvalidResponse(String),

    /// The locator does not point into this store.
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),
}

/// A write-once blob host reachable by the oracle nodes.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Persists the payload and returns the locator nodes will fetch it from.
    async fn write(&self, payload: &EncryptedSecretsPayload) -> Result<Url, StoreError>;

    /// Fetches a previously written payload.
    async fn read(&self, locator: &Url) -> Result<EncryptedSecretsPayload, StoreError>;

    /// Removes a payload once it is no longer needed.
    async fn delete(&self, locator: &Url) -> Result<(), StoreError>;
}

#[derive(Serialize)]
struct GistFile {
    content: String,
}

#[derive(Serialize)]
struct CreateGist {
    description: &'static str,
    public: bool,
    files: HashMap<String, GistFile>,
}

#[derive(Deserialize)]
struct GistCreated {
    html_url: Url,
}

/// A [`SecretStore`] backed by private GitHub gists.
///
/// The gist's raw URL is the locator. Gists are secret but not access
/// controlled: anyone holding the raw URL can read the ciphertext.
pub struct GistStore {
    api_url: Url,
    token: SecretString,
    client: Arc<ClientWithMiddleware>,
}

impl GistStore {
    /// Creates a store talking to the gist API at `api_url`.
    pub fn new(api_url: Url, token: SecretString, client: Arc<ClientWithMiddleware>) -> Self {
        Self { api_url, token, client }
    }

    fn headers(&self) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("token {}", self.token.expose_secret()))
            .map_err(|e| StoreError::InvalidResponse(format!("invalid token header: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("functions-relay"));
        Ok(headers)
    }

    fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        self.api_url
            .join(path)
            .map_err(|e| StoreError::InvalidLocator(format!("cannot build gist API URL: {e}")))
    }

    /// Extracts the gist id from `<html_url>/raw`.
    fn gist_id(locator: &Url) -> Result<String, StoreError> {
        let segments: Vec<&str> =
            locator.path_segments().map(|s| s.filter(|p| !p.is_empty()).collect()).unwrap_or_default();
        match segments.as_slice() {
            [.., id, "raw"] => Ok((*id).to_string()),
            _ => Err(StoreError::InvalidLocator(locator.to_string())),
        }
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status { status: status.as_u16(), body })
}

#[async_trait]
impl SecretStore for GistStore {
    #[tracing::instrument(skip(self, payload), level = "debug")]
    async fn write(&self, payload: &EncryptedSecretsPayload) -> Result<Url, StoreError> {
        let content = serde_json::to_string(payload)
            .map_err(|e| StoreError::InvalidResponse(format!("cannot serialize payload: {e}")))?;
        let file_name = format!(
            "encrypted-functions-request-data-{}.json",
            chrono::Utc::now().timestamp_millis()
        );
        let body = CreateGist {
            description: "Encrypted secrets for an oracle request",
            public: false,
            files: HashMap::from([(file_name.clone(), GistFile { content })]),
        };

        let response = self
            .client
            .post(self.endpoint("gists")?.as_str())
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;
        let created: GistCreated = ensure_success(response).await?.json().await?;

        let locator = Url::parse(&format!("{}/raw", created.html_url.as_str().trim_end_matches('/')))
            .map_err(|e| StoreError::InvalidResponse(format!("bad html_url: {e}")))?;
        tracing::debug!(file_name = %file_name, locator = %locator, "Encrypted secrets written to gist.");
        Ok(locator)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn read(&self, locator: &Url) -> Result<EncryptedSecretsPayload, StoreError> {
        let response = self.client.get(locator.as_str()).send().await?;
        let text = ensure_success(response).await?.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| StoreError::InvalidResponse(format!("not an encrypted payload: {e}")))
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn delete(&self, locator: &Url) -> Result<(), StoreError> {
        let id = Self::gist_id(locator)?;
        let response = self
            .client
            .delete(self.endpoint(&format!("gists/{id}"))?.as_str())
            .headers(self.headers()?)
            .send()
            .await?;
        ensure_success(response).await?;
        tracing::debug!(gist_id = %id, "Gist deleted.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;
    use crate::test_helpers::create_test_http_client;

    fn payload() -> EncryptedSecretsPayload {
        EncryptedSecretsPayload { encrypted_secrets: vec![0xde, 0xad, 0xbe, 0xef].into() }
    }

    fn store(server: &mockito::Server) -> GistStore {
        GistStore::new(
            Url::parse(&server.url()).unwrap(),
            SecretString::from("ghp_test".to_string()),
            create_test_http_client(),
        )
    }

    #[tokio::test]
    async fn test_write_creates_private_gist_and_returns_raw_locator() {
        let mut server = mockito::Server::new_async().await;
        let html_url = format!("{}/someone/abc123", server.url());
        let mock = server
            .mock("POST", "/gists")
            .match_header("authorization", "token ghp_test")
            .match_body(Matcher::PartialJson(serde_json::json!({ "public": false })))
            .with_status(201)
            .with_body(serde_json::json!({ "id": "abc123", "html_url": html_url }).to_string())
            .create_async()
            .await;

        let locator = store(&server).write(&payload()).await.unwrap();

        assert_eq!(locator.as_str(), format!("{html_url}/raw"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_write_names_file_after_request_data() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/gists")
            .match_body(Matcher::Regex("encrypted-functions-request-data-[0-9]+\\.json".into()))
            .with_status(201)
            .with_body(
                serde_json::json!({ "html_url": format!("{}/u/1", server.url()) }).to_string(),
            )
            .create_async()
            .await;

        store(&server).write(&payload()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_write_surfaces_rejection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/gists")
            .with_status(401)
            .with_body("Bad credentials")
            .create_async()
            .await;

        let err = store(&server).write(&payload()).await.unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_read_returns_written_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/someone/abc123/raw")
            .with_status(200)
            .with_body(serde_json::to_string(&payload()).unwrap())
            .create_async()
            .await;

        let locator = Url::parse(&format!("{}/someone/abc123/raw", server.url())).unwrap();
        assert_eq!(store(&server).read(&locator).await.unwrap(), payload());
    }

    #[tokio::test]
    async fn test_read_rejects_foreign_document() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/x/y/raw").with_status(200).with_body("{}").create_async().await;

        let locator = Url::parse(&format!("{}/x/y/raw", server.url())).unwrap();
        let err = store(&server).read(&locator).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_delete_targets_gist_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/gists/abc123")
            .match_header("authorization", "token ghp_test")
            .with_status(204)
            .create_async()
            .await;

        let locator = Url::parse("https://gist.github.com/someone/abc123/raw").unwrap();
        store(&server).delete(&locator).await.unwrap();
        mock.assert_async().await;
    }

    #[test]
    fn test_gist_id_requires_raw_suffix() {
        let bad = Url::parse("https://gist.github.com/someone/abc123").unwrap();
        assert!(matches!(GistStore::gist_id(&bad), Err(StoreError::InvalidLocator(_))));
    }
}
