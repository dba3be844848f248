//! Side effects available to the sandboxed computation.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest_middleware::ClientWithMiddleware;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use super::SandboxError;
use crate::config::SandboxConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The two external calls a computation may make.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ExternalCapabilities: Send + Sync {
    /// Fetches the text of each post, in the order the API returns them.
    ///
    /// Fails unless every requested post is returned.
    async fn fetch_posts(
        &self,
        ids: &[String],
        bearer_token: &SecretString,
    ) -> Result<Vec<String>, SandboxError>;

    /// Sends a single-message completion and returns the first text block.
    async fn complete(&self, prompt: &str, api_key: &SecretString) -> Result<String, SandboxError>;
}

#[derive(Deserialize)]
struct Post {
    text: String,
}

#[derive(Deserialize)]
struct PostsResponse {
    data: Option<Vec<Post>>,
}

#[derive(Serialize)]
struct ContentBlock<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

/// [`ExternalCapabilities`] over the posts API and a messages-style reasoning API.
pub struct HttpCapabilities {
    client: Arc<ClientWithMiddleware>,
    config: SandboxConfig,
}

impl HttpCapabilities {
    /// Creates capabilities using `client`, which should not retry.
    pub fn new(config: SandboxConfig, client: Arc<ClientWithMiddleware>) -> Self {
        Self { client, config }
    }

    fn join(base: &Url, path: &str) -> Result<Url, SandboxError> {
        base.join(path).map_err(|e| SandboxError::InvalidInput(format!("bad API URL: {e}")))
    }
}

#[async_trait]
impl ExternalCapabilities for HttpCapabilities {
    #[tracing::instrument(skip(self, bearer_token), fields(count = ids.len()), level = "debug")]
    async fn fetch_posts(
        &self,
        ids: &[String],
        bearer_token: &SecretString,
    ) -> Result<Vec<String>, SandboxError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = Self::join(&self.config.posts_api_url, "2/tweets")?;
        let response = self
            .client
            .get(url.as_str())
            .query(&[("ids", ids.join(","))])
            .bearer_auth(bearer_token.expose_secret())
            .send()
            .await
            .map_err(|e| SandboxError::Fetch(format!("posts request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SandboxError::Fetch(format!("posts API returned {status}")));
        }

        let body: PostsResponse = response
            .json()
            .await
            .map_err(|e| SandboxError::Fetch(format!("malformed posts response: {e}")))?;
        let posts: Vec<String> = body
            .data
            .ok_or_else(|| SandboxError::Fetch("posts response has no data".into()))?
            .into_iter()
            .map(|post| post.text)
            .collect();

        if posts.len() != ids.len() {
            return Err(SandboxError::Fetch(format!(
                "posts API returned {} of {} requested posts",
                posts.len(),
                ids.len()
            )));
        }
        Ok(posts)
    }

    #[tracing::instrument(skip(self, prompt, api_key), fields(model = %self.config.model), level = "debug")]
    async fn complete(&self, prompt: &str, api_key: &SecretString) -> Result<String, SandboxError> {
        let url = Self::join(&self.config.reasoning_api_url, "v1/messages")?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key.expose_secret())
                .map_err(|e| SandboxError::Reasoning(format!("invalid API key header: {e}")))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![Message {
                role: "user",
                content: vec![ContentBlock { kind: "text", text: prompt }],
            }],
        };

        let response = self
            .client
            .post(url.as_str())
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| SandboxError::Reasoning(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SandboxError::Reasoning(format!("reasoning API returned {status}")));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| SandboxError::Reasoning(format!("malformed response: {e}")))?;
        body.content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or_else(|| SandboxError::Reasoning("response has no text content".into()))
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;
    use crate::test_helpers::create_non_retrying_http_client;

    fn secret(v: &str) -> SecretString {
        SecretString::from(v.to_string())
    }

    fn capabilities(server: &mockito::Server) -> HttpCapabilities {
        let url = Url::parse(&server.url()).unwrap();
        let config = SandboxConfig {
            posts_api_url: url.clone(),
            reasoning_api_url: url,
            ..Default::default()
        };
        HttpCapabilities::new(config, create_non_retrying_http_client())
    }

    #[tokio::test]
    async fn test_fetch_posts_sends_bearer_and_ids() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/2/tweets")
            .match_query(Matcher::UrlEncoded("ids".into(), "111,222".into()))
            .match_header("authorization", "Bearer t")
            .with_status(200)
            .with_body(
                r#"{"data":[{"id":"111","text":"first"},{"id":"222","text":"second"}]}"#,
            )
            .create_async()
            .await;

        let posts = capabilities(&server)
            .fetch_posts(&["111".into(), "222".into()], &secret("t"))
            .await
            .unwrap();

        assert_eq!(posts, vec!["first".to_string(), "second".to_string()]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_posts_rejects_partial_results() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/2/tweets")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data":[{"id":"111","text":"first"}],"errors":[{"value":"222"}]}"#)
            .create_async()
            .await;

        let result =
            capabilities(&server).fetch_posts(&["111".into(), "222".into()], &secret("t")).await;
        assert!(matches!(result, Err(SandboxError::Fetch(_))));
    }

    #[tokio::test]
    async fn test_fetch_posts_rejects_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/2/tweets")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let result = capabilities(&server).fetch_posts(&["1".into()], &secret("t")).await;
        assert!(matches!(result, Err(SandboxError::Fetch(_))));
    }

    #[tokio::test]
    async fn test_fetch_posts_with_no_ids_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", Matcher::Any).expect(0).create_async().await;

        let posts = capabilities(&server).fetch_posts(&[], &secret("t")).await.unwrap();
        assert!(posts.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_sends_fixed_decoding_parameters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "k")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "claude-3-sonnet-20240229",
                "max_tokens": 1000,
                "temperature": 0.0,
                "messages": [{ "role": "user", "content": [{ "type": "text", "text": "hi" }] }]
            })))
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"<violating_posts>0</violating_posts>"}]}"#)
            .create_async()
            .await;

        let text = capabilities(&server).complete("hi", &secret("k")).await.unwrap();
        assert_eq!(text, "<violating_posts>0</violating_posts>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_error_status_is_reasoning_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/v1/messages").with_status(529).create_async().await;

        let result = capabilities(&server).complete("hi", &secret("k")).await;
        assert!(matches!(result, Err(SandboxError::Reasoning(_))));
    }

    #[tokio::test]
    async fn test_complete_without_content_is_reasoning_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body(r#"{"content":[]}"#)
            .create_async()
            .await;

        let result = capabilities(&server).complete("hi", &secret("k")).await;
        assert!(matches!(result, Err(SandboxError::Reasoning(_))));
    }
}
