use serde::Deserialize;
use url::Url;

use super::HttpRetryConfig;

fn default_posts_api_url() -> Url {
    Url::parse("https://api.twitter.com").expect("static URL is valid")
}

fn default_reasoning_api_url() -> Url {
    Url::parse("https://api.anthropic.com").expect("static URL is valid")
}

fn default_model() -> String {
    "claude-3-sonnet-20240229".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_max_response_bytes() -> usize {
    crate::sandbox::DEFAULT_MAX_RESPONSE_BYTES
}

fn default_sandbox_retry() -> HttpRetryConfig {
    HttpRetryConfig::no_retries()
}

/// Endpoints and decoding parameters used by the sandboxed computation.
#[derive(Debug, Deserialize, Clone)]
pub struct SandboxConfig {
    /// Base URL of the posts API (`GET /2/tweets`).
    #[serde(default = "default_posts_api_url")]
    pub posts_api_url: Url,

    /// Base URL of the reasoning API (`POST /v1/messages`).
    #[serde(default = "default_reasoning_api_url")]
    pub reasoning_api_url: Url,

    /// Model requested from the reasoning API.
    #[serde(default = "default_model")]
    pub model: String,

    /// Upper bound on generated tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature. Kept at zero for reproducible verdicts.
    #[serde(default)]
    pub temperature: f32,

    /// Largest encoded result the network carries back to the consumer.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,

    /// Retry policy for sandbox HTTP calls. The sandbox never retries by default.
    #[serde(default = "default_sandbox_retry")]
    pub http_retry_config: HttpRetryConfig,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            posts_api_url: default_posts_api_url(),
            reasoning_api_url: default_reasoning_api_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            max_response_bytes: default_max_response_bytes(),
            http_retry_config: default_sandbox_retry(),
        }
    }
}
