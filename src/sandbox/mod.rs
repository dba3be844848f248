//! The single-shot computation oracle nodes run for each request.
//!
//! [`invoke`] is a pure function of its [`SandboxInputs`] and the injected
//! [`ExternalCapabilities`]. Nothing survives between invocations.

mod capabilities;
mod extract;
mod inputs;
mod prompt;

use alloy::primitives::Bytes;
use thiserror::Error;

pub use capabilities::{ExternalCapabilities, HttpCapabilities};
#[cfg(test)]
pub use capabilities::MockExternalCapabilities;
pub use extract::extract_tag;
pub use inputs::{SandboxInputs, encode_content_ids};
pub use prompt::{POSTS_PLACEHOLDER, compose_prompt, render_posts};

use crate::{
    codec::EncodedResult,
    secrets::{API_KEY_SECRET, BEARER_TOKEN_SECRET},
};

/// Tag the reasoning response is expected to wrap its verdict in.
pub const VERDICT_TAG: &str = "violating_posts";

/// Text used in place of the reasoning response when the call fails.
pub const REASONING_FAILURE_TEXT: &str = "Error calling reasoning API";

/// Largest encoded response the network accepts by default.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 256;

/// Errors raised inside the computation.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The arguments did not match the expected schema.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A secret the computation needs was not supplied.
    #[error("Missing secret '{0}'")]
    MissingSecret(&'static str),

    /// Fetching external data failed. Fatal to the invocation.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The reasoning API call failed. Never fatal to [`invoke`].
    #[error("Reasoning API call failed: {0}")]
    Reasoning(String),

    /// The encoded result exceeds what the network will carry back.
    #[error("Response of {len} bytes exceeds the {max} byte limit")]
    ResponseTooLarge {
        /// Encoded length.
        len: usize,
        /// Configured limit.
        max: usize,
    },
}

/// What the network reports back for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentResult {
    /// Encoded value; empty when the computation failed.
    pub response: Bytes,
    /// UTF-8 error message; empty when the computation succeeded.
    pub error: Bytes,
}

/// Runs the computation once.
///
/// A fetch failure aborts with an error. A reasoning failure does not: the
/// failure text is used instead and the (empty) extracted verdict is encoded.
/// An encoded result longer than `max_response_bytes` is an error.
#[tracing::instrument(skip_all, level = "debug")]
pub async fn invoke(
    inputs: &SandboxInputs,
    capabilities: &dyn ExternalCapabilities,
    max_response_bytes: usize,
) -> Result<EncodedResult, SandboxError> {
    let content_ids = inputs.content_ids()?;
    let template = inputs.prompt_template()?;
    let bearer_token = inputs
        .secrets()
        .get(BEARER_TOKEN_SECRET)
        .ok_or(SandboxError::MissingSecret(BEARER_TOKEN_SECRET))?;
    let api_key =
        inputs.secrets().get(API_KEY_SECRET).ok_or(SandboxError::MissingSecret(API_KEY_SECRET))?;

    let posts = capabilities.fetch_posts(&content_ids, bearer_token).await.inspect_err(|e| {
        tracing::error!(error = %e, "Failed to fetch posts.");
    })?;
    tracing::debug!(count = posts.len(), "Posts fetched.");

    let prompt = compose_prompt(template, &posts);
    let response = match capabilities.complete(&prompt, api_key).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "Reasoning call failed, continuing with failure text.");
            REASONING_FAILURE_TEXT.to_string()
        }
    };

    let verdict = extract_tag(&response, VERDICT_TAG);
    tracing::debug!(verdict_len = verdict.len(), "Verdict extracted.");
    let encoded = EncodedResult::string(verdict);
    let len = encoded.as_bytes().len();
    if len > max_response_bytes {
        tracing::error!(len, max = max_response_bytes, "Verdict too large to return.");
        return Err(SandboxError::ResponseTooLarge { len, max: max_response_bytes });
    }
    Ok(encoded)
}

/// Runs the computation and packages the outcome the way the callback carries it.
pub async fn fulfill(
    inputs: &SandboxInputs,
    capabilities: &dyn ExternalCapabilities,
    max_response_bytes: usize,
) -> FulfillmentResult {
    match invoke(inputs, capabilities, max_response_bytes).await {
        Ok(result) => FulfillmentResult { response: result.into_bytes(), error: Bytes::new() },
        Err(e) => FulfillmentResult {
            response: Bytes::new(),
            error: Bytes::from(e.to_string().into_bytes()),
        },
    }
}

#[cfg(test)]
mod tests {
    use secrecy::{ExposeSecret, SecretString};

    use super::*;
    use crate::{
        codec::{DecodedResult, DecodedValue, ReturnType, decode_result},
        secrets::SecretBundle,
    };

    fn secrets() -> SecretBundle {
        SecretBundle::new([
            (API_KEY_SECRET, SecretString::from("k".to_string())),
            (BEARER_TOKEN_SECRET, SecretString::from("t".to_string())),
        ])
        .unwrap()
    }

    fn inputs() -> SandboxInputs {
        SandboxInputs::for_posts("Posts:\n{{POSTS}}", &["111".to_string()], secrets())
    }

    #[tokio::test]
    async fn test_invoke_returns_extracted_verdict() {
        let mut caps = MockExternalCapabilities::new();
        caps.expect_fetch_posts()
            .withf(|ids, token| ids.len() == 1 && ids[0] == "111" && token.expose_secret() == "t")
            .returning(|_, _| Ok(vec!["hello".to_string()]));
        caps.expect_complete()
            .withf(|prompt, key| prompt == "Posts:\n0:\nhello\n" && key.expose_secret() == "k")
            .returning(|_, _| Ok("<violating_posts>111</violating_posts>".to_string()));

        let result = invoke(&inputs(), &caps, DEFAULT_MAX_RESPONSE_BYTES).await.unwrap();
        assert_eq!(result, EncodedResult::string("111"));
    }

    #[tokio::test]
    async fn test_reasoning_failure_still_encodes_a_value() {
        let mut caps = MockExternalCapabilities::new();
        caps.expect_fetch_posts().returning(|_, _| Ok(vec!["hello".to_string()]));
        caps.expect_complete()
            .returning(|_, _| Err(SandboxError::Reasoning("timeout".to_string())));

        let result = invoke(&inputs(), &caps, DEFAULT_MAX_RESPONSE_BYTES).await.unwrap();
        assert_eq!(result, EncodedResult::string(""));
        assert_eq!(
            decode_result(result.as_bytes(), ReturnType::String).unwrap(),
            DecodedResult::Value(DecodedValue::String(String::new()))
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_is_fatal_and_skips_reasoning() {
        let mut caps = MockExternalCapabilities::new();
        caps.expect_fetch_posts()
            .returning(|_, _| Err(SandboxError::Fetch("posts API returned 500".to_string())));
        caps.expect_complete().never();

        let result = invoke(&inputs(), &caps, DEFAULT_MAX_RESPONSE_BYTES).await;
        assert!(matches!(result, Err(SandboxError::Fetch(_))));
    }

    #[tokio::test]
    async fn test_fetch_failure_fulfills_with_empty_response() {
        let mut caps = MockExternalCapabilities::new();
        caps.expect_fetch_posts()
            .returning(|_, _| Err(SandboxError::Fetch("posts API returned 500".to_string())));

        let fulfillment = fulfill(&inputs(), &caps, DEFAULT_MAX_RESPONSE_BYTES).await;
        assert!(fulfillment.response.is_empty());
        assert!(!fulfillment.error.is_empty());
        assert_eq!(
            decode_result(&fulfillment.response, ReturnType::String).unwrap(),
            DecodedResult::Empty
        );
    }

    #[tokio::test]
    async fn test_missing_secret_is_fatal() {
        let mut caps = MockExternalCapabilities::new();
        caps.expect_fetch_posts().never();
        let inputs = SandboxInputs::for_posts("{{POSTS}}", &["1".to_string()], SecretBundle::default());

        let result = invoke(&inputs, &caps, DEFAULT_MAX_RESPONSE_BYTES).await;
        assert!(matches!(result, Err(SandboxError::MissingSecret(BEARER_TOKEN_SECRET))));
    }

    #[tokio::test]
    async fn test_prompt_lists_posts_in_response_order() {
        let mut caps = MockExternalCapabilities::new();
        caps.expect_fetch_posts()
            .returning(|_, _| Ok(vec!["b".to_string(), "a".to_string(), "c".to_string()]));
        caps.expect_complete()
            .withf(|prompt, _| prompt == "0:\nb\n\n1:\na\n\n2:\nc\n")
            .returning(|_, _| Ok("no verdict".to_string()));

        let ids = ["1", "2", "3"].map(String::from);
        let inputs = SandboxInputs::for_posts("{{POSTS}}", &ids, secrets());
        let result = invoke(&inputs, &caps, DEFAULT_MAX_RESPONSE_BYTES).await.unwrap();
        assert_eq!(result, EncodedResult::string(""));
    }

    #[tokio::test]
    async fn test_oversized_verdict_fulfills_with_error() {
        let mut caps = MockExternalCapabilities::new();
        caps.expect_fetch_posts().returning(|_, _| Ok(vec!["hello".to_string()]));
        let ids = (0..60).map(|i| (1_000 + i).to_string()).collect::<Vec<_>>().join(",");
        caps.expect_complete()
            .returning(move |_, _| Ok(format!("<violating_posts>{ids}</violating_posts>")));

        let result = invoke(&inputs(), &caps, DEFAULT_MAX_RESPONSE_BYTES).await;
        assert!(matches!(
            result,
            Err(SandboxError::ResponseTooLarge { len, max: DEFAULT_MAX_RESPONSE_BYTES }) if len > 256
        ));

        let fulfillment = fulfill(&inputs(), &caps, DEFAULT_MAX_RESPONSE_BYTES).await;
        assert!(fulfillment.response.is_empty());
        assert!(String::from_utf8_lossy(&fulfillment.error).contains("256 byte limit"));
    }
}
