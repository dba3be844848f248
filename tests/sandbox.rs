//! The remote computation run end to end over HTTP stand-ins for the posts and
//! reasoning APIs.

use functions_relay::{
    codec::{DecodedResult, DecodedValue, ReturnType, decode_result},
    config::SandboxConfig,
    sandbox::{DEFAULT_MAX_RESPONSE_BYTES, HttpCapabilities, SandboxInputs, fulfill},
    test_helpers::{create_non_retrying_http_client, test_secrets},
};
use mockito::Matcher;
use url::Url;

const PROMPT: &str = "Flag the violating posts.\n{{POSTS}}\nAnswer in <violating_posts> tags.";

fn capabilities(server: &mockito::Server) -> HttpCapabilities {
    let url = Url::parse(&server.url()).unwrap();
    let config = SandboxConfig {
        posts_api_url: url.clone(),
        reasoning_api_url: url,
        ..Default::default()
    };
    HttpCapabilities::new(config, create_non_retrying_http_client())
}

fn inputs(ids: &[&str]) -> SandboxInputs {
    let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    SandboxInputs::for_posts(PROMPT, &ids, test_secrets())
}

async fn mock_posts(server: &mut mockito::Server) -> mockito::Mock {
    server
        .mock("GET", "/2/tweets")
        .match_query(Matcher::UrlEncoded("ids".into(), "111,222".into()))
        .match_header("authorization", "Bearer t")
        .with_status(200)
        .with_body(r#"{"data":[{"id":"111","text":"buy now"},{"id":"222","text":"hello"}]}"#)
        .create_async()
        .await
}

#[tokio::test]
async fn test_verdict_is_extracted_and_encoded() {
    let mut server = mockito::Server::new_async().await;
    let posts = mock_posts(&mut server).await;
    let reasoning = server
        .mock("POST", "/v1/messages")
        .match_header("x-api-key", "k")
        .match_body(Matcher::Regex("0:\\\\nbuy now\\\\n\\\\n1:\\\\nhello".to_string()))
        .with_status(200)
        .with_body(
            r#"{"content":[{"type":"text","text":"Post 0 is spam.\n<violating_posts>111</violating_posts>"}]}"#,
        )
        .create_async()
        .await;

    let outcome =
        fulfill(&inputs(&["111", "222"]), &capabilities(&server), DEFAULT_MAX_RESPONSE_BYTES).await;

    assert!(outcome.error.is_empty());
    assert_eq!(
        decode_result(&outcome.response, ReturnType::String).unwrap(),
        DecodedResult::Value(DecodedValue::String("111".to_string()))
    );
    posts.assert_async().await;
    reasoning.assert_async().await;
}

#[tokio::test]
async fn test_reasoning_outage_yields_empty_verdict() {
    let mut server = mockito::Server::new_async().await;
    mock_posts(&mut server).await;
    let reasoning = server.mock("POST", "/v1/messages").with_status(500).expect(1).create_async().await;

    let outcome =
        fulfill(&inputs(&["111", "222"]), &capabilities(&server), DEFAULT_MAX_RESPONSE_BYTES).await;

    assert!(outcome.error.is_empty());
    assert!(!outcome.response.is_empty());
    assert_eq!(
        decode_result(&outcome.response, ReturnType::String).unwrap(),
        DecodedResult::Value(DecodedValue::String(String::new()))
    );
    // No retries inside the sandbox.
    reasoning.assert_async().await;
}

#[tokio::test]
async fn test_fetch_failure_is_reported_as_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/2/tweets")
        .match_query(Matcher::Any)
        .with_status(503)
        .expect(1)
        .create_async()
        .await;
    let reasoning = server.mock("POST", "/v1/messages").expect(0).create_async().await;

    let outcome =
        fulfill(&inputs(&["111"]), &capabilities(&server), DEFAULT_MAX_RESPONSE_BYTES).await;

    assert!(outcome.response.is_empty());
    assert!(String::from_utf8_lossy(&outcome.error).contains("503"));
    assert!(decode_result(&outcome.response, ReturnType::String).unwrap().is_empty());
    reasoning.assert_async().await;
}
