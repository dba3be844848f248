//! Secrets staged through the gist store, then read back the way a node would.

use std::sync::{Arc, Mutex};

use functions_relay::{
    secrets::{GistStore, SecretPublisher, SecretStore, fetch_bearer_token},
    test_helpers::{StaticKeySource, create_test_http_client, test_decryption_keys, test_secrets},
};
use mockito::Matcher;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

#[tokio::test]
async fn test_published_secrets_are_readable_by_the_network_only() {
    let mut server = mockito::Server::new_async().await;
    let html_url = format!("{}/octo/abc123", server.url());
    let uploaded = Arc::new(Mutex::new(String::new()));

    let captured = Arc::clone(&uploaded);
    let create = server
        .mock("POST", "/gists")
        .match_header("authorization", "token ghp_test")
        .match_body(Matcher::PartialJson(serde_json::json!({ "public": false })))
        .with_status(201)
        .with_body_from_request(move |request| {
            let body: serde_json::Value =
                serde_json::from_slice(request.body().unwrap()).unwrap();
            let content = body["files"]
                .as_object()
                .and_then(|files| files.values().next())
                .and_then(|file| file["content"].as_str())
                .unwrap()
                .to_string();
            *captured.lock().unwrap() = content;
            serde_json::json!({ "id": "abc123", "html_url": html_url }).to_string().into_bytes()
        })
        .create_async()
        .await;

    let served = Arc::clone(&uploaded);
    server
        .mock("GET", "/octo/abc123/raw")
        .with_status(200)
        .with_body_from_request(move |_| served.lock().unwrap().clone().into_bytes())
        .create_async()
        .await;

    let keys = test_decryption_keys();
    let store = Arc::new(GistStore::new(
        Url::parse(&server.url()).unwrap(),
        SecretString::from("ghp_test".to_string()),
        create_test_http_client(),
    ));
    let publisher = SecretPublisher::new(Arc::new(StaticKeySource(keys.public_keys())), store.clone());

    let reference = publisher.publish(&test_secrets()).await.unwrap();
    create.assert_async().await;
    assert!(reference.locator.as_str().ends_with("/octo/abc123/raw"));
    assert!(!uploaded.lock().unwrap().contains("\"k\""));

    let locator = keys.open_reference(&reference.encrypted_reference).unwrap();
    assert_eq!(locator, reference.locator);
    let secrets = keys.open_payload(&store.read(&locator).await.unwrap()).unwrap();
    assert_eq!(secrets.get("apiKey").unwrap().expose_secret(), "k");
    assert_eq!(secrets.get("bearerToken").unwrap().expose_secret(), "t");

    // Keys of another network cannot open the reference.
    assert!(test_decryption_keys().open_reference(&reference.encrypted_reference).is_err());
}

#[tokio::test]
async fn test_bearer_token_exchange_feeds_the_bundle() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/oauth2/token")
        .match_body(Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()))
        .with_status(200)
        .with_body(r#"{"token_type":"bearer","access_token":"AAAA"}"#)
        .create_async()
        .await;

    let token_url = Url::parse(&format!("{}/oauth2/token", server.url())).unwrap();
    let token = fetch_bearer_token(
        &create_test_http_client(),
        &token_url,
        &SecretString::from("key".to_string()),
        &SecretString::from("secret".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(token.expose_secret(), "AAAA");
}
