//! OAuth2 client-credentials exchange for the posts API bearer token.

use reqwest_middleware::ClientWithMiddleware;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use super::SecretsError;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Exchanges an API key/secret pair for an application bearer token.
#[tracing::instrument(skip(client, api_key, api_secret), level = "debug")]
pub async fn fetch_bearer_token(
    client: &ClientWithMiddleware,
    token_url: &Url,
    api_key: &SecretString,
    api_secret: &SecretString,
) -> Result<SecretString, SecretsError> {
    let response = client
        .post(token_url.as_str())
        .basic_auth(api_key.expose_secret(), Some(api_secret.expose_secret()))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        tracing::error!(status = %status, "Bearer token exchange rejected.");
        return Err(SecretsError::TokenExchange(format!("token endpoint returned {status}")));
    }

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| SecretsError::TokenExchange(format!("unreadable token response: {e}")))?;

    match body.access_token {
        Some(token) if !token.is_empty() => {
            tracing::debug!("Bearer token obtained.");
            Ok(SecretString::from(token))
        }
        _ => Err(SecretsError::TokenExchange("response carried no access_token".to_string())),
    }
}
