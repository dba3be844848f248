use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use super::deserialize_optional_secret;

fn default_gist_api_url() -> Url {
    Url::parse("https://api.github.com").expect("static URL is valid")
}

fn default_posts_token_url() -> Url {
    Url::parse("https://api.twitter.com/oauth2/token").expect("static URL is valid")
}

/// Where encrypted secrets are staged for the oracle nodes.
#[derive(Debug, Deserialize, Clone)]
pub struct SecretStoreConfig {
    /// Base URL of the gist API.
    #[serde(default = "default_gist_api_url")]
    pub gist_api_url: Url,
}

impl Default for SecretStoreConfig {
    fn default() -> Self {
        Self { gist_api_url: default_gist_api_url() }
    }
}

/// Sensitive values. Normally supplied through `FUNCTIONS__CREDENTIALS__*`
/// environment variables rather than the YAML file.
///
/// Every field is optional at load time; commands that need one fail with
/// [`CredentialsConfig::require`] when it is absent.
#[derive(Debug, Deserialize, Clone)]
pub struct CredentialsConfig {
    /// Hex-encoded wallet private key used to sign transactions.
    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub private_key: Option<SecretString>,

    /// Token allowed to create gists.
    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub gist_token: Option<SecretString>,

    /// Reasoning API key, shipped to the oracle as the `apiKey` secret.
    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub reasoning_api_key: Option<SecretString>,

    /// Posts API consumer key used for the client-credentials exchange.
    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub posts_api_key: Option<SecretString>,

    /// Posts API consumer secret used for the client-credentials exchange.
    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub posts_api_secret: Option<SecretString>,

    /// OAuth2 token endpoint of the posts API.
    #[serde(default = "default_posts_token_url")]
    pub posts_token_url: Url,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            private_key: None,
            gist_token: None,
            reasoning_api_key: None,
            posts_api_key: None,
            posts_api_secret: None,
            posts_token_url: default_posts_token_url(),
        }
    }
}

impl CredentialsConfig {
    /// Returns the credential or a config error naming the missing field.
    pub fn require<'a>(
        field: &'a Option<SecretString>,
        name: &str,
    ) -> Result<&'a SecretString, config::ConfigError> {
        field.as_ref().ok_or_else(|| {
            config::ConfigError::Message(format!(
                "credential '{name}' is not set (FUNCTIONS__CREDENTIALS__{})",
                name.to_uppercase()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_require_reports_missing_credential() {
        let creds = CredentialsConfig::default();
        let err = CredentialsConfig::require(&creds.gist_token, "gist_token").unwrap_err();
        assert!(err.to_string().contains("FUNCTIONS__CREDENTIALS__GIST_TOKEN"));
    }

    #[test]
    fn test_require_returns_present_credential() {
        let creds = CredentialsConfig {
            private_key: Some(SecretString::from("0xabc".to_string())),
            ..Default::default()
        };
        let key = CredentialsConfig::require(&creds.private_key, "private_key").unwrap();
        assert_eq!(key.expose_secret(), "0xabc");
    }

    #[test]
    fn test_debug_output_redacts_values() {
        let creds = CredentialsConfig {
            gist_token: Some(SecretString::from("ghp_secret".to_string())),
            ..Default::default()
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("ghp_secret"));
    }
}
