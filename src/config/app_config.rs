use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use url::Url;

use super::{
    BaseHttpClientConfig, CredentialsConfig, HttpRetryConfig, ListenerConfig, NetworkConfig,
    RpcRetryConfig, SandboxConfig, SecretStoreConfig, SubmissionConfig, deserialize_urls,
};

/// Provides the default value for database_url.
fn default_database_url() -> String {
    "sqlite:functions-relay.db".to_string()
}

/// Application configuration for the request relay.
///
/// Built once at process start and handed to each component; no component
/// reads the environment on its own.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// RPC URLs of the chain hosting the oracle router.
    #[serde(deserialize_with = "deserialize_urls")]
    pub rpc_urls: Vec<Url>,

    /// Retry configuration for RPC calls.
    #[serde(default)]
    pub rpc_retry_config: RpcRetryConfig,

    /// Configuration for HTTP client retry policies.
    #[serde(default)]
    pub http_retry_config: HttpRetryConfig,

    /// Configuration for the base HTTP client.
    #[serde(default)]
    pub http_base_config: BaseHttpClientConfig,

    /// Database URL for the submission ledger.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Oracle network addresses and identifiers.
    pub network: NetworkConfig,

    /// On-chain submission settings.
    #[serde(default)]
    pub submission: SubmissionConfig,

    /// Callback listener settings.
    #[serde(default)]
    pub listener: ListenerConfig,

    /// Sandboxed computation settings, used by local simulation.
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// Off-chain secret store settings.
    #[serde(default)]
    pub secret_store: SecretStoreConfig,

    /// Keys and tokens.
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

impl AppConfig {
    /// Creates a new `AppConfig` by reading from the configuration directory.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir_str = config_dir.unwrap_or("configs");
        let app_yaml = Path::new(config_dir_str).join("app.yaml");
        let s = Config::builder()
            .add_source(File::from(app_yaml))
            .add_source(Environment::with_prefix("FUNCTIONS").separator("__"))
            .build()?;
        let config: Self = s.try_deserialize()?;

        if config.rpc_urls.is_empty() {
            return Err(ConfigError::Message("rpc_urls cannot be empty".to_string()));
        }
        config.network.don_id_bytes().map_err(ConfigError::Message)?;

        Ok(config)
    }

    /// Creates a new `AppConfigBuilder` for testing purposes.
    #[cfg(test)]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

/// A builder for creating `AppConfig` instances for testing.
#[cfg(test)]
#[derive(Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn rpc_urls(mut self, rpc_urls: Vec<Url>) -> Self {
        self.config.rpc_urls = rpc_urls;
        self
    }

    pub fn don_id(mut self, don_id: &str) -> Self {
        self.config.network.don_id = don_id.to_string();
        self
    }

    pub fn subscription_id(mut self, id: u64) -> Self {
        self.config.network.subscription_id = id;
        self
    }

    pub fn database_url(mut self, url: &str) -> Self {
        self.config.database_url = url.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use alloy::primitives::address;

    const BASE_CONFIG: &str = r#"
        rpc_urls:
          - "http://localhost:8545"
        network:
          router_address: "0xf9B8fc078197181C841c296C876945aaa425B278"
          link_token_address: "0xE4aB69C077896252FAFBD49EFD26B5D171A32410"
          consumer_address: "0x0000000000000000000000000000000000000abc"
          don_id: "fun-base-sepolia-1"
          subscription_id: 77
        "#;

    fn write_config(content: &str) -> tempfile::TempDir {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("app.yaml"), content).unwrap();
        temp_dir
    }

    #[test]
    fn test_app_config_builder() {
        let config = AppConfig::builder()
            .rpc_urls(vec![Url::parse("http://localhost:8545").unwrap()])
            .don_id("fun-test-1")
            .subscription_id(9)
            .database_url("sqlite::memory:")
            .build();

        assert_eq!(config.rpc_urls.len(), 1);
        assert_eq!(config.network.don_id, "fun-test-1");
        assert_eq!(config.network.subscription_id, 9);
        assert_eq!(config.database_url, "sqlite::memory:");
    }

    #[test]
    fn test_app_config_from_file() {
        let temp_dir = write_config(BASE_CONFIG);
        let config = AppConfig::new(Some(temp_dir.path().to_str().unwrap())).unwrap();

        assert_eq!(config.rpc_urls.len(), 1);
        assert_eq!(config.database_url, "sqlite:functions-relay.db");
        assert_eq!(config.network.subscription_id, 77);
        assert_eq!(config.network.callback_gas_limit, 300_000);
        assert_eq!(
            config.network.router_address,
            address!("0xf9B8fc078197181C841c296C876945aaa425B278")
        );
        assert_eq!(config.submission.receipt_timeout, Duration::from_secs(120));
        assert_eq!(config.listener.timeout, Duration::from_secs(300));
        assert_eq!(config.sandbox.http_retry_config.max_retries, 0);
        assert!(config.credentials.private_key.is_none());
    }

    #[test]
    fn test_app_config_rejects_oversized_don_id() {
        let content = BASE_CONFIG.replace("fun-base-sepolia-1", &"d".repeat(40));
        let temp_dir = write_config(&content);
        let result = AppConfig::new(Some(temp_dir.path().to_str().unwrap()));
        assert!(result.is_err());
    }

    #[test]
    fn test_app_config_missing_file_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = AppConfig::new(Some(temp_dir.path().to_str().unwrap()));
        assert!(result.is_err());
    }

    #[test]
    fn test_app_config_from_file_with_env_var_override() {
        let temp_dir = write_config(BASE_CONFIG);

        unsafe {
            std::env::set_var("FUNCTIONS__CREDENTIALS__GIST_TOKEN", "ghp_from_env");
        }

        let config = AppConfig::new(Some(temp_dir.path().to_str().unwrap())).unwrap();
        assert!(config.credentials.gist_token.is_some());

        unsafe {
            std::env::remove_var("FUNCTIONS__CREDENTIALS__GIST_TOKEN");
        }
    }
}
