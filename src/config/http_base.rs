use std::time::Duration;

use serde::Deserialize;

use super::deserialize_duration_from_seconds;

fn default_max_idle_per_host() -> usize {
    10
}

fn default_idle_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

/// Connection settings shared by every pooled HTTP client.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BaseHttpClientConfig {
    /// Idle connections kept per host.
    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,

    /// How long an idle connection is kept.
    #[serde(
        rename = "idle_timeout_secs",
        default = "default_idle_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub idle_timeout: Duration,

    /// Upper bound on establishing a connection.
    #[serde(
        rename = "connect_timeout_secs",
        default = "default_connect_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub connect_timeout: Duration,

    /// Upper bound on a whole request, body included.
    #[serde(
        rename = "request_timeout_secs",
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub request_timeout: Duration,
}

impl BaseHttpClientConfig {
    /// A `reqwest` builder carrying these settings.
    pub fn client_builder(&self) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .pool_max_idle_per_host(self.max_idle_per_host)
            .pool_idle_timeout(Some(self.idle_timeout))
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
    }
}

impl Default for BaseHttpClientConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: default_max_idle_per_host(),
            idle_timeout: default_idle_timeout(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use config::Config;

    use super::*;

    fn from_yaml(yaml: &str) -> BaseHttpClientConfig {
        Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_empty_section_uses_defaults() {
        assert_eq!(from_yaml(""), BaseHttpClientConfig::default());
    }

    #[test]
    fn test_timeouts_are_read_in_seconds() {
        let config = from_yaml(
            r#"
            max_idle_per_host: 2
            connect_timeout_secs: 3
            request_timeout_secs: 15
            "#,
        );
        assert_eq!(config.max_idle_per_host, 2);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
    }
}
