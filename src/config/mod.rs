//! Configuration module for the request relay.

mod app_config;
mod credentials;
mod helpers;
mod http_base;
mod network;
mod retry;
mod sandbox;
mod submission;

pub use app_config::AppConfig;
pub use credentials::{CredentialsConfig, SecretStoreConfig};
pub use helpers::{
    deserialize_address, deserialize_duration_from_ms, deserialize_duration_from_seconds,
    deserialize_optional_address, deserialize_optional_secret, deserialize_urls,
    serialize_duration_to_ms, serialize_duration_to_seconds,
};
pub use http_base::BaseHttpClientConfig;
pub use network::{NetworkConfig, don_id_to_bytes32};
pub use retry::{HttpRetryConfig, JitterSetting, RpcRetryConfig};
pub use sandbox::SandboxConfig;
pub use submission::{ListenerConfig, SubmissionConfig};
