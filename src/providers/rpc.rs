//! This module provides functionality to create providers for EVM RPC requests
//! with retry logic, backoff strategies and fallback across endpoints.

use std::{num::NonZeroUsize, str::FromStr};

use alloy::{
    network::EthereumWallet,
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder, layers::CallBatchLayer},
    rpc::client::RpcClient,
    signers::local::PrivateKeySigner,
    transports::{
        http::{Http, reqwest::Url},
        layers::{FallbackLayer, RetryBackoffLayer},
    },
};
use secrecy::{ExposeSecret, SecretString};
use tower::ServiceBuilder;

use crate::config::RpcRetryConfig;

/// Custom error type for provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Error when creating the provider.
    #[error("Provider creation failed: {0}")]
    CreationError(String),

    /// The signing key could not be parsed.
    #[error("Invalid private key: {0}")]
    InvalidKey(String),
}

fn create_rpc_client(
    urls: Vec<Url>,
    retry_config: &RpcRetryConfig,
) -> Result<RpcClient, ProviderError> {
    let transport_count = NonZeroUsize::new(urls.len())
        .ok_or_else(|| ProviderError::CreationError("RPC URL list cannot be empty".into()))?;

    // Create a FallbackLayer with the provided URLs
    let fallback_layer = FallbackLayer::default().with_active_transport_count(transport_count);

    let transports: Vec<_> = urls.into_iter().map(Http::new).collect();

    // Instantiate the RetryBackoffLayer with the configuration
    let retry_layer = RetryBackoffLayer::new(
        retry_config.max_retry,
        retry_config.backoff_ms,
        retry_config.compute_units_per_second,
    );

    // Apply the layers
    let service =
        ServiceBuilder::new().layer(retry_layer).layer(fallback_layer).service(transports);

    Ok(RpcClient::builder().transport(service, false))
}

/// Creates a read-only provider over the given RPC URLs.
pub fn create_provider(
    urls: Vec<Url>,
    retry_config: &RpcRetryConfig,
) -> Result<DynProvider, ProviderError> {
    let client = create_rpc_client(urls, retry_config)?;
    let provider = ProviderBuilder::new().layer(CallBatchLayer::new()).connect_client(client);
    Ok(provider.erased())
}

/// Parses a hex-encoded private key, with or without `0x`.
pub fn parse_signer(private_key: &SecretString) -> Result<PrivateKeySigner, ProviderError> {
    PrivateKeySigner::from_str(private_key.expose_secret().trim())
        .map_err(|e| ProviderError::InvalidKey(e.to_string()))
}

/// Creates a provider that signs and sends transactions from `private_key`.
///
/// Returns the provider and the sender address.
pub fn create_signer_provider(
    urls: Vec<Url>,
    retry_config: &RpcRetryConfig,
    private_key: &SecretString,
) -> Result<(DynProvider, Address), ProviderError> {
    let signer = parse_signer(private_key)?;
    let sender = signer.address();
    let client = create_rpc_client(urls, retry_config)?;
    let provider =
        ProviderBuilder::new().wallet(EthereumWallet::from(signer)).connect_client(client);
    tracing::debug!(sender = %sender, "Signing provider created.");
    Ok((provider.erased(), sender))
}
