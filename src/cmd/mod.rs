//! Command-line subcommands and the wiring they share.

pub mod approve;
pub mod estimate;
pub mod request;
pub mod resume;
pub mod simulate;

use std::{sync::Arc, time::Duration};

use alloy::{network::EthereumWallet, primitives::Address};
use reqwest_middleware::ClientWithMiddleware;
use secrecy::SecretString;
use thiserror::Error;

pub use approve::ApproveArgs;
pub use estimate::EstimateArgs;
pub use request::RequestArgs;
pub use resume::ResumeArgs;
pub use simulate::SimulateArgs;

use crate::{
    codec::{DecodeError, DecodedResult, ReturnType},
    config::{AppConfig, CredentialsConfig},
    estimator::EstimateError,
    http_client::{HttpClientPool, HttpClientPoolError},
    lifecycle::{Lifecycle, LifecycleBuildError, LifecycleError, LifecycleSettings},
    listener::{RequestResult, RpcResultListener},
    persistence::{SqliteStateRepository, error::PersistenceError},
    providers::{ApprovalError, OnChainNetwork, ProviderError, create_signer_provider, parse_signer},
    secrets::{API_KEY_SECRET, BEARER_TOKEN_SECRET, GistStore, SecretBundle, SecretsError, fetch_bearer_token},
    submitter::RpcConsumerClient,
};

/// Errors surfaced by the subcommands.
#[derive(Error, Debug)]
pub enum CmdError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] HttpClientPoolError),
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Secrets error: {0}")]
    Secrets(#[from] SecretsError),
    #[error("Estimation error: {0}")]
    Estimate(#[from] EstimateError),
    #[error("Approval error: {0}")]
    Approval(#[from] ApprovalError),
    #[error("Lifecycle wiring error: {0}")]
    Build(#[from] LifecycleBuildError),
    #[error("{stage} stage failed: {err}", stage = .0.stage(), err = .0)]
    Lifecycle(#[from] LifecycleError),
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Usage(String),
}

/// Loads configuration from `config_dir` (default `configs`).
pub(crate) fn load_config(config_dir: Option<&str>) -> Result<AppConfig, CmdError> {
    tracing::debug!("Loading application configuration...");
    let config = AppConfig::new(config_dir)?;
    tracing::debug!(
        rpc_urls = ?config.rpc_urls,
        don_id = %config.network.don_id,
        subscription_id = config.network.subscription_id,
        "Configuration loaded."
    );
    Ok(config)
}

/// Builds the secrets the remote computation needs: the reasoning API key
/// and a freshly exchanged posts API bearer token.
pub(crate) async fn request_secrets(
    config: &AppConfig,
    client: &ClientWithMiddleware,
) -> Result<SecretBundle, CmdError> {
    let creds = &config.credentials;
    let api_key = CredentialsConfig::require(&creds.reasoning_api_key, "reasoning_api_key")?;
    let posts_key = CredentialsConfig::require(&creds.posts_api_key, "posts_api_key")?;
    let posts_secret = CredentialsConfig::require(&creds.posts_api_secret, "posts_api_secret")?;

    let bearer_token =
        fetch_bearer_token(client, &creds.posts_token_url, posts_key, posts_secret).await?;
    tracing::info!("Posts API bearer token obtained.");

    Ok(SecretBundle::new([
        (API_KEY_SECRET, api_key.clone()),
        (BEARER_TOKEN_SECRET, bearer_token),
    ])?)
}

/// Everything a chain-writing command needs.
pub(crate) struct Wiring {
    pub lifecycle: Lifecycle,
    pub repo: Arc<SqliteStateRepository>,
    pub http_client: Arc<ClientWithMiddleware>,
    pub sender: Address,
}

/// Assembles a [`Lifecycle`] backed by the live network, the gist store and
/// the SQLite ledger.
pub(crate) async fn wire_lifecycle(config: &AppConfig) -> Result<Wiring, CmdError> {
    let private_key = CredentialsConfig::require(&config.credentials.private_key, "private_key")?;
    let gist_token: SecretString =
        CredentialsConfig::require(&config.credentials.gist_token, "gist_token")?.clone();

    let pool = HttpClientPool::with_base_config(config.http_base_config.clone());
    let http_client = pool.get_or_create(&config.http_retry_config).await?;

    let (provider, sender) =
        create_signer_provider(config.rpc_urls.clone(), &config.rpc_retry_config, private_key)?;
    tracing::info!(sender = %sender, "Signing provider initialized.");

    let settings = LifecycleSettings::from_config(config)?;
    let network = Arc::new(OnChainNetwork::new(
        provider.clone(),
        config.network.router_address,
        settings.don_id,
    ));

    tracing::debug!(database_url = %config.database_url, "Initializing submission ledger...");
    let repo = Arc::new(SqliteStateRepository::new(&config.database_url).await?);
    repo.run_migrations().await?;

    let store = GistStore::new(
        config.secret_store.gist_api_url.clone(),
        gist_token,
        Arc::clone(&http_client),
    );
    let wallet = EthereumWallet::from(parse_signer(private_key)?);
    let consumer =
        RpcConsumerClient::new(provider.clone(), wallet, config.network.consumer_address);
    let listener = RpcResultListener::new(
        provider,
        config.network.consumer_address,
        config.listener.poll_interval,
    );

    let lifecycle = Lifecycle::builder()
        .settings(settings)
        .key_source(network.clone())
        .fee_source(network)
        .secret_store(Arc::new(store))
        .consumer(Arc::new(consumer))
        .ledger(repo.clone())
        .listener(Arc::new(listener))
        .build()?;

    Ok(Wiring { lifecycle, repo, http_client, sender })
}

/// Waits for the callback of `handle`, prints it and decodes it.
pub(crate) async fn await_and_print(
    lifecycle: &Lifecycle,
    handle: &crate::submitter::RequestHandle,
    timeout: Duration,
    return_type: ReturnType,
) -> Result<(), CmdError> {
    let result = lifecycle.await_result(handle, timeout).await?;
    print_result(&result, return_type)?;
    Ok(())
}

/// Prints a callback payload and its decoding.
pub(crate) fn print_result(result: &RequestResult, return_type: ReturnType) -> Result<(), CmdError> {
    println!("request id: {}", result.request_id);
    println!("response:   0x{}", hex::encode(&result.response));
    if let Some(message) = result.error_message() {
        println!("error:      {message}");
    }
    match Lifecycle::decode(result, return_type)? {
        DecodedResult::Empty => println!("decoded:    <empty: computation reported an error>"),
        DecodedResult::Value(value) => println!("decoded:    {value} ({return_type})"),
    }
    Ok(())
}

/// Parses comma-separated content ids, dropping blanks.
pub(crate) fn parse_content_ids(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|id| !id.is_empty()).map(str::to_string).collect()
}
