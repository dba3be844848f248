//! The request lifecycle: stage secrets, estimate, submit, then await and
//! decode the callback.
//!
//! Each stage only starts after its predecessor's effect is confirmed, and a
//! failure reports the stage it happened in. Nothing is paid before secrets
//! are staged and the fee has been checked against the subscription.

mod builder;

use std::{fmt, sync::Arc, time::Duration};

use alloy::primitives::{B256, TxHash, U256};
use thiserror::Error;
use url::Url;

pub use builder::{LifecycleBuildError, LifecycleBuilder};

use crate::{
    codec::{DecodeError, DecodedResult, ReturnType},
    config::AppConfig,
    estimator::{CostEstimate, CostEstimator, EstimateError, EstimateParams, SubscriptionInfo},
    listener::{ListenerError, RequestResult, ResultListener},
    persistence::traits::SubmissionLedger,
    secrets::{PublishError, SecretBundle, SecretPublisher, SecretReference},
    submitter::{OnChainRequest, PendingSubmission, RequestHandle, RequestSubmitter, SubmitError},
};

/// The stage a lifecycle failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Encrypting and uploading secrets.
    Staging,
    /// Reading fees and the subscription.
    Estimation,
    /// Broadcasting and mining the request.
    Submission,
    /// Waiting for the callback.
    Listening,
    /// Decoding the callback payload.
    Decoding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Staging => "staging",
            Stage::Estimation => "estimation",
            Stage::Submission => "submission",
            Stage::Listening => "listening",
            Stage::Decoding => "decoding",
        };
        f.write_str(name)
    }
}

/// A lifecycle failure, tagged with its stage.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Secrets could not be staged. Nothing was spent.
    #[error("Staging failed: {0}")]
    Staging(#[from] PublishError),

    /// The fee could not be estimated or covered. Nothing was spent.
    #[error("Estimation failed: {0}")]
    Estimation(#[from] EstimateError),

    /// The request transaction failed or its outcome is unknown.
    #[error("Submission failed: {0}")]
    Submission(#[from] SubmitError),

    /// No callback was observed.
    #[error("Listening failed: {0}")]
    Listening(#[from] ListenerError),

    /// The callback payload did not match the expected type.
    #[error("Decoding failed: {0}")]
    Decoding(#[from] DecodeError),
}

impl LifecycleError {
    /// The stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            LifecycleError::Staging(_) => Stage::Staging,
            LifecycleError::Estimation(_) => Stage::Estimation,
            LifecycleError::Submission(_) => Stage::Submission,
            LifecycleError::Listening(_) => Stage::Listening,
            LifecycleError::Decoding(_) => Stage::Decoding,
        }
    }

    /// Whether the failure happened before any fee could be spent.
    pub fn is_pre_spend(&self) -> bool {
        matches!(self.stage(), Stage::Staging | Stage::Estimation)
    }
}

/// Tunables of a lifecycle, usually taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// DON id as bytes32.
    pub don_id: B256,
    /// Subscription paying for requests.
    pub subscription_id: u64,
    /// Gas reserved for the consumer callback.
    pub callback_gas_limit: u32,
    /// Margin added to the estimate, in basis points.
    pub fee_margin_bps: u32,
    /// Maximum age of an estimate at submission time.
    pub estimate_max_age: Duration,
    /// Gas price drift, in basis points, that invalidates an estimate.
    pub gas_price_tolerance_bps: u32,
    /// How long to wait for a request to be mined.
    pub receipt_timeout: Duration,
    /// Interval between receipt lookups.
    pub receipt_poll_interval: Duration,
    /// Block explorer base URL for log output.
    pub explorer_url: Option<Url>,
}

impl LifecycleSettings {
    /// Extracts the lifecycle settings from the application config.
    pub fn from_config(config: &AppConfig) -> Result<Self, config::ConfigError> {
        Ok(Self {
            don_id: config.network.don_id_bytes().map_err(config::ConfigError::Message)?,
            subscription_id: config.network.subscription_id,
            callback_gas_limit: config.network.callback_gas_limit,
            fee_margin_bps: config.submission.fee_margin_bps,
            estimate_max_age: config.submission.estimate_max_age,
            gas_price_tolerance_bps: config.submission.gas_price_tolerance_bps,
            receipt_timeout: config.submission.receipt_timeout,
            receipt_poll_interval: config.submission.receipt_poll_interval,
            explorer_url: config.network.explorer_url.clone(),
        })
    }
}

/// A fee checked against the subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeQuote {
    /// The raw estimate.
    pub estimate: CostEstimate,
    /// The fee to pay: the estimate plus the configured margin.
    pub fee: U256,
    /// Subscription state at the time of the check.
    pub subscription: SubscriptionInfo,
}

/// Drives requests through their lifecycle.
pub struct Lifecycle {
    settings: LifecycleSettings,
    publisher: SecretPublisher,
    estimator: CostEstimator,
    submitter: RequestSubmitter,
    ledger: Arc<dyn SubmissionLedger>,
    listener: Arc<dyn ResultListener>,
}

impl Lifecycle {
    /// Creates a new `LifecycleBuilder`.
    pub fn builder() -> LifecycleBuilder {
        LifecycleBuilder::new()
    }

    pub(crate) fn new(
        settings: LifecycleSettings,
        publisher: SecretPublisher,
        estimator: CostEstimator,
        submitter: RequestSubmitter,
        ledger: Arc<dyn SubmissionLedger>,
        listener: Arc<dyn ResultListener>,
    ) -> Self {
        Self { settings, publisher, estimator, submitter, ledger, listener }
    }

    /// The settings this lifecycle runs with.
    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    /// Encrypts and uploads `secrets`.
    #[tracing::instrument(skip_all, fields(stage = %Stage::Staging), level = "debug")]
    pub async fn stage_secrets(&self, secrets: &SecretBundle) -> Result<SecretReference, LifecycleError> {
        tracing::debug!("Staging secrets.");
        let reference = self.publisher.publish(secrets).await.inspect_err(|e| {
            tracing::error!(error = %e, "Staging failed.");
        })?;
        tracing::info!(locator_len = reference.encrypted_reference.len(), "Secrets staged.");
        Ok(reference)
    }

    /// Estimates the fee at the current gas price and checks the subscription
    /// can cover it with margin.
    #[tracing::instrument(skip_all, fields(stage = %Stage::Estimation), level = "debug")]
    pub async fn quote(&self) -> Result<FeeQuote, LifecycleError> {
        tracing::debug!("Estimating fee.");
        let estimate = self
            .estimator
            .estimate_now(
                self.settings.don_id,
                self.settings.subscription_id,
                self.settings.callback_gas_limit,
            )
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Estimation failed."))?;
        self.checked(estimate).await
    }

    async fn checked(&self, estimate: CostEstimate) -> Result<FeeQuote, LifecycleError> {
        let fee = estimate.with_margin(self.settings.fee_margin_bps);
        let subscription = self
            .estimator
            .check_subscription(self.settings.subscription_id, fee)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Subscription check failed."))?;
        tracing::info!(
            estimate_juels = %estimate.amount_juels,
            fee_juels = %fee,
            gas_price_wei = estimate.gas_price_wei,
            available_juels = %subscription.available(),
            "Fee quoted."
        );
        Ok(FeeQuote { estimate, fee, subscription })
    }

    /// Returns `quote` unchanged unless it went stale, in which case the fee is
    /// recomputed at the current gas price and checked again.
    pub async fn refresh_quote(&self, quote: FeeQuote) -> Result<FeeQuote, LifecycleError> {
        let gas_price_wei = self.estimator.current_gas_price().await?;
        if !quote.estimate.is_stale(
            chrono::Utc::now(),
            self.settings.estimate_max_age,
            gas_price_wei,
            self.settings.gas_price_tolerance_bps,
        ) {
            return Ok(quote);
        }

        tracing::info!(
            previous_gas_price_wei = quote.estimate.gas_price_wei,
            gas_price_wei,
            "Estimate is stale, recomputing."
        );
        let estimate = self
            .estimator
            .estimate(&EstimateParams {
                don_id: self.settings.don_id,
                subscription_id: self.settings.subscription_id,
                callback_gas_limit: self.settings.callback_gas_limit,
                gas_price_wei,
            })
            .await?;
        self.checked(estimate).await
    }

    /// Runs staging, estimation and submission for `args`, returning once the
    /// request is mined.
    ///
    /// Refuses to start while earlier broadcasts are unreconciled. When the
    /// run fails before any transaction carrying the staged secrets was
    /// broadcast, the secrets are removed from the store again.
    #[tracing::instrument(skip_all, fields(arg_count = args.len()), level = "debug")]
    pub async fn run(
        &self,
        secrets: &SecretBundle,
        args: Vec<String>,
    ) -> Result<RequestHandle, LifecycleError> {
        let pending = self.pending().await?;
        if let Some(oldest) = pending.first() {
            return Err(SubmitError::Unreconciled { count: pending.len(), oldest: oldest.tx_hash }.into());
        }

        let reference = self.stage_secrets(secrets).await?;
        let quote = match self.quote().await {
            Ok(quote) => self.refresh_quote(quote).await,
            Err(e) => Err(e),
        };
        let quote = match quote {
            Ok(quote) => quote,
            Err(e) => {
                self.discard_secrets(&reference.locator).await;
                return Err(e);
            }
        };

        let request = OnChainRequest {
            encrypted_reference: reference.encrypted_reference,
            fee: quote.fee,
            args,
        };
        let result = self.submit(&request, Some(reference.locator.clone())).await;
        if result.is_err() && self.is_unrecorded(&request).await {
            self.discard_secrets(&reference.locator).await;
        }
        result
    }

    /// Whether the ledger holds neither a pending transaction nor a handle for
    /// `request`, meaning no transaction carrying it was ever broadcast.
    async fn is_unrecorded(&self, request: &OnChainRequest) -> bool {
        let fingerprint = request.fingerprint();
        matches!(
            (
                self.ledger.pending(fingerprint).await,
                self.ledger.handle_for_fingerprint(fingerprint).await,
            ),
            (Ok(None), Ok(None))
        )
    }

    /// Removes secrets staged for a run that will never reference them.
    /// Failure is logged and otherwise ignored.
    async fn discard_secrets(&self, locator: &Url) {
        match self.publisher.store().delete(locator).await {
            Ok(()) => tracing::info!("Staged secrets removed after aborted run."),
            Err(e) => tracing::warn!(error = %e, "Could not remove staged secrets."),
        }
    }

    /// Submits an already assembled request.
    #[tracing::instrument(skip_all, fields(stage = %Stage::Submission, fee = %request.fee), level = "debug")]
    pub async fn submit(
        &self,
        request: &OnChainRequest,
        secrets_locator: Option<Url>,
    ) -> Result<RequestHandle, LifecycleError> {
        let handle = self.submitter.submit(request, secrets_locator).await.inspect_err(|e| {
            tracing::error!(error = %e, "Submission failed.");
        })?;

        match self.explorer_link(handle.tx_hash) {
            Some(link) => tracing::info!(request_id = %handle.request_id, explorer = %link, "Request submitted."),
            None => tracing::info!(request_id = %handle.request_id, tx_hash = %handle.tx_hash, "Request submitted."),
        }
        Ok(handle)
    }

    /// Unconfirmed broadcasts recorded in the ledger.
    pub async fn pending(&self) -> Result<Vec<PendingSubmission>, LifecycleError> {
        Ok(self.ledger.pending_all().await.map_err(SubmitError::from)?)
    }

    /// Resolves every unconfirmed broadcast by presenting its request to the
    /// submitter again. Dropped broadcasts are sent anew.
    pub async fn reconcile_pending(&self) -> Result<Vec<RequestHandle>, LifecycleError> {
        let mut handles = Vec::new();
        for pending in self.pending().await? {
            tracing::info!(tx_hash = %pending.tx_hash, broadcast_at = %pending.broadcast_at, "Reconciling broadcast.");
            handles.push(self.submit(&pending.request, pending.secrets_locator.clone()).await?);
        }
        Ok(handles)
    }

    /// The recorded handle of a mined request.
    pub async fn handle(&self, request_id: B256) -> Result<RequestHandle, LifecycleError> {
        self.ledger
            .handle(request_id)
            .await
            .map_err(SubmitError::from)?
            .ok_or_else(|| SubmitError::UnknownRequest(request_id).into())
    }

    /// Waits up to `timeout` for the callback of `handle`.
    #[tracing::instrument(skip_all, fields(stage = %Stage::Listening, request_id = %handle.request_id), level = "debug")]
    pub async fn await_result(
        &self,
        handle: &RequestHandle,
        timeout: Duration,
    ) -> Result<RequestResult, LifecycleError> {
        tracing::debug!(timeout_secs = timeout.as_secs(), "Waiting for callback.");
        let result = self.listener.await_result(handle, timeout).await.inspect_err(|e| {
            tracing::error!(error = %e, "No callback observed.");
        })?;
        if let Some(message) = result.error_message() {
            tracing::warn!(error = %message, "Remote computation reported an error.");
        }
        Ok(result)
    }

    /// Decodes a callback payload as `expected`.
    pub fn decode(result: &RequestResult, expected: ReturnType) -> Result<DecodedResult, LifecycleError> {
        let decoded = result.decode(expected).inspect_err(|e| {
            tracing::error!(stage = %Stage::Decoding, error = %e, "Failed to decode result.");
        })?;
        Ok(decoded)
    }

    fn explorer_link(&self, tx_hash: TxHash) -> Option<Url> {
        self.settings.explorer_url.as_ref()?.join(&format!("tx/{tx_hash}")).ok()
    }
}
