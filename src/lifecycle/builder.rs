//! This module provides the `LifecycleBuilder` for constructing a `Lifecycle`.

use std::sync::Arc;

use thiserror::Error;

use super::{Lifecycle, LifecycleSettings};
use crate::{
    estimator::{CostEstimator, FeeSource},
    listener::ResultListener,
    persistence::traits::SubmissionLedger,
    secrets::{EncryptionKeySource, SecretPublisher, SecretStore},
    submitter::{ConsumerClient, RequestSubmitter},
};

/// Errors raised when a `Lifecycle` is assembled without all its parts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleBuildError {
    /// Settings were not provided.
    #[error("Lifecycle settings are missing")]
    MissingSettings,
    /// The encryption key source was not provided.
    #[error("Encryption key source is missing")]
    MissingKeySource,
    /// The secret store was not provided.
    #[error("Secret store is missing")]
    MissingSecretStore,
    /// The fee source was not provided.
    #[error("Fee source is missing")]
    MissingFeeSource,
    /// The consumer client was not provided.
    #[error("Consumer client is missing")]
    MissingConsumerClient,
    /// The submission ledger was not provided.
    #[error("Submission ledger is missing")]
    MissingLedger,
    /// The result listener was not provided.
    #[error("Result listener is missing")]
    MissingListener,
}

/// A builder for creating a `Lifecycle` instance.
#[derive(Default)]
pub struct LifecycleBuilder {
    settings: Option<LifecycleSettings>,
    key_source: Option<Arc<dyn EncryptionKeySource>>,
    secret_store: Option<Arc<dyn SecretStore>>,
    fee_source: Option<Arc<dyn FeeSource>>,
    consumer: Option<Arc<dyn ConsumerClient>>,
    ledger: Option<Arc<dyn SubmissionLedger>>,
    listener: Option<Arc<dyn ResultListener>>,
}

impl LifecycleBuilder {
    /// Creates a new, empty `LifecycleBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the lifecycle settings.
    pub fn settings(mut self, settings: LifecycleSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Sets where the network's encryption keys come from.
    pub fn key_source(mut self, key_source: Arc<dyn EncryptionKeySource>) -> Self {
        self.key_source = Some(key_source);
        self
    }

    /// Sets the off-chain store encrypted secrets are uploaded to.
    pub fn secret_store(mut self, secret_store: Arc<dyn SecretStore>) -> Self {
        self.secret_store = Some(secret_store);
        self
    }

    /// Sets the source of fee parameters and subscription state.
    pub fn fee_source(mut self, fee_source: Arc<dyn FeeSource>) -> Self {
        self.fee_source = Some(fee_source);
        self
    }

    /// Sets the consumer contract client requests are sent through.
    pub fn consumer(mut self, consumer: Arc<dyn ConsumerClient>) -> Self {
        self.consumer = Some(consumer);
        self
    }

    /// Sets the ledger broadcasts and handles are recorded in.
    pub fn ledger(mut self, ledger: Arc<dyn SubmissionLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Sets the listener that observes callbacks.
    pub fn listener(mut self, listener: Arc<dyn ResultListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Checks every part was provided and wires the stage components.
    pub fn build(self) -> Result<Lifecycle, LifecycleBuildError> {
        let settings = self.settings.ok_or(LifecycleBuildError::MissingSettings)?;
        let key_source = self.key_source.ok_or(LifecycleBuildError::MissingKeySource)?;
        let secret_store = self.secret_store.ok_or(LifecycleBuildError::MissingSecretStore)?;
        let fee_source = self.fee_source.ok_or(LifecycleBuildError::MissingFeeSource)?;
        let consumer = self.consumer.ok_or(LifecycleBuildError::MissingConsumerClient)?;
        let ledger = self.ledger.ok_or(LifecycleBuildError::MissingLedger)?;
        let listener = self.listener.ok_or(LifecycleBuildError::MissingListener)?;

        let publisher = SecretPublisher::new(key_source, secret_store);
        let estimator = CostEstimator::new(fee_source);
        let submitter = RequestSubmitter::new(
            consumer,
            Arc::clone(&ledger),
            settings.receipt_timeout,
            settings.receipt_poll_interval,
        );

        tracing::debug!(
            subscription_id = settings.subscription_id,
            callback_gas_limit = settings.callback_gas_limit,
            "Lifecycle assembled."
        );
        Ok(Lifecycle::new(settings, publisher, estimator, submitter, ledger, listener))
    }
}
