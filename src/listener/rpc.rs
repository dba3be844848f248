use std::time::Duration;

use alloy::{
    primitives::Address,
    providers::{DynProvider, Provider},
    rpc::types::Filter,
    sol_types::SolEvent,
};
use async_trait::async_trait;

use super::{ListenerError, RequestResult, ResultListener};
use crate::{providers::contracts::IReasoningConsumer, submitter::RequestHandle};

/// Polls the consumer's `Response` logs for a request id.
pub struct RpcResultListener {
    provider: DynProvider,
    consumer: Address,
    poll_interval: Duration,
}

impl RpcResultListener {
    /// Creates a listener for callbacks delivered to `consumer`.
    pub fn new(provider: DynProvider, consumer: Address, poll_interval: Duration) -> Self {
        Self { provider, consumer, poll_interval }
    }

    /// Looks for the callback once.
    pub async fn find_result(
        &self,
        handle: &RequestHandle,
    ) -> Result<Option<RequestResult>, ListenerError> {
        let filter = Filter::new()
            .address(self.consumer)
            .event_signature(IReasoningConsumer::Response::SIGNATURE_HASH)
            .topic1(handle.request_id)
            .from_block(handle.block_number);

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(|e| ListenerError::Rpc(format!("eth_getLogs failed: {e}")))?;

        for log in logs {
            let block_number = log.block_number.unwrap_or_default();
            match log.log_decode::<IReasoningConsumer::Response>() {
                Ok(decoded) if decoded.inner.data.requestId == handle.request_id => {
                    let event = decoded.inner.data;
                    return Ok(Some(RequestResult {
                        request_id: event.requestId,
                        response: event.response,
                        error: event.err,
                        block_number,
                    }));
                }
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable Response log.");
                }
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl ResultListener for RpcResultListener {
    #[tracing::instrument(skip(self, handle), fields(request_id = %handle.request_id), level = "debug")]
    async fn await_result(
        &self,
        handle: &RequestHandle,
        timeout: Duration,
    ) -> Result<RequestResult, ListenerError> {
        let poll = async {
            loop {
                match self.find_result(handle).await {
                    Ok(Some(result)) => return result,
                    Ok(None) => tracing::debug!("Callback not observed yet."),
                    // The deadline bounds transient RPC failures.
                    Err(e) => tracing::warn!(error = %e, "Callback poll failed, retrying."),
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => {
                tracing::info!(
                    block_number = result.block_number,
                    failed = result.response.is_empty(),
                    "Callback observed."
                );
                Ok(result)
            }
            Err(_) => Err(ListenerError::Timeout {
                request_id: handle.request_id,
                waited_secs: timeout.as_secs(),
            }),
        }
    }
}
