//! Waiting for the oracle's fulfillment callback.
//!
//! Submission and result waiting are separate steps: a [`ResultListener`]
//! needs nothing but a [`RequestHandle`], so a restarted process can pick up
//! where the previous one stopped.

mod rpc;

use std::time::Duration;

use alloy::primitives::{B256, Bytes};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

pub use rpc::RpcResultListener;

use crate::{
    codec::{DecodeError, DecodedResult, ReturnType, decode_result},
    submitter::RequestHandle,
};

/// Errors raised while waiting for a callback.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// No callback arrived before the deadline. The request may still be
    /// fulfilled later.
    #[error("No callback for request {request_id} within {waited_secs}s")]
    Timeout {
        /// Request that was waited on.
        request_id: B256,
        /// How long the listener waited.
        waited_secs: u64,
    },

    /// The callback log could not be read.
    #[error("RPC error while waiting for callback: {0}")]
    Rpc(String),
}

/// The payload delivered by the fulfillment callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestResult {
    /// Request the callback belongs to.
    pub request_id: B256,
    /// Encoded result. Empty when the remote computation failed.
    pub response: Bytes,
    /// UTF-8 error text reported by the network, empty on success.
    pub error: Bytes,
    /// Block the callback was mined in.
    pub block_number: u64,
}

impl RequestResult {
    /// The reported error text, if any.
    pub fn error_message(&self) -> Option<String> {
        (!self.error.is_empty()).then(|| String::from_utf8_lossy(&self.error).into_owned())
    }

    /// Decodes the response as `expected`.
    pub fn decode(&self, expected: ReturnType) -> Result<DecodedResult, DecodeError> {
        decode_result(&self.response, expected)
    }
}

/// Observes fulfillment callbacks.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResultListener: Send + Sync {
    /// Waits up to `timeout` for the callback of `handle`.
    async fn await_result(
        &self,
        handle: &RequestHandle,
        timeout: Duration,
    ) -> Result<RequestResult, ListenerError>;
}
