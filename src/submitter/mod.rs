//! On-chain submission of oracle requests.

mod request;
mod request_submitter;
mod rpc;

use alloy::primitives::{Bytes, TxHash};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

pub use request::{OnChainRequest, PendingSubmission, RequestHandle, SubmissionReceipt};
pub use request_submitter::RequestSubmitter;
pub use rpc::RpcConsumerClient;

use crate::persistence::error::PersistenceError;

/// Errors raised while submitting a request.
///
/// None of these are retried automatically. Calling
/// [`RequestSubmitter::submit`] again with the same request reconciles against
/// the recorded broadcast before sending anything new.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The transaction could not be built or signed. Nothing was sent.
    #[error("Failed to sign request: {0}")]
    Signing(String),

    /// Broadcasting failed. The transaction may still have reached the node,
    /// so it stays recorded as pending.
    #[error("Failed to broadcast request: {0}")]
    Broadcast(String),

    /// The transaction was broadcast but not mined in time. It may still be mined.
    #[error("Transaction {tx_hash} was not mined within {waited_secs}s")]
    ReceiptTimeout {
        /// Hash of the broadcast transaction.
        tx_hash: TxHash,
        /// How long the submitter waited.
        waited_secs: u64,
    },

    /// The transaction was mined but reverted.
    #[error("Transaction {0} reverted")]
    Reverted(TxHash),

    /// The transaction was mined but emitted no request id.
    #[error("Transaction {0} emitted no RequestSent event")]
    MissingRequestId(TxHash),

    /// Talking to the chain failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Earlier broadcasts have not been reconciled yet.
    #[error("{count} earlier broadcast(s) unreconciled, oldest is {oldest}; run `resume --pending` first")]
    Unreconciled {
        /// Number of unreconciled broadcasts.
        count: usize,
        /// Hash of the oldest one.
        oldest: TxHash,
    },

    /// No mined request with this id was recorded locally.
    #[error("No submission recorded for request {0}")]
    UnknownRequest(alloy::primitives::B256),

    /// The submission ledger could not be read or written.
    #[error("Submission ledger error: {0}")]
    Ledger(#[from] PersistenceError),
}

/// A request transaction signed locally and not yet broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Hash the transaction will have once broadcast.
    pub tx_hash: TxHash,
    /// EIP-2718 encoding of the signed transaction.
    pub raw: Bytes,
}

/// The consumer contract as seen by the submitter.
///
/// The submitter records the transaction hash between
/// [`sign_request`](Self::sign_request) and [`broadcast`](Self::broadcast).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConsumerClient: Send + Sync {
    /// Builds and signs the request transaction without sending it.
    async fn sign_request(&self, request: &OnChainRequest) -> Result<SignedRequest, SubmitError>;

    /// Broadcasts a signed transaction without waiting for it to be mined.
    async fn broadcast(&self, signed: &SignedRequest) -> Result<(), SubmitError>;

    /// The receipt of `tx_hash`, or `None` while unmined.
    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<SubmissionReceipt>, SubmitError>;

    /// Whether the node still knows `tx_hash`, mined or pending.
    async fn is_known(&self, tx_hash: TxHash) -> Result<bool, SubmitError>;
}
