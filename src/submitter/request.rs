use alloy::{
    primitives::{B256, Bytes, TxHash, U256, keccak256},
    sol_types::SolValue,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// The tuple sent to the consumer contract in a single transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainRequest {
    /// Sealed locator of the staged secrets.
    pub encrypted_reference: Bytes,
    /// Fee in juels.
    pub fee: U256,
    /// Caller arguments, here the content ids.
    pub args: Vec<String>,
}

impl OnChainRequest {
    /// Identity of the request for reconciliation: the same reference, fee and
    /// arguments always hash to the same fingerprint.
    pub fn fingerprint(&self) -> B256 {
        keccak256((self.encrypted_reference.clone(), self.fee, self.args.clone()).abi_encode())
    }
}

/// Everything needed to find a request's callback after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHandle {
    /// Id emitted by the consumer; the callback carries the same id.
    pub request_id: B256,
    /// Transaction that created the request.
    pub tx_hash: TxHash,
    /// Block the transaction was mined in.
    pub block_number: u64,
    /// Fee paid, in juels.
    pub fee_juels: U256,
    /// Node-visible locator of the staged secrets, when known.
    #[serde(default)]
    pub secrets_locator: Option<Url>,
    /// When the request was mined, as observed locally.
    pub submitted_at: DateTime<Utc>,
}

/// A broadcast whose outcome is not yet known.
///
/// Keeps the whole request so it can be presented to the submitter again,
/// which reconciles against `tx_hash` instead of paying twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSubmission {
    /// Fingerprint of the request that was broadcast.
    pub fingerprint: B256,
    /// Hash of the broadcast transaction.
    pub tx_hash: TxHash,
    /// The request carried by the transaction.
    pub request: OnChainRequest,
    /// Node-visible locator of the staged secrets, when known.
    #[serde(default)]
    pub secrets_locator: Option<Url>,
    /// When the transaction was broadcast.
    pub broadcast_at: DateTime<Utc>,
}

/// The parts of a transaction receipt the submitter needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// Transaction hash.
    pub tx_hash: TxHash,
    /// Block the transaction was mined in.
    pub block_number: u64,
    /// Whether execution succeeded.
    pub success: bool,
    /// Id from the consumer's `RequestSent` event, if emitted.
    pub request_id: Option<B256>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> OnChainRequest {
        OnChainRequest {
            encrypted_reference: Bytes::from_static(&[1, 2, 3]),
            fee: U256::from(100u64),
            args: vec!["111".to_string()],
        }
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(request().fingerprint(), request().fingerprint());
    }

    #[test]
    fn test_fingerprint_covers_fee_reference_and_args() {
        let base = request().fingerprint();
        assert_ne!(OnChainRequest { fee: U256::from(101u64), ..request() }.fingerprint(), base);
        assert_ne!(
            OnChainRequest { encrypted_reference: Bytes::from_static(&[9]), ..request() }
                .fingerprint(),
            base
        );
        assert_ne!(OnChainRequest { args: vec!["112".to_string()], ..request() }.fingerprint(), base);
    }

    #[test]
    fn test_handle_serde_round_trip() {
        let handle = RequestHandle {
            request_id: B256::repeat_byte(7),
            tx_hash: TxHash::repeat_byte(8),
            block_number: 42,
            fee_juels: U256::from(5u64),
            secrets_locator: Some(Url::parse("https://gist.example/u/1/raw").unwrap()),
            submitted_at: Utc::now(),
        };
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(serde_json::from_str::<RequestHandle>(&json).unwrap(), handle);
    }
}
