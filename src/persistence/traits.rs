//! Storage interfaces used by the relay.

use alloy::primitives::B256;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Serialize, de::DeserializeOwned};

use super::error::PersistenceError;
use crate::submitter::{PendingSubmission, RequestHandle};

/// A generic key/value store for JSON-serializable state.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieves a JSON-serializable state object by its key.
    async fn get_json_state<T: DeserializeOwned + Send + Sync + 'static>(
        &self,
        key: &str,
    ) -> Result<Option<T>, PersistenceError>;

    /// Sets or updates a JSON-serializable state object by its key.
    async fn set_json_state<T: Serialize + Send + Sync + 'static>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), PersistenceError>;

    /// Removes a state object. Removing a missing key is not an error.
    async fn delete_json_state(&self, key: &str) -> Result<(), PersistenceError>;

    /// Retrieves all state objects whose key starts with `prefix`.
    async fn get_all_json_states_by_prefix<T: DeserializeOwned + Send + Sync + 'static>(
        &self,
        prefix: &str,
    ) -> Result<Vec<(String, T)>, PersistenceError>;
}

/// Durable record of broadcasts and mined requests.
///
/// Lets a restarted process reconcile an unconfirmed broadcast instead of
/// paying twice, and resume waiting for a callback from the handle alone.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SubmissionLedger: Send + Sync {
    /// The unconfirmed broadcast for `fingerprint`, if any.
    async fn pending(&self, fingerprint: B256) -> Result<Option<PendingSubmission>, PersistenceError>;

    /// Records a broadcast before its receipt is known.
    async fn record_pending(&self, pending: &PendingSubmission) -> Result<(), PersistenceError>;

    /// Every unconfirmed broadcast, oldest first.
    async fn pending_all(&self) -> Result<Vec<PendingSubmission>, PersistenceError>;

    /// Forgets the unconfirmed broadcast for `fingerprint`.
    async fn clear_pending(&self, fingerprint: B256) -> Result<(), PersistenceError>;

    /// Records a mined request and clears its pending entry.
    async fn record_handle(
        &self,
        fingerprint: B256,
        handle: &RequestHandle,
    ) -> Result<(), PersistenceError>;

    /// The mined request for `fingerprint`, if any.
    async fn handle_for_fingerprint(
        &self,
        fingerprint: B256,
    ) -> Result<Option<RequestHandle>, PersistenceError>;

    /// The mined request with `request_id`, if any.
    async fn handle(&self, request_id: B256) -> Result<Option<RequestHandle>, PersistenceError>;

    /// All mined requests, oldest first.
    async fn handles(&self) -> Result<Vec<RequestHandle>, PersistenceError>;
}
