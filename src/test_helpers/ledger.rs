//! An in-memory submission ledger.

use std::collections::HashMap;

use alloy::primitives::B256;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    persistence::{error::PersistenceError, traits::SubmissionLedger},
    submitter::{PendingSubmission, RequestHandle},
};

#[derive(Default)]
struct Entries {
    pending: HashMap<B256, PendingSubmission>,
    handles: HashMap<B256, RequestHandle>,
    fingerprints: HashMap<B256, B256>,
}

/// A [`SubmissionLedger`] that keeps everything in memory.
#[derive(Default)]
pub struct InMemoryLedger {
    entries: Mutex<Entries>,
}

#[async_trait]
impl SubmissionLedger for InMemoryLedger {
    async fn pending(&self, fingerprint: B256) -> Result<Option<PendingSubmission>, PersistenceError> {
        Ok(self.entries.lock().await.pending.get(&fingerprint).cloned())
    }

    async fn record_pending(&self, pending: &PendingSubmission) -> Result<(), PersistenceError> {
        self.entries.lock().await.pending.insert(pending.fingerprint, pending.clone());
        Ok(())
    }

    async fn pending_all(&self) -> Result<Vec<PendingSubmission>, PersistenceError> {
        let mut pending: Vec<_> = self.entries.lock().await.pending.values().cloned().collect();
        pending.sort_by_key(|p| p.broadcast_at);
        Ok(pending)
    }

    async fn clear_pending(&self, fingerprint: B256) -> Result<(), PersistenceError> {
        self.entries.lock().await.pending.remove(&fingerprint);
        Ok(())
    }

    async fn record_handle(
        &self,
        fingerprint: B256,
        handle: &RequestHandle,
    ) -> Result<(), PersistenceError> {
        let mut entries = self.entries.lock().await;
        entries.pending.remove(&fingerprint);
        entries.fingerprints.insert(fingerprint, handle.request_id);
        entries.handles.insert(handle.request_id, handle.clone());
        Ok(())
    }

    async fn handle_for_fingerprint(
        &self,
        fingerprint: B256,
    ) -> Result<Option<RequestHandle>, PersistenceError> {
        let entries = self.entries.lock().await;
        Ok(entries.fingerprints.get(&fingerprint).and_then(|id| entries.handles.get(id)).cloned())
    }

    async fn handle(&self, request_id: B256) -> Result<Option<RequestHandle>, PersistenceError> {
        Ok(self.entries.lock().await.handles.get(&request_id).cloned())
    }

    async fn handles(&self) -> Result<Vec<RequestHandle>, PersistenceError> {
        let mut handles: Vec<_> = self.entries.lock().await.handles.values().cloned().collect();
        handles.sort_by_key(|h| (h.block_number, h.submitted_at));
        Ok(handles)
    }
}
