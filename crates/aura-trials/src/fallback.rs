//! In-process trial-request store.
//!
//! Holds records created while the backend was unreachable and mirrors every
//! record the backend has returned, so transitions keep working offline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use aura_core::{TrialId, TrialRequest};

/// Prefix of ids minted locally: `local-<unix millis>-<sequence>`.
pub const LOCAL_ID_PREFIX: &str = "local-";

#[derive(Debug, Default)]
pub struct LocalFallbackStore {
    records: Mutex<Vec<TrialRequest>>,
    next_seq: AtomicU64,
}

impl LocalFallbackStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a process-unique id. Two calls within the same millisecond
    /// still differ by their sequence suffix.
    pub fn next_id(&self, now: DateTime<Utc>) -> TrialId {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        TrialId(format!(
            "{LOCAL_ID_PREFIX}{}-{seq}",
            now.timestamp_millis()
        ))
    }

    #[must_use]
    pub fn is_local_id(id: &TrialId) -> bool {
        id.as_str().starts_with(LOCAL_ID_PREFIX)
    }

    /// Stores `record`, replacing any record with the same id. The product
    /// snapshots of an existing record are kept: snapshots never change
    /// after submission.
    pub fn upsert(&self, record: TrialRequest) -> TrialRequest {
        let mut records = self.lock();
        Self::upsert_locked(&mut records, record)
    }

    /// Upserts every record and returns the stored versions in input order.
    pub fn upsert_all(
        &self,
        incoming: impl IntoIterator<Item = TrialRequest>,
    ) -> Vec<TrialRequest> {
        let mut records = self.lock();
        incoming
            .into_iter()
            .map(|record| Self::upsert_locked(&mut records, record))
            .collect()
    }

    /// Treats `incoming` as the backend's complete list: mirrored backend
    /// records missing from it are dropped, locally minted ones are kept.
    /// Returns the stored versions of `incoming` in input order.
    pub fn replace_remote(
        &self,
        incoming: impl IntoIterator<Item = TrialRequest>,
    ) -> Vec<TrialRequest> {
        let incoming: Vec<TrialRequest> = incoming.into_iter().collect();
        let mut records = self.lock();
        records.retain(|r| Self::is_local_id(&r.id) || incoming.iter().any(|i| i.id == r.id));
        incoming
            .into_iter()
            .map(|record| Self::upsert_locked(&mut records, record))
            .collect()
    }

    fn upsert_locked(records: &mut Vec<TrialRequest>, mut record: TrialRequest) -> TrialRequest {
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                if !existing.products.is_empty() {
                    record.products = std::mem::take(&mut existing.products);
                }
                *existing = record.clone();
            }
            None => records.push(record.clone()),
        }
        record
    }

    #[must_use]
    pub fn get(&self, id: &TrialId) -> Option<TrialRequest> {
        self.lock().iter().find(|r| &r.id == id).cloned()
    }

    /// Runs `f` on the record with `id` while holding the lock. Returns
    /// `None` when no record matches.
    pub fn update<R>(&self, id: &TrialId, f: impl FnOnce(&mut TrialRequest) -> R) -> Option<R> {
        self.lock().iter_mut().find(|r| &r.id == id).map(f)
    }

    /// Returns whether a record was removed.
    pub fn remove(&self, id: &TrialId) -> bool {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|r| &r.id != id);
        records.len() != before
    }

    /// Copies every record, in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TrialRequest> {
        self.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Poisoning is ignored: mutations never leave a record half-written.
    fn lock(&self) -> MutexGuard<'_, Vec<TrialRequest>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
