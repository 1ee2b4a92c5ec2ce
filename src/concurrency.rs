//! Per-request concurrency control.
//!
//! Two independent guards:
//! - a short synchronous mutex per request, held only while loading, mutating and
//!   committing a record (never across an await point). Its map entry is dropped once
//!   the last holder releases it, so the map only tracks requests being written;
//! - an in-flight generation set, so at most one generation or regeneration runs per
//!   request. A second attempt is refused immediately instead of queueing.

use crate::types::RequestId;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct RequestLockManager {
    locks: Mutex<HashMap<RequestId, Arc<Mutex<()>>>>,
    generating: Mutex<HashSet<RequestId>>,
}

impl RequestLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit lock for `request_id`, created on first use.
    pub fn get_lock(&self, request_id: RequestId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(request_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Hand back a lock obtained from [`get_lock`](Self::get_lock).
    ///
    /// The entry is removed when no other caller holds or waits on it.
    pub fn release(&self, request_id: RequestId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock();
        drop(lock);
        if locks
            .get(&request_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(&request_id);
        }
    }

    /// Claim the generation slot for `request_id`.
    ///
    /// Returns `None` if another generation already holds it. The slot is released when
    /// the returned permit drops, including on error or cancellation.
    pub fn try_begin_generation(&self, request_id: RequestId) -> Option<GenerationPermit<'_>> {
        let mut generating = self.generating.lock();
        if !generating.insert(request_id) {
            return None;
        }
        Some(GenerationPermit {
            manager: self,
            request_id,
        })
    }

}

#[cfg(test)]
impl RequestLockManager {
    pub(crate) fn tracked_locks(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Proof that the holder owns the generation slot of one request.
#[derive(Debug)]
pub struct GenerationPermit<'a> {
    manager: &'a RequestLockManager,
    request_id: RequestId,
}

impl GenerationPermit<'_> {
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }
}

impl Drop for GenerationPermit<'_> {
    fn drop(&mut self) {
        self.manager.generating.lock().remove(&self.request_id);
    }
}
