//! Letter Request Store
//!
//! Durable storage for [`LetterRequest`] records keyed by [`RequestId`]. Writes after
//! creation go through [`RequestStore::commit`], which only succeeds when the stored record
//! still carries the revision the caller loaded. A lost race surfaces as
//! [`StorageError::RevisionMismatch`] and nothing is written.

pub mod persistence;

pub use persistence::SledRequestStore;

use crate::concurrency::RequestLockManager;
use crate::error::{ApiError, StorageError};
use crate::request::LetterRequest;
use crate::types::RequestId;
use chrono::Utc;
use tracing::debug;

/// Request store interface
pub trait RequestStore: Send + Sync {
    /// Allocate a fresh, never-reused request id.
    fn next_id(&self) -> Result<RequestId, StorageError>;

    fn get(&self, request_id: RequestId) -> Result<Option<LetterRequest>, StorageError>;

    /// Store a new record. Fails if the id is already taken.
    fn insert(&self, request: &LetterRequest) -> Result<(), StorageError>;

    /// Replace the stored record, provided its revision is still `expected_revision`.
    ///
    /// `request.revision` must already hold the new revision.
    fn commit(&self, request: &LetterRequest, expected_revision: u64) -> Result<(), StorageError>;

    /// Every stored request, in id order.
    fn list_all(&self) -> Result<Vec<LetterRequest>, StorageError>;
}

/// Load a request or fail with `RequestNotFound`.
pub fn load_request(store: &dyn RequestStore, request_id: RequestId) -> Result<LetterRequest, ApiError> {
    store
        .get(request_id)?
        .ok_or(ApiError::RequestNotFound(request_id))
}

/// Load, mutate and commit one request while holding its commit lock.
///
/// `mutate` works on a copy; if it fails nothing is written. On success the revision and
/// `updated_at` are bumped and the committed record is returned with the closure's value.
pub fn update_request<T, F>(
    store: &dyn RequestStore,
    locks: &RequestLockManager,
    request_id: RequestId,
    mutate: F,
) -> Result<(LetterRequest, T), ApiError>
where
    F: FnOnce(&mut LetterRequest) -> Result<T, ApiError>,
{
    let lock = locks.get_lock(request_id);
    let result = {
        let _guard = lock.lock();
        commit_locked(store, request_id, mutate)
    };
    locks.release(request_id, lock);
    result
}

fn commit_locked<T, F>(
    store: &dyn RequestStore,
    request_id: RequestId,
    mutate: F,
) -> Result<(LetterRequest, T), ApiError>
where
    F: FnOnce(&mut LetterRequest) -> Result<T, ApiError>,
{
    let mut request = load_request(store, request_id)?;
    let expected_revision = request.revision;
    let value = mutate(&mut request)?;
    request.revision = expected_revision + 1;
    request.updated_at = Utc::now();
    store.commit(&request, expected_revision)?;
    debug!(
        request_id = %request_id,
        revision = request.revision,
        "Committed request"
    );
    Ok((request, value))
}
