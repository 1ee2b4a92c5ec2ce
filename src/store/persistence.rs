//! Persistence layer for the request store

use crate::error::StorageError;
use crate::request::LetterRequest;
use crate::store::RequestStore;
use crate::types::RequestId;
use std::path::Path;

/// Sled-based implementation of RequestStore
pub struct SledRequestStore {
    db: sled::Db,
}

impl SledRequestStore {
    /// Open (or create) a store at the given directory.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| io_error("Failed to open sled database", e))?;
        Ok(Self { db })
    }

    /// In-memory store removed on drop.
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| io_error("Failed to open temporary sled database", e))?;
        Ok(Self { db })
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db
            .flush()
            .map_err(|e| io_error("Failed to flush database", e))?;
        Ok(())
    }
}

fn io_error(context: &str, err: sled::Error) -> StorageError {
    StorageError::IoError(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("{}: {}", context, err),
    ))
}

fn encode(request: &LetterRequest) -> Result<Vec<u8>, StorageError> {
    bincode::serialize(request).map_err(|e| StorageError::Encode(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<LetterRequest, StorageError> {
    bincode::deserialize(bytes).map_err(|e| StorageError::Decode(e.to_string()))
}

impl RequestStore for SledRequestStore {
    fn next_id(&self) -> Result<RequestId, StorageError> {
        // sled ids start at 0; keep 0 unused so ids read naturally.
        let raw = self
            .db
            .generate_id()
            .map_err(|e| io_error("Failed to allocate request id", e))?;
        Ok(RequestId::new(raw + 1))
    }

    fn get(&self, request_id: RequestId) -> Result<Option<LetterRequest>, StorageError> {
        match self
            .db
            .get(request_id.to_key())
            .map_err(|e| io_error("Failed to get request", e))?
        {
            Some(value) => Ok(Some(decode(&value)?)),
            None => Ok(None),
        }
    }

    fn insert(&self, request: &LetterRequest) -> Result<(), StorageError> {
        let value = encode(request)?;
        self.db
            .compare_and_swap(request.id.to_key(), None as Option<&[u8]>, Some(value))
            .map_err(|e| io_error("Failed to insert request", e))?
            .map_err(|_| StorageError::AlreadyExists(request.id))
    }

    fn commit(&self, request: &LetterRequest, expected_revision: u64) -> Result<(), StorageError> {
        let key = request.id.to_key();
        let value = encode(request)?;
        loop {
            let current = self
                .db
                .get(key)
                .map_err(|e| io_error("Failed to get request", e))?
                .ok_or(StorageError::Missing(request.id))?;
            let stored = decode(&current)?;
            if stored.revision != expected_revision {
                return Err(StorageError::RevisionMismatch {
                    request_id: request.id,
                    expected: expected_revision,
                    found: stored.revision,
                });
            }
            let swapped = self
                .db
                .compare_and_swap(key, Some(current), Some(value.clone()))
                .map_err(|e| io_error("Failed to commit request", e))?;
            // Bytes changed between read and swap: re-read and compare revisions again.
            if swapped.is_ok() {
                return Ok(());
            }
        }
    }

    fn list_all(&self) -> Result<Vec<LetterRequest>, StorageError> {
        let mut requests = Vec::new();
        for item in self.db.iter() {
            let (key, value) = item.map_err(|e| io_error("Failed to iterate store", e))?;
            if RequestId::from_key(&key).is_none() {
                continue;
            }
            requests.push(decode(&value)?);
        }
        Ok(requests)
    }
}
