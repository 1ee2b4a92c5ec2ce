//! Version History Ledger
//!
//! Append-only snapshot list kept on each [`LetterRequest`]. Every generation, manual edit
//! and restoration appends one immutable [`VersionSnapshot`]; restoring an old version never
//! rewrites history, it appends a copy tagged as a restoration. Only `clear_history` drops
//! entries, and it leaves a [`HistoryClearance`] marker behind.

use crate::error::{ApiError, StorageError};
use crate::request::LetterRequest;
use crate::types::Version;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// How a snapshot came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotOrigin {
    Generation,
    Regeneration,
    Restoration,
    ManualEdit,
}

impl fmt::Display for SnapshotOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            SnapshotOrigin::Generation => "generation",
            SnapshotOrigin::Regeneration => "regeneration",
            SnapshotOrigin::Restoration => "restoration",
            SnapshotOrigin::ManualEdit => "manual_edit",
        };
        f.write_str(tag)
    }
}

/// Immutable recorded state of the letter content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    pub version: Version,
    pub origin: SnapshotOrigin,
    /// Model id the provider reported back
    pub model_used: String,
    /// Model id the caller asked for
    pub selected_model: String,
    pub tokens_used: u32,
    pub created_at: DateTime<Utc>,
    pub content: String,
    /// BLAKE3 of `content`, hex encoded
    pub content_hash: String,
    /// Source version when `origin` is a restoration
    pub restored_from: Option<Version>,
}

impl VersionSnapshot {
    pub fn verify(&self) -> bool {
        content_hash(&self.content) == self.content_hash
    }
}

/// Everything needed to append a snapshot; the ledger assigns version and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotDraft {
    pub origin: SnapshotOrigin,
    pub content: String,
    pub model_used: String,
    pub selected_model: String,
    pub tokens_used: u32,
    pub restored_from: Option<Version>,
}

/// Record that history was discarded. Content is not retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryClearance {
    pub cleared_at: DateTime<Utc>,
    pub discarded_versions: u32,
    pub actor: String,
}

pub fn content_hash(content: &str) -> String {
    hex::encode(blake3::hash(content.as_bytes()).as_bytes())
}

impl LetterRequest {
    /// Append a snapshot at `current_version`, make it current, and advance the counter.
    pub fn append_snapshot(&mut self, draft: SnapshotDraft) -> &VersionSnapshot {
        let snapshot = VersionSnapshot {
            version: self.current_version,
            origin: draft.origin,
            model_used: draft.model_used,
            selected_model: draft.selected_model,
            tokens_used: draft.tokens_used,
            created_at: Utc::now(),
            content_hash: content_hash(&draft.content),
            content: draft.content,
            restored_from: draft.restored_from,
        };
        self.current_content = snapshot.content.clone();
        self.current_version += 1;
        self.history.push(snapshot);
        &self.history[self.history.len() - 1]
    }

    pub fn snapshot(&self, version: Version) -> Option<&VersionSnapshot> {
        self.history.iter().find(|s| s.version == version)
    }

    /// Fetch a version, checking its content hash.
    pub fn verified_snapshot(&self, version: Version) -> Result<&VersionSnapshot, ApiError> {
        let snapshot = self.snapshot(version).ok_or(ApiError::VersionNotFound {
            request_id: self.id,
            version,
        })?;
        if !snapshot.verify() {
            return Err(StorageError::Corrupted {
                request_id: self.id,
                version,
            }
            .into());
        }
        Ok(snapshot)
    }

    pub fn latest_snapshot(&self) -> Option<&VersionSnapshot> {
        self.history.last()
    }

    /// Make `version`'s content current by appending a restoration entry.
    pub fn restore_version(&mut self, version: Version) -> Result<&VersionSnapshot, ApiError> {
        let source = self.verified_snapshot(version)?.clone();
        let request_id = self.id;
        let restored = self.append_snapshot(SnapshotDraft {
            origin: SnapshotOrigin::Restoration,
            content: source.content,
            model_used: source.model_used,
            selected_model: source.selected_model,
            tokens_used: 0,
            restored_from: Some(version),
        });
        info!(
            request_id = %request_id,
            restored_from = version,
            new_version = restored.version,
            "Restored letter version"
        );
        Ok(restored)
    }

    /// Discard every snapshot and restart numbering at 1. Current content is kept.
    pub fn clear_history(&mut self, actor: &str) -> HistoryClearance {
        let clearance = HistoryClearance {
            cleared_at: Utc::now(),
            discarded_versions: self.history.len() as u32,
            actor: actor.to_string(),
        };
        self.history.clear();
        self.current_version = 1;
        self.clearances.push(clearance.clone());
        info!(
            request_id = %self.id,
            discarded = clearance.discarded_versions,
            "Cleared letter history"
        );
        clearance
    }
}
