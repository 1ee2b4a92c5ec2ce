//! Request status state machine.
//!
//! Encodes the legal edges of a letter request's lifecycle and the guards used by every
//! mutating operation. Terminal states accept no further mutation; reads are never
//! guarded here.
//!
//! ```text
//! requested   → in_progress | rejected | canceled
//! in_progress → draft | canceled
//! draft       → in_review | completed | canceled
//! in_review   → draft | completed | canceled
//! ```

use crate::error::StateError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Created by the applicant, awaiting the referee's decision.
    Requested,
    /// Accepted by the referee; no draft generated yet.
    InProgress,
    Draft,
    InReview,
    /// Approved by the referee. Terminal.
    Completed,
    /// Declined by the referee. Terminal.
    Rejected,
    /// Withdrawn by either party. Terminal.
    Canceled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 7] = [
        RequestStatus::Requested,
        RequestStatus::InProgress,
        RequestStatus::Draft,
        RequestStatus::InReview,
        RequestStatus::Completed,
        RequestStatus::Rejected,
        RequestStatus::Canceled,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Completed | RequestStatus::Rejected | RequestStatus::Canceled
        )
    }

    /// Statuses in which letter content may be edited, restored or cleared.
    pub fn is_editable(self) -> bool {
        matches!(self, RequestStatus::Draft | RequestStatus::InReview)
    }

    /// Statuses from which a generation may be started.
    pub fn accepts_generation(self) -> bool {
        matches!(
            self,
            RequestStatus::InProgress | RequestStatus::Draft | RequestStatus::InReview
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Requested => "requested",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Draft => "draft",
            RequestStatus::InReview => "in_review",
            RequestStatus::Completed => "completed",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Canceled => "canceled",
        }
    }

    /// Validate the edge `self → to` and return the target status.
    pub fn transition_to(self, to: RequestStatus) -> Result<RequestStatus, StateError> {
        if is_legal_transition(self, to) {
            Ok(to)
        } else {
            Err(StateError::IllegalTransition { from: self, to })
        }
    }

    /// Fail with a [`StateError`] unless `allowed` holds for the current status.
    ///
    /// Terminal statuses always fail.
    pub fn ensure(
        self,
        operation: &'static str,
        allowed: fn(RequestStatus) -> bool,
    ) -> Result<(), StateError> {
        if self.is_terminal() || !allowed(self) {
            return Err(StateError::OperationNotPermitted {
                status: self,
                operation,
            });
        }
        Ok(())
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown request status: {}", s))
    }
}

fn is_legal_transition(from: RequestStatus, to: RequestStatus) -> bool {
    use RequestStatus::*;

    if to == Canceled && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (Requested, InProgress)
            | (Requested, Rejected)
            | (InProgress, Draft)
            | (Draft, InReview)
            | (InReview, Draft)
            | (Draft, Completed)
            | (InReview, Completed)
    )
}

/// A recorded status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub at: DateTime<Utc>,
    /// User id of the caller that caused the change.
    pub actor: String,
    pub reason: Option<String>,
}
