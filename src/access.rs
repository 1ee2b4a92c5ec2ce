//! Caller identity and ownership checks.
//!
//! Identity is established upstream; the workflow only decides whether an already
//! verified caller owns the request it is acting on.

use crate::error::ApiError;
use crate::request::LetterRequest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of an authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Writes, edits and finalizes letters
    Referee,
    /// Subject of the letter; opens requests
    Applicant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Referee => f.write_str("referee"),
            Role::Applicant => f.write_str("applicant"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "referee" => Ok(Role::Referee),
            "applicant" => Ok(Role::Applicant),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            role,
        }
    }

    pub fn referee(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self::new(user_id, email, Role::Referee)
    }

    pub fn applicant(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self::new(user_id, email, Role::Applicant)
    }

    fn email_matches(&self, other: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(other.trim())
    }

    pub fn is_assigned_referee(&self, request: &LetterRequest) -> bool {
        self.role == Role::Referee && request.referee_id.as_deref() == Some(self.user_id.as_str())
    }

    pub fn is_applicant_of(&self, request: &LetterRequest) -> bool {
        self.role == Role::Applicant && self.email_matches(&request.applicant_email)
    }

    /// Verify the caller is the referee who accepted the request.
    pub fn verify_referee(&self, request: &LetterRequest) -> Result<(), ApiError> {
        if !self.is_assigned_referee(request) {
            return Err(ApiError::Permission(format!(
                "User {} (role: {}) is not the referee of request {}",
                self.user_id, self.role, request.id
            )));
        }
        Ok(())
    }

    /// Verify the caller is the referee the applicant invited.
    ///
    /// Used before acceptance, when no referee id is bound yet.
    pub fn verify_invited_referee(&self, request: &LetterRequest) -> Result<(), ApiError> {
        let bound_to_other = request
            .referee_id
            .as_deref()
            .is_some_and(|id| id != self.user_id);
        if self.role != Role::Referee || !self.email_matches(&request.referee_email) || bound_to_other
        {
            return Err(ApiError::Permission(format!(
                "User {} (role: {}) was not invited to referee request {}",
                self.user_id, self.role, request.id
            )));
        }
        Ok(())
    }

    /// Verify the caller is either side of the request (reads and cancellation).
    pub fn verify_participant(&self, request: &LetterRequest) -> Result<(), ApiError> {
        let invited = self.role == Role::Referee
            && request.referee_id.is_none()
            && self.email_matches(&request.referee_email);
        if self.is_assigned_referee(request) || self.is_applicant_of(request) || invited {
            return Ok(());
        }
        Err(ApiError::Permission(format!(
            "User {} (role: {}) has no access to request {}",
            self.user_id, self.role, request.id
        )))
    }
}
