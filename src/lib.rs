//! Letterflow: version-controlled recommendation letter workflow
//!
//! Applicants open letter requests, referees accept them and generate drafts through a
//! pluggable text-generation provider. Every draft, edit and restoration becomes an
//! immutable numbered snapshot in the request's history, and a status state machine governs
//! which operations are allowed until the letter is approved.

pub mod access;
pub mod api;
pub mod binding;
pub mod cli;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod generation;
pub mod ledger;
pub mod logging;
pub mod provider;
pub mod regeneration;
pub mod render;
pub mod request;
pub mod status;
pub mod store;
pub mod template;
pub mod types;

pub use access::{Caller, Role};
pub use api::LetterApi;
pub use error::{ApiError, ErrorKind};
pub use types::{RequestId, Version};
