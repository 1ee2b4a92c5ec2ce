//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain errors to a one-line message prefixed with their stable kind.
pub fn map_error(e: &ApiError) -> String {
    let retry = if e.is_retryable() { " (retryable)" } else { "" };
    format!("error[{}]{}: {}", e.kind(), retry, e)
}

/// Process exit code per error kind, so scripts can branch without parsing text.
pub fn exit_code(e: &ApiError) -> i32 {
    use crate::error::ErrorKind;
    match e.kind() {
        ErrorKind::Validation | ErrorKind::Binding => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Permission => 4,
        ErrorKind::State | ErrorKind::Conflict => 5,
        ErrorKind::Generation => 6,
        ErrorKind::Config => 78,
        ErrorKind::Storage | ErrorKind::Render => 1,
    }
}
