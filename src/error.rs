use thiserror::Error;

/// Failures surfaced by the hosted backend.
///
/// Nothing in this crate propagates these to the UI as a crash: the redirect
/// engine aborts its decision (never redirect on uncertain state), while the
/// caches and the route gate degrade to least privilege.
#[derive(Debug, Error, Clone)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
