//! Errors raised while setting up remote clients.
//!
//! Per-request failures never surface here: the resolver reports them as
//! `ResolveError` and the probe as "offline".

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Validate and normalize the backend base URL
pub(crate) fn normalize_base_url(url: &str) -> RemoteResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(RemoteError::InvalidUrl(url.to_string()));
    }
    Ok(trimmed.to_string())
}
