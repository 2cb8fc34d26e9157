//! Error taxonomy for the collection pipeline.

use thiserror::Error;

/// Errors surfaced by the library.
///
/// Inside a collection cycle these are caught per item and recorded in the
/// cycle result; only tier validation and total configuration failures reach
/// callers as hard errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller requested a tier outside the supported set. Rejected before any
    /// network call is made.
    #[error("unsupported tier: {0}")]
    UnsupportedTier(String),

    /// The fetcher used all retry attempts without a usable response.
    #[error("fetch exhausted after {attempts} attempts: {detail}")]
    FetchExhausted {
        attempts: u32,
        /// Status of the last attempt, if it got as far as a response.
        last_status: Option<u16>,
        detail: String,
    },

    /// Upstream answered with a non-success status that is not retryable.
    #[error("HTTP {status} from {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
