//! Error types for processor calls and checkout synchronization.

use thiserror::Error;

/// Errors from the payment processor's API.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// HTTP request failed before a response arrived.
    #[error("processor request failed: {0}")]
    RequestFailed(String),

    /// Response body did not match the expected shape.
    #[error("processor response parsing failed: {0}")]
    ParseFailed(String),

    /// Invalid or missing API key.
    #[error("processor rejected the API key")]
    Unauthorized,

    /// Too many requests.
    #[error("processor rate limit hit")]
    RateLimited,

    /// Any other non-success answer.
    #[error("processor error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error body from the processor
        message: String,
    },
}

/// Errors from the checkout synchronizer.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A processor call failed; the synchronization was aborted.
    #[error(transparent)]
    Processor(#[from] ProcessorError),

    /// The artwork image for a new product could not be resolved.
    #[error("could not resolve image for {title}: {message}")]
    Image {
        /// Cart title whose image was missing
        title: String,
        /// Underlying failure
        message: String,
    },
}
