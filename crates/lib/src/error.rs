//! Fault taxonomy for the relay pipeline.
//!
//! Both variants terminate a single relay task; neither ever crosses back
//! into the delivery loop.

use thiserror::Error;

/// Payload materialization failed. The relay maps every variant to a
/// `Failure { reason: "download failed" }` outcome and logs the cause.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("telegram request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("telegram api error: {0}")]
    Api(String),

    #[error("event has no media attachment")]
    NoMedia,
}

/// Upload step failed: transport error or timeout, non-success HTTP status,
/// or a response body the configured mapping rejects.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upload endpoint returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The endpoint answered with a well-formed body that does not carry the
    /// success marker. The raw body is kept for observability.
    #[error("upload endpoint rejected the file: {0}")]
    Rejected(String),

    #[error("malformed upload response: {0}")]
    Malformed(String),
}
