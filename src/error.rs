//! Error taxonomy for gateway operations
//!
//! Configuration errors (bad region, unresolvable credentials) are fatal and
//! terminate the process from `main`. Everything else is a recoverable error
//! value; logical non-success (missing route, id not found) is not an error
//! at all and is surfaced as boolean/empty results by the manager.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Explicit region not in the accepted region table
    #[error("invalid region '{0}', not a known API Gateway region")]
    InvalidRegion(String),

    /// No credentials from flags, profile, or environment
    #[error("no AWS credentials found (flags, profile, or environment)")]
    MissingCredentials,

    /// Named profile missing from the credentials file
    #[error("profile '{0}' not found in credentials file")]
    ProfileNotFound(String),

    #[error("failed to read {path}: {source}")]
    CredentialsFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid target URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Transport-level failure talking to the control plane
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the control plane
    #[error("gateway service error ({status}) {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },
}
