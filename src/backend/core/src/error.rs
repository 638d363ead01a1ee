//! Error handling for the job runner.
//!
//! One central error type with a retryability classification: the trigger
//! transport redelivers a failed message only when the error class makes a
//! retry worthwhile.

use thiserror::Error;

/// A specialized Result type for job operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Record-store failures propagate out of a pass untouched; the caller
    /// marks the triggering message as failed/retryable.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {service} after {attempts} attempts")]
    RateLimited { service: &'static str, attempts: u32 },

    #[error("auth token unavailable: {0}")]
    Auth(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("unknown job: {0}")]
    UnknownJob(String),
}

impl Error {
    /// Whether redelivering the triggering message may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(_) | Self::Http(_) | Self::RateLimited { .. } => true,
            Self::Auth(_) | Self::Config(_) | Self::UnknownJob(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_failures_are_retryable() {
        let error = Error::RateLimited {
            service: "feedback template",
            attempts: 3,
        };
        assert!(error.is_retryable());
        assert!(Error::Database(sqlx::Error::PoolClosed).is_retryable());
    }

    #[test]
    fn operator_errors_are_not_retryable() {
        assert!(!Error::UnknownJob("frobnicate".to_string()).is_retryable());
        assert!(!Error::Auth("token URL is not configured".to_string()).is_retryable());
    }
}
