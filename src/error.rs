//! Configuration errors.
//!
//! Cleaning itself never fails; only building a [`crate::Cleaner`] from
//! user-supplied rules can.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid tracker pattern {0:?} (expected `name`, `prefix*` or `*suffix`)")]
    InvalidPattern(String),

    #[error("invalid redirect rule: {0}")]
    InvalidRedirectRule(String),

    #[error("max_redirect_hops must be at least 1")]
    InvalidHopLimit,
}
