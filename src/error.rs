//! Error types.

use thiserror::Error;

/// Rejected construction-time tracker configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("n_init must be at least 1")]
    ZeroInit,

    #[error("max_age must be at least 1")]
    ZeroMaxAge,

    #[error("{name} must be finite and within {min}..={max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{0} capacity must be positive when set")]
    ZeroCapacity(&'static str),

    #[error("identity label must not be empty")]
    EmptyIdentityLabel,
}
