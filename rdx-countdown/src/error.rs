//! Error types for countdown configuration and initialization.

use thiserror::Error;

/// Errors raised while resolving configuration or initializing a countdown.
///
/// Every variant surfaces synchronously from initialization (or `restart`);
/// a failed initialization leaves no hands mounted and no tick registration.
#[derive(Debug, Error)]
pub enum CountdownError {
    #[error("the notify config must be a positive number of seconds, got {0}")]
    InvalidNotify(f64),

    #[error("left_time must be a finite, non-negative number of seconds, got {0}")]
    InvalidLeftTime(f64),

    #[error("stop_time must not be negative, got {0}")]
    NegativeStopTime(i64),

    #[error("the clock radix table must contain at least one unit")]
    EmptyRadixTable,

    #[error("invalid radix entry for unit `{unit}`: radix and bits must be positive")]
    InvalidRadix { unit: String },

    #[error("invalid placeholder pattern")]
    Pattern(#[from] regex::Error),

    #[error("failed to load countdown configuration")]
    Config(#[from] config::ConfigError),
}
