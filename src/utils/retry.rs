//! Retry utilities: backoff builders and retryable error classification.
//!
//! Uses `backon` for exponential backoff with jitter.

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::error::InteractionError;

/// Backoff for writes that lost a lock or unique-key race.
///
/// - Min delay: 5ms
/// - Max delay: 250ms
/// - Max attempts: 5
/// - Jitter enabled
pub fn conflict_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(5))
        .with_max_delay(Duration::from_millis(250))
        .with_max_times(5)
        .with_jitter()
}

/// Backoff for opening storage at process startup.
///
/// - Min delay: 100ms
/// - Max delay: 5s
/// - Max attempts: 30
/// - Jitter enabled
pub fn connection_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(5))
        .with_max_times(30)
        .with_jitter()
}

/// Only conflicts are retried; validation and permission failures never change on retry.
pub fn is_retryable(err: &InteractionError) -> bool {
    err.is_retryable()
}
