//! Exponential backoff retry for transient failures.

use crate::config::RetryConfig;
use crate::error::{CoreError, Result};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Substrings that mark an opaque error as retryable, matched
/// case-insensitively against both the message and the provider code.
const RETRYABLE_PATTERNS: &[&str] = &[
    "timeout",
    "network",
    "connection",
    "econnrefused",
    "econnreset",
    "etimedout",
    "429",
    "503",
    "504",
    "checkpoint conflict",
    "lock",
];

/// Outcome of a retried operation, with attempt diagnostics.
#[derive(Debug)]
pub struct RetryReport<T> {
    /// Final outcome: the last success, or the last error after the sequence
    /// terminated (non-retryable error or attempts exhausted).
    pub result: Result<T>,
    /// Attempts actually made, including the first.
    pub attempts: u32,
    /// Wall time from first attempt to settlement, sleeps included.
    pub total_duration: Duration,
}

impl<T> RetryReport<T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Whether retrying the same operation unchanged could plausibly succeed.
///
/// Total over the tagged variants; `External` errors fall back to substring
/// matching against the built-in list unioned with `extra_patterns`.
pub fn is_retryable(error: &CoreError, extra_patterns: &[String]) -> bool {
    match error {
        CoreError::Transient { .. } | CoreError::ToolValidation { .. } => true,
        CoreError::Authentication { .. }
        | CoreError::Integrity { .. }
        | CoreError::NotFound { .. } => false,
        CoreError::External { message, code } => {
            matches_retryable_pattern(message, code.as_deref(), extra_patterns)
        }
    }
}

pub(crate) fn matches_retryable_pattern(
    message: &str,
    code: Option<&str>,
    extra_patterns: &[String],
) -> bool {
    let message = message.to_lowercase();
    let code = code.map(str::to_lowercase);
    let haystacks = [Some(message.as_str()), code.as_deref()];

    let matches = |pattern: &str| {
        haystacks
            .iter()
            .flatten()
            .any(|haystack| haystack.contains(pattern))
    };

    RETRYABLE_PATTERNS.iter().any(|pattern| matches(pattern))
        || extra_patterns
            .iter()
            .any(|pattern| matches(&pattern.to_lowercase()))
}

/// Retry an async operation with exponential backoff and jitter.
///
/// Attempts the operation up to `config.max_attempts` times. A non-retryable
/// error terminates the sequence immediately regardless of remaining
/// attempts. The report always carries the attempt count and total duration
/// for diagnostics.
pub async fn retry_with_backoff<F, Fut, T>(mut operation: F, config: &RetryConfig) -> RetryReport<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let mut attempt: u32 = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempts = attempt, "Operation succeeded after retries");
                }
                return RetryReport {
                    result: Ok(value),
                    attempts: attempt,
                    total_duration: started.elapsed(),
                };
            }
            Err(error) => {
                if !is_retryable(&error, &config.retryable_patterns) {
                    debug!(error = %error, "Non-retryable error, not retrying");
                    return RetryReport {
                        result: Err(error),
                        attempts: attempt,
                        total_duration: started.elapsed(),
                    };
                }

                if attempt >= config.max_attempts {
                    warn!(
                        max_attempts = config.max_attempts,
                        error = %error,
                        "Retry attempts exhausted"
                    );
                    return RetryReport {
                        result: Err(error),
                        attempts: attempt,
                        total_duration: started.elapsed(),
                    };
                }

                let delay = backoff_delay(config, attempt);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Attempt failed, retrying after backoff"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Delay before the retry following the given (1-based) attempt:
/// `min(initial × multiplier^(attempt−1), max)` with symmetric ±25% jitter,
/// clamped at zero.
pub(crate) fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let base = (config.initial_delay().as_millis() as f64
        * config
            .backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32))
    .min(config.max_delay().as_millis() as f64);

    // Symmetric jitter in [-25%, +25%] of the base value.
    let jitter = (fastrand::f64() * 2.0 - 1.0) * 0.25;
    let jittered = (base * (1.0 + jitter)).max(0.0);

    Duration::from_millis(jittered as u64)
}
