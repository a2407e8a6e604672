//! Opt-in error boundary for graceful degradation.

use crate::error::Result;
use crate::resilience::classifier::classify_error;
use std::future::Future;
use tracing::error;

/// Execute an operation; on failure, classify and log the error tagged with
/// `context`, then either return `fallback` or propagate the error.
///
/// This is the one place a failure may be converted into a fallback value.
/// The queue and the retry helper never degrade silently, since swallowing a
/// queue-full or retry-exhausted condition would hide backpressure from the
/// caller.
pub async fn with_error_boundary<F, Fut, T>(
    operation: F,
    context: &str,
    fallback: Option<T>,
) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match operation().await {
        Ok(value) => Ok(value),
        Err(err) => {
            let classification = classify_error(&err);
            error!(
                context = %context,
                category = %classification.category,
                severity = ?classification.severity,
                retryable = classification.retryable,
                technical_message = %classification.technical_message,
                "Operation failed inside error boundary"
            );
            match fallback {
                Some(value) => Ok(value),
                None => Err(err),
            }
        }
    }
}
