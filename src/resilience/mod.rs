//! # Resilience Module
//!
//! Retry with exponential backoff and jitter, an error severity/retryability
//! taxonomy, best-effort repair of LLM-produced JSON, and an opt-in error
//! boundary for graceful degradation.
//!
//! ## Architecture
//!
//! - **Retry**: `retry_with_backoff` re-executes an operation on transient
//!   failures, growing the delay multiplicatively with symmetric jitter.
//! - **Classification**: `classify_error` maps every [`CoreError`] to a
//!   severity, a retryability verdict, a category label, and a fixed
//!   user-facing message; only opaque third-party errors fall back to
//!   message-substring rules.
//! - **Repair**: `safe_json_parse` and `extract_json_from_text` recover
//!   structured data from model output that is not strict JSON.
//! - **Boundary**: `with_error_boundary` converts a failure into a fallback
//!   value where the caller explicitly opts in; queue-full and
//!   retry-exhausted conditions are never swallowed by default.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use counsel_core::config::RetryConfig;
//! use counsel_core::resilience::retry_with_backoff;
//! use counsel_core::CoreError;
//!
//! # async fn example() {
//! let config = RetryConfig::default();
//! let report = retry_with_backoff(
//!     || async { Err::<String, _>(CoreError::external("connection reset")) },
//!     &config,
//! )
//! .await;
//!
//! println!("{} attempts over {:?}", report.attempts, report.total_duration);
//! # }
//! ```
//!
//! [`CoreError`]: crate::CoreError

pub mod boundary;
pub mod classifier;
pub mod repair;
pub mod retry;

pub use boundary::with_error_boundary;
pub use classifier::{
    classify_error, ErrorCategory, ErrorClassification, ErrorSeverity,
};
pub use repair::{extract_json_from_text, safe_json_parse};
pub use retry::{is_retryable, retry_with_backoff, RetryReport};
