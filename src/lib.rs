#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Counsel Core
//!
//! In-process reliability core for an AI-assisted counseling platform.
//!
//! ## Overview
//!
//! Route handlers in the hosting web application talk to expensive, flaky
//! external collaborators: an LLM provider and a relational store. This crate
//! provides the three small components that make those calls survivable in
//! production, with no dependency on each other:
//!
//! - [`queue`] - bounded FIFO request queue throttling concurrent backend calls
//! - [`cache`] - per-tenant TTL cache for parameterized query results
//! - [`resilience`] - retry with exponential backoff, error classification,
//!   JSON repair for LLM output, and an opt-in error boundary
//!
//! Supporting modules:
//!
//! - [`config`] - environment-aware tunables for all three components
//! - [`error`] - the closed error-variant set the classifier is total over
//! - [`logging`] - structured console + JSON file logging
//!
//! ## Concurrency Model
//!
//! Everything runs as interleaved tasks on the tokio runtime; the queue's
//! concurrency bound protects a rate-limited downstream backend, not CPU.
//! All shared state is internally synchronized (semaphore, atomics, sharded
//! map), so instances can be shared freely across tasks and threads.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use counsel_core::config::CoreConfig;
//! use counsel_core::queue::RequestQueue;
//! use counsel_core::resilience::retry_with_backoff;
//! use counsel_core::CoreError;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CoreConfig::from_environment();
//! config.validate()?;
//!
//! let queue = RequestQueue::new(config.queue.clone());
//! let retry = config.retry.clone();
//!
//! let completion = queue
//!     .enqueue(|| async {
//!         let report = retry_with_backoff(
//!             || async {
//!                 // LLM invocation here
//!                 Ok::<_, CoreError>("essay feedback".to_string())
//!             },
//!             &retry,
//!         )
//!         .await;
//!         report.result
//!     })
//!     .await?;
//!
//! println!("{completion}");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod queue;
pub mod resilience;

pub use cache::{CacheKey, CacheStats, QueryCache};
pub use config::{CacheConfig, CoreConfig, QueueConfig, RetryConfig};
pub use error::{CoreError, Result};
pub use queue::{QueueError, QueueStats, RequestQueue};
pub use resilience::{
    classify_error, extract_json_from_text, is_retryable, retry_with_backoff, safe_json_parse,
    with_error_boundary, ErrorCategory, ErrorClassification, ErrorSeverity, RetryReport,
};
