//! # Bounded Request Queue
//!
//! Throttles concurrent calls to an expensive external backend (typically an
//! LLM provider). Requests beyond the concurrency limit wait in FIFO order up
//! to a cap; overflow is rejected immediately so callers see backpressure
//! instead of unbounded queuing.
//!
//! ## Architecture
//!
//! - **Semaphore scheduling**: a fair `tokio` semaphore wakes the oldest
//!   waiter the instant a slot frees, preserving FIFO order without a poll
//!   interval.
//! - **Explicit instances**: the queue is a cheaply-cloneable handle created
//!   from [`QueueConfig`](crate::config::QueueConfig) and injected into
//!   callers; tests construct fresh instances.
//! - **Backpressure as errors**: overflow and clearing surface as distinct
//!   [`QueueError`] variants rather than generic failures.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use counsel_core::config::QueueConfig;
//! use counsel_core::queue::RequestQueue;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = RequestQueue::new(QueueConfig::default());
//!
//! let reply = queue
//!     .enqueue(|| async {
//!         // LLM invocation here
//!         Ok::<_, counsel_core::CoreError>("completion text".to_string())
//!     })
//!     .await?;
//!
//! println!("got {reply}, stats: {:?}", queue.stats());
//! # Ok(())
//! # }
//! ```

pub mod request_queue;

pub use request_queue::{QueueError, QueueStats, RequestQueue};
