//! Semaphore-backed request queue with a waiting cap and FIFO promotion.

use crate::config::QueueConfig;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, warn};
use uuid::Uuid;

/// Errors surfaced by [`RequestQueue::enqueue`].
///
/// `Full` and `Cleared` are expected operating conditions under load, not
/// bugs; callers should surface them to the end user as actionable messages.
#[derive(Debug, thiserror::Error)]
pub enum QueueError<E> {
    /// The waiting list is at capacity; the request was never admitted.
    #[error("request queue is full ({waiting} waiting, limit {max_queue_size}); service is busy, please retry shortly")]
    Full {
        waiting: usize,
        max_queue_size: usize,
    },

    /// The queue was cleared while this request was still waiting.
    #[error("request queue was cleared before this request started")]
    Cleared,

    /// The operation itself failed; the error is propagated unchanged.
    #[error("operation failed: {0}")]
    Operation(E),
}

/// Observability snapshot. No side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub waiting: usize,
    pub active: usize,
    pub max_concurrent: usize,
    pub max_queue_size: usize,
}

/// Bounded FIFO queue limiting in-flight operations.
///
/// Cloning produces another handle to the same queue.
#[derive(Debug, Clone)]
pub struct RequestQueue {
    inner: Arc<QueueInner>,
}

#[derive(Debug)]
struct QueueInner {
    config: QueueConfig,
    slots: Semaphore,
    waiting: AtomicUsize,
    active: AtomicUsize,
    /// Bumped by `clear()`; waiters admitted under an older epoch abort.
    epoch: watch::Sender<u64>,
}

impl RequestQueue {
    /// Create a queue with the given bounds.
    pub fn new(config: QueueConfig) -> Self {
        let (epoch, _) = watch::channel(0);
        debug!(
            max_concurrent = config.max_concurrent,
            max_queue_size = config.max_queue_size,
            "Request queue initialized"
        );
        Self {
            inner: Arc::new(QueueInner {
                slots: Semaphore::new(config.max_concurrent),
                config,
                waiting: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                epoch,
            }),
        }
    }

    /// Admit an operation and run it once a concurrency slot frees.
    ///
    /// Returns the operation's own outcome wrapped in
    /// [`QueueError::Operation`] on failure. Fails immediately with
    /// [`QueueError::Full`] when the waiting list is at capacity, and with
    /// [`QueueError::Cleared`] if [`clear`](Self::clear) runs before this
    /// request is promoted. Waiting entries are served strictly FIFO.
    pub async fn enqueue<F, Fut, T, E>(&self, operation: F) -> Result<T, QueueError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let inner = &*self.inner;

        // Reserve a waiting slot or reject synchronously. Compare-exchange so
        // concurrent arrivals cannot overshoot the cap.
        let mut current = inner.waiting.load(Ordering::Acquire);
        loop {
            if current >= inner.config.max_queue_size {
                warn!(
                    waiting = current,
                    max_queue_size = inner.config.max_queue_size,
                    "Request rejected: queue full"
                );
                return Err(QueueError::Full {
                    waiting: current,
                    max_queue_size: inner.config.max_queue_size,
                });
            }
            match inner.waiting.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }

        // Decrement on every exit path, including the caller dropping this
        // future before promotion.
        let waiting_guard = CounterGuard(&inner.waiting);

        let request_id = Uuid::new_v4();
        let enqueued_at = Instant::now();
        let mut epoch_rx = inner.epoch.subscribe();
        let admitted_epoch = *epoch_rx.borrow();

        debug!(
            request_id = %request_id,
            waiting = inner.waiting.load(Ordering::Relaxed),
            active = inner.active.load(Ordering::Relaxed),
            "Request admitted to queue"
        );

        // Race slot acquisition against a clear() epoch bump. The semaphore
        // queues acquirers fairly, which gives the FIFO guarantee.
        let permit = tokio::select! {
            permit = inner.slots.acquire() => match permit {
                Ok(permit) => permit,
                // Semaphore is never closed while the queue is alive.
                Err(_) => return Err(QueueError::Cleared),
            },
            _ = epoch_advanced(&mut epoch_rx, admitted_epoch) => {
                debug!(request_id = %request_id, "Request rejected: queue cleared while waiting");
                return Err(QueueError::Cleared);
            }
        };

        drop(waiting_guard);
        inner.active.fetch_add(1, Ordering::AcqRel);
        let active_guard = CounterGuard(&inner.active);

        debug!(
            request_id = %request_id,
            queue_time_ms = enqueued_at.elapsed().as_millis() as u64,
            active = inner.active.load(Ordering::Relaxed),
            "Request promoted to active"
        );

        let result = operation().await;

        drop(active_guard);
        drop(permit);

        match result {
            Ok(value) => {
                debug!(
                    request_id = %request_id,
                    total_time_ms = enqueued_at.elapsed().as_millis() as u64,
                    "Request settled successfully"
                );
                Ok(value)
            }
            Err(error) => {
                debug!(
                    request_id = %request_id,
                    total_time_ms = enqueued_at.elapsed().as_millis() as u64,
                    "Request settled with operation failure"
                );
                Err(QueueError::Operation(error))
            }
        }
    }

    /// Reject every currently-waiting entry. In-flight operations are
    /// unaffected and keep their slots until they settle.
    pub fn clear(&self) {
        let waiting = self.inner.waiting.load(Ordering::Acquire);
        if waiting > 0 {
            warn!(waiting, "Clearing request queue: rejecting waiting entries");
        }
        self.inner.epoch.send_modify(|epoch| *epoch += 1);
    }

    /// Snapshot of current queue occupancy and configured limits.
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            waiting: self.inner.waiting.load(Ordering::Acquire),
            active: self.inner.active.load(Ordering::Acquire),
            max_concurrent: self.inner.config.max_concurrent,
            max_queue_size: self.inner.config.max_queue_size,
        }
    }
}

/// Decrements the counter when dropped, so occupancy gauges stay accurate
/// even when an `enqueue` future is dropped mid-wait or mid-operation.
struct CounterGuard<'a>(&'a AtomicUsize);

impl Drop for CounterGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Resolve once the epoch moves past the value observed at admission.
async fn epoch_advanced(rx: &mut watch::Receiver<u64>, admitted: u64) {
    loop {
        if *rx.borrow() > admitted {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender dropped means the queue itself is gone; park forever and
            // let the other select arm decide.
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::time::sleep;
    use tokio_test::assert_ok;

    fn queue(max_concurrent: usize, max_queue_size: usize) -> RequestQueue {
        RequestQueue::new(QueueConfig {
            max_concurrent,
            max_queue_size,
        })
    }

    #[tokio::test]
    async fn test_enqueue_returns_operation_outcome() {
        let queue = queue(2, 4);
        let result = queue.enqueue(|| async { Ok::<_, CoreError>(41 + 1) }).await;
        let value = assert_ok!(result);
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_operation_failure_propagates_unchanged() {
        let queue = queue(2, 4);
        let result = queue
            .enqueue(|| async {
                Err::<(), _>(CoreError::NotFound {
                    message: "essay 7".to_string(),
                })
            })
            .await;
        match result {
            Err(QueueError::Operation(CoreError::NotFound { message })) => {
                assert_eq!(message, "essay 7");
            }
            other => panic!("expected propagated operation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_concurrency_bound_never_exceeded() {
        let queue = queue(2, 10);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let queue = queue.clone();
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .enqueue(|| async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        sleep(Duration::from_millis(30)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, CoreError>(())
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_overflow_rejected_immediately() {
        let queue = queue(1, 2);

        // Occupy the single slot.
        let blocker = {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue
                    .enqueue(|| async {
                        sleep(Duration::from_millis(200)).await;
                        Ok::<_, CoreError>(())
                    })
                    .await
            })
        };
        sleep(Duration::from_millis(20)).await;

        // Fill the waiting list.
        let mut waiters = Vec::new();
        for _ in 0..2 {
            let queue = queue.clone();
            waiters.push(tokio::spawn(async move {
                queue
                    .enqueue(|| async { Ok::<_, CoreError>(()) })
                    .await
            }));
        }
        sleep(Duration::from_millis(20)).await;
        assert_eq!(queue.stats().waiting, 2);

        // One more must be rejected without joining the list.
        let result = queue
            .enqueue(|| async { Ok::<_, CoreError>(()) })
            .await;
        assert!(matches!(result, Err(QueueError::Full { .. })));
        assert_eq!(queue.stats().waiting, 2);

        blocker.await.unwrap().unwrap();
        for waiter in waiters {
            waiter.await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn test_fifo_start_order() {
        let queue = queue(1, 8);
        let started = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for index in 0..5u32 {
            let queue = queue.clone();
            let started = started.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .enqueue(|| async move {
                        started.lock().push(index);
                        sleep(Duration::from_millis(10)).await;
                        Ok::<_, CoreError>(index)
                    })
                    .await
            }));
            // Give each enqueue time to reach the semaphore before the next.
            sleep(Duration::from_millis(15)).await;
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(*started.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_clear_rejects_waiting_only() {
        let queue = queue(1, 4);

        let blocker = {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue
                    .enqueue(|| async {
                        sleep(Duration::from_millis(100)).await;
                        Ok::<_, CoreError>("active survived")
                    })
                    .await
            })
        };
        sleep(Duration::from_millis(20)).await;

        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue
                    .enqueue(|| async { Ok::<_, CoreError>("should not run") })
                    .await
            })
        };
        sleep(Duration::from_millis(20)).await;
        assert_eq!(queue.stats().waiting, 1);

        queue.clear();

        let cleared = waiter.await.unwrap();
        assert!(matches!(cleared, Err(QueueError::Cleared)));
        assert_eq!(blocker.await.unwrap().unwrap(), "active survived");
    }

    #[tokio::test]
    async fn test_drain_reports_zero() {
        let queue = queue(2, 8);
        let mut handles = Vec::new();
        for _ in 0..5 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .enqueue(|| async {
                        sleep(Duration::from_millis(10)).await;
                        Ok::<_, CoreError>(())
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stats = queue.stats();
        assert_eq!(stats.waiting, 0);
        assert_eq!(stats.active, 0);
        assert_eq!(stats.max_concurrent, 2);
        assert_eq!(stats.max_queue_size, 8);
    }

    #[tokio::test]
    async fn test_enqueue_after_clear_admits_normally() {
        let queue = queue(1, 2);
        queue.clear();
        let value = queue
            .enqueue(|| async { Ok::<_, CoreError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
