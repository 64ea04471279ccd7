//! # Delivery Queue Module
//!
//! Generic, thread-safe FIFO with a dedicated background worker that
//! drains items through a caller-supplied delivery handler.
//!
//! This module handles:
//! - Decoupling telemetry production from network delivery
//! - Buffering across transient connectivity loss
//! - Head-first retry of failed deliveries without item loss
//! - Cooperative worker shutdown with a bounded abort fallback
//!
//! ## Known limitations
//!
//! - Capacity is unbounded: a long outage grows the queue without limit.
//! - Retries have no backoff and no cap: a permanently undeliverable
//!   item stalls the head of the queue forever. The trade is deliberate;
//!   an accepted item is never silently dropped.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::config::QueueConfig;
use crate::error::Result;
use crate::worker::WorkerHandle;

/// Per-item delivery attempt invoked by the queue worker
///
/// The boolean result decides the item's fate: `Ok(true)` removes it,
/// `Ok(false)` keeps it at the head for retry. An `Err` is logged and
/// treated like `Ok(false)`.
#[async_trait]
pub trait DeliveryHandler<T>: Send + Sync {
    async fn deliver(&self, item: &T) -> Result<bool>;
}

/// FIFO queue with a single background delivery worker
///
/// Producers hand items over with [`enqueue`](DeliveryQueue::enqueue) and
/// relinquish ownership; the queue owns each item until it is delivered
/// or cleared. Items are volatile: nothing survives a process restart.
pub struct DeliveryQueue<T> {
    items: Arc<Mutex<VecDeque<T>>>,
    notify: Arc<Notify>,
    handler: Arc<dyn DeliveryHandler<T>>,
    worker: AsyncMutex<Option<WorkerHandle>>,
    poll_interval: Duration,
    send_delay: Duration,
    stop_timeout: Duration,
}

/// Recover the inner queue from a poisoned lock; the queue state itself
/// is always consistent (single push/pop under the lock)
fn lock_items<T>(items: &Mutex<VecDeque<T>>) -> std::sync::MutexGuard<'_, VecDeque<T>> {
    items.lock().unwrap_or_else(|e| e.into_inner())
}

impl<T: Clone + Send + 'static> DeliveryQueue<T> {
    pub fn new(config: &QueueConfig, handler: Arc<dyn DeliveryHandler<T>>) -> Self {
        Self {
            items: Arc::new(Mutex::new(VecDeque::new())),
            notify: Arc::new(Notify::new()),
            handler,
            worker: AsyncMutex::new(None),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            send_delay: Duration::from_millis(config.send_delay_ms),
            stop_timeout: Duration::from_millis(config.stop_timeout_ms),
        }
    }

    /// Append an item and wake the worker
    ///
    /// Never blocks the caller beyond the lock hold time. Capacity is
    /// unbounded.
    pub fn enqueue(&self, item: T) {
        lock_items(&self.items).push_back(item);
        self.notify.notify_one();
    }

    /// Number of items currently buffered
    pub fn len(&self) -> usize {
        lock_items(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the head item, if any
    pub fn peek(&self) -> Option<T> {
        lock_items(&self.items).front().cloned()
    }

    /// Remove and return the head item, if any
    pub fn dequeue(&self) -> Option<T> {
        lock_items(&self.items).pop_front()
    }

    /// Drop all buffered items
    pub fn clear(&self) {
        lock_items(&self.items).clear();
    }

    /// Whether the delivery worker is currently alive
    pub async fn is_running(&self) -> bool {
        self.worker
            .lock()
            .await
            .as_ref()
            .map(|w| w.is_running())
            .unwrap_or(false)
    }

    /// Start the delivery worker
    ///
    /// Restart semantics: a worker that is already running is stopped
    /// first, then a fresh one is spawned.
    pub async fn start(&self) {
        let mut slot = self.worker.lock().await;

        if let Some(previous) = slot.take() {
            previous.signal_stop();
            self.notify.notify_one();
            previous.join(self.stop_timeout).await;
        }

        let items = Arc::clone(&self.items);
        let notify = Arc::clone(&self.notify);
        let handler = Arc::clone(&self.handler);
        let poll_interval = self.poll_interval;
        let send_delay = self.send_delay;

        *slot = Some(WorkerHandle::spawn("delivery-queue", move |running| {
            async move {
                loop {
                    // Bounded wait so a stop request is seen even with no
                    // traffic; an enqueue that raced ahead of this await
                    // left a stored permit and completes it immediately
                    let woken = timeout(poll_interval, notify.notified()).await.is_ok();

                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    if !woken {
                        continue;
                    }

                    loop {
                        if !running.load(Ordering::SeqCst) {
                            break;
                        }

                        // Peek, not pop: the item stays at the head until
                        // the handler confirms delivery
                        let head = lock_items(&items).front().cloned();
                        let Some(item) = head else {
                            break;
                        };

                        match handler.deliver(&item).await {
                            Ok(true) => {
                                lock_items(&items).pop_front();
                            }
                            Ok(false) => {}
                            Err(e) => {
                                warn!("Delivery handler failed: {}", e);
                            }
                        }

                        // Fixed outbound throttle after every attempt,
                        // successful or not
                        sleep(send_delay).await;
                    }
                }

                debug!(
                    "Delivery worker exiting with {} item(s) buffered",
                    lock_items(&items).len()
                );
            }
        }));
    }

    /// Stop the delivery worker
    ///
    /// Waits up to the configured stop timeout for a graceful exit, then
    /// aborts the worker. Buffered items stay in the queue either way.
    pub async fn stop(&self) {
        let mut slot = self.worker.lock().await;

        if let Some(worker) = slot.take() {
            worker.signal_stop();
            self.notify.notify_one();
            worker.join(self.stop_timeout).await;
        }
    }
}
