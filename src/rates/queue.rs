//! Process-wide sequential gate for outbound provider calls.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Runs submitted calls one at a time, in arrival order.
///
/// Every provider shares a single queue so the effective outbound
/// concurrency is 1 across the whole process.
#[derive(Debug, Default)]
pub struct RequestQueue {
    gate: Mutex<()>,
    completed: AtomicU64,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `call` once the queue is free, optionally sleeping `warmup` first.
    ///
    /// The slot is held for the whole call, retries and warm-up included.
    pub async fn run<F, Fut, T>(&self, warmup: Option<Duration>, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _slot = self.gate.lock().await;
        if let Some(delay) = warmup.filter(|d| !d.is_zero()) {
            debug!("Provider warm-up delay {:?}", delay);
            tokio::time::sleep(delay).await;
        }
        let out = call().await;
        self.completed.fetch_add(1, Ordering::Relaxed);
        out
    }

    /// Number of calls that have finished.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}
