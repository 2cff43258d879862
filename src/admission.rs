//! Bounded, FIFO admission of provider calls.
//!
//! [`WorkerAdmission`] caps how many provider calls run at once on top of a
//! fair [`tokio::sync::Semaphore`]. Work that arrives while every slot is
//! taken waits in arrival order; a freed slot goes to the oldest waiter, so
//! admission order is submission order and nothing starves.
//!
//! Waiting has no timeout of its own. Callers that need a ceiling wrap the
//! admitted work in their own timeout.
//!
//! ```rust
//! # use tagwise::WorkerAdmission;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let admission = WorkerAdmission::new(2);
//! let answer = admission.run(async { 40 + 2 }).await;
//! assert_eq!(answer, 42);
//! # }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error};

use crate::telemetry;

/// Default number of concurrent provider calls.
pub const DEFAULT_MAX_CONCURRENCY: usize = 2;

/// Limit bookkeeping. Slots owned by the semaphore (free, held or handed to
/// a waiter) always add up to `limit + deficit`.
struct Limits {
    limit: usize,
    /// Slots still to retire after the limit was lowered below the number
    /// of slots in use. Paid down as permits are released.
    deficit: usize,
}

struct AdmissionInner {
    semaphore: Arc<Semaphore>,
    limits: Mutex<Limits>,
    pending: AtomicUsize,
}

impl AdmissionInner {
    fn lock(&self) -> MutexGuard<'_, Limits> {
        self.limits.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn active(&self, limits: &Limits) -> usize {
        (limits.limit + limits.deficit).saturating_sub(self.semaphore.available_permits())
    }

    fn record_gauges(&self) {
        let active = self.active(&self.lock());
        metrics::gauge!(telemetry::ADMISSION_ACTIVE).set(active as f64);
        metrics::gauge!(telemetry::ADMISSION_PENDING)
            .set(self.pending.load(Ordering::SeqCst) as f64);
    }

    /// Return a slot, retiring it instead if the limit was lowered.
    fn release(&self, permit: OwnedSemaphorePermit) {
        {
            let mut limits = self.lock();
            if limits.deficit > 0 {
                limits.deficit -= 1;
                permit.forget();
            } else {
                drop(permit);
            }
        }
        self.record_gauges();
    }
}

/// Counts a caller as pending until it is admitted or gives up.
struct PendingGuard<'a> {
    pending: &'a AtomicUsize,
}

impl<'a> PendingGuard<'a> {
    fn new(pending: &'a AtomicUsize) -> Self {
        pending.fetch_add(1, Ordering::SeqCst);
        Self { pending }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Bounded-concurrency admission queue.
///
/// Cheap to clone; clones share the same slots and queue.
#[derive(Clone)]
pub struct WorkerAdmission {
    inner: Arc<AdmissionInner>,
}

impl WorkerAdmission {
    /// Create a queue admitting at most `max_concurrency` items at once
    /// (at least 1).
    pub fn new(max_concurrency: usize) -> Self {
        let limit = max_concurrency.max(1);
        Self {
            inner: Arc::new(AdmissionInner {
                semaphore: Arc::new(Semaphore::new(limit)),
                limits: Mutex::new(Limits { limit, deficit: 0 }),
                pending: AtomicUsize::new(0),
            }),
        }
    }

    /// Wait for a slot. The slot is held until the permit is dropped.
    ///
    /// Cancel-safe: dropping the returned future while queued gives up the
    /// place in line, and a slot handed over at that moment is passed on.
    pub async fn admit(&self) -> AdmissionPermit {
        if let Some(permit) = self.try_admit() {
            return permit;
        }

        let permit = {
            let _pending = PendingGuard::new(&self.inner.pending);
            self.inner.record_gauges();
            debug!(
                active = self.active_count(),
                pending = self.pending_count(),
                "waiting for admission"
            );
            match Arc::clone(&self.inner.semaphore).acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(e) => {
                    // The semaphore is never closed.
                    error!(error = %e, "admission semaphore closed");
                    None
                }
            }
        };
        self.inner.record_gauges();
        self.permit(permit)
    }

    /// Take a slot only if one is free right now and nobody is queued.
    pub fn try_admit(&self) -> Option<AdmissionPermit> {
        let permit = Arc::clone(&self.inner.semaphore).try_acquire_owned().ok()?;
        self.inner.record_gauges();
        Some(self.permit(Some(permit)))
    }

    /// Run `work` once admitted, releasing the slot when it finishes.
    pub async fn run<F: Future>(&self, work: F) -> F::Output {
        let _permit = self.admit().await;
        work.await
    }

    /// Change the concurrency limit (minimum 1).
    ///
    /// Applies to future admissions only: lowering the limit never
    /// interrupts running work, raising it admits queued work right away.
    pub fn set_limit(&self, limit: usize) {
        let limit = limit.max(1);
        {
            let mut limits = self.inner.lock();
            if limit > limits.limit {
                let mut extra = limit - limits.limit;
                let repaid = extra.min(limits.deficit);
                limits.deficit -= repaid;
                extra -= repaid;
                self.inner.semaphore.add_permits(extra);
            } else {
                let excess = limits.limit - limit;
                let retired = self.inner.semaphore.forget_permits(excess);
                limits.deficit += excess - retired;
            }
            limits.limit = limit;
            debug!(limit, deficit = limits.deficit, "admission limit changed");
        }
        self.inner.record_gauges();
    }

    /// Current concurrency limit.
    pub fn limit(&self) -> usize {
        self.inner.lock().limit
    }

    /// Slots currently held, including slots handed to a waiter that has
    /// not resumed yet.
    pub fn active_count(&self) -> usize {
        self.inner.active(&self.inner.lock())
    }

    /// Callers waiting for a slot.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    fn permit(&self, permit: Option<OwnedSemaphorePermit>) -> AdmissionPermit {
        AdmissionPermit {
            permit,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for WorkerAdmission {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}

impl std::fmt::Debug for WorkerAdmission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerAdmission")
            .field("active", &self.active_count())
            .field("limit", &self.limit())
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// A held admission slot, released on drop.
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct AdmissionPermit {
    permit: Option<OwnedSemaphorePermit>,
    inner: Arc<AdmissionInner>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        if let Some(permit) = self.permit.take() {
            self.inner.release(permit);
        }
    }
}
