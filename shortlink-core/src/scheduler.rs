use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinSet;

/// Runs one delayed check per record on the Tokio runtime.
///
/// Every scheduled check is a task that sleeps for its delay and then runs
/// once. There is no cancellation: a check whose record is already gone just
/// finds nothing to do. Spawned tasks are tracked in a `JoinSet` so shutdown
/// can wait for them and abort stragglers.
pub(crate) struct ExpiryScheduler {
    handle: Handle,
    tasks: Mutex<JoinSet<()>>,
    closed: AtomicBool,
}

impl ExpiryScheduler {
    pub(crate) fn new(handle: Handle) -> Self {
        Self {
            handle,
            tasks: Mutex::new(JoinSet::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Arranges for `check` to run once after `delay`.
    ///
    /// Returns `false` without scheduling anything once the scheduler has been
    /// shut down.
    pub(crate) fn schedule_once<F>(&self, delay: Duration, check: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut tasks = self.tasks.lock();
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        // Drain completed tasks
        while tasks.try_join_next().is_some() {}

        tasks.spawn_on(
            async move {
                tokio::time::sleep(delay).await;
                check();
            },
            &self.handle,
        );
        true
    }

    /// Number of checks that have not finished yet
    pub(crate) fn pending(&self) -> usize {
        let mut tasks = self.tasks.lock();
        while tasks.try_join_next().is_some() {}
        tasks.len()
    }

    /// Stops accepting new checks, waits up to `timeout` for the outstanding
    /// ones and aborts whatever is still pending after that.
    ///
    /// Calling this more than once is harmless.
    pub(crate) async fn shutdown(&self, timeout: Duration) {
        let mut tasks = {
            let mut guard = self.tasks.lock();
            self.closed.store(true, Ordering::Release);
            std::mem::take(&mut *guard)
        };

        let in_flight = tasks.len();
        if in_flight == 0 {
            return;
        }
        tracing::debug!(in_flight, "waiting for pending expiry checks");

        let drained = tokio::time::timeout(timeout, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                remaining = tasks.len(),
                timeout_ms = timeout.as_millis() as u64,
                "expiry checks still pending after shutdown timeout, aborting them"
            );
            tasks.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Instant;

    #[tokio::test]
    async fn test_check_runs_after_delay() {
        let scheduler = ExpiryScheduler::new(Handle::current());
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        assert!(scheduler.schedule_once(Duration::from_millis(20), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_checks() {
        let scheduler = ExpiryScheduler::new(Handle::current());
        scheduler.shutdown(Duration::from_millis(10)).await;

        assert!(!scheduler.schedule_once(Duration::ZERO, || {}));
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_drains_short_checks() {
        let scheduler = ExpiryScheduler::new(Handle::current());
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = Arc::clone(&fired);
            scheduler.schedule_once(Duration::from_millis(20), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        scheduler.shutdown(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_shutdown_aborts_long_checks_after_timeout() {
        let scheduler = ExpiryScheduler::new(Handle::current());
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        scheduler.schedule_once(Duration::from_secs(3600), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(scheduler.pending(), 1);

        let started = Instant::now();
        scheduler.shutdown(Duration::from_millis(50)).await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending(), 0);
    }
}
