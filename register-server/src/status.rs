use shared::admin_service::Probe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Default)]
struct Counters {
    watching: AtomicBool,
    synced: AtomicBool,
    observed: AtomicU64,
    forwarded: AtomicU64,
    dropped: AtomicU64,
    publish_failures: AtomicU64,
    watch_errors: AtomicU64,
}

/// Live view of a watch session, shared between the watch task, the
/// dispatcher and the admin endpoint.
#[derive(Clone, Default)]
pub struct WatchStatus {
    inner: Arc<Counters>,
}

impl WatchStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_watching(&self) -> bool {
        self.inner.watching.load(Ordering::Relaxed)
    }

    /// Whether the session has synced with the store and has not failed
    /// since.
    pub fn is_synced(&self) -> bool {
        self.inner.synced.load(Ordering::Relaxed)
    }

    pub fn observed(&self) -> u64 {
        self.inner.observed.load(Ordering::Relaxed)
    }

    pub fn forwarded(&self) -> u64 {
        self.inner.forwarded.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    pub fn publish_failures(&self) -> u64 {
        self.inner.publish_failures.load(Ordering::Relaxed)
    }

    pub fn watch_errors(&self) -> u64 {
        self.inner.watch_errors.load(Ordering::Relaxed)
    }

    pub(crate) fn set_watching(&self, watching: bool) {
        self.inner.watching.store(watching, Ordering::Relaxed);
    }

    pub(crate) fn set_synced(&self, synced: bool) {
        self.inner.synced.store(synced, Ordering::Relaxed);
    }

    pub(crate) fn record_observed(&self) {
        self.inner.observed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_forwarded(&self) {
        self.inner.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.inner.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_publish_failure(&self) {
        self.inner.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_watch_error(&self) {
        self.inner.watch_errors.fetch_add(1, Ordering::Relaxed);
    }
}

impl Probe for WatchStatus {
    fn is_ready(&self) -> bool {
        self.is_watching() && self.is_synced()
    }

    fn status(&self) -> String {
        format!(
            "watching: {}\nsynced: {}\nobserved: {}\nforwarded: {}\ndropped: {}\npublish_failures: {}\nwatch_errors: {}\n",
            self.is_watching(),
            self.is_synced(),
            self.observed(),
            self.forwarded(),
            self.dropped(),
            self.publish_failures(),
            self.watch_errors(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_report() {
        let status = WatchStatus::new();
        let shared = status.clone();
        shared.set_watching(true);
        assert!(!status.is_ready());
        shared.set_synced(true);
        shared.record_observed();
        shared.record_observed();
        shared.record_forwarded();
        shared.record_dropped();

        assert!(status.is_ready());
        let report = status.status();
        assert!(report.contains("observed: 2\n"));
        assert!(report.contains("forwarded: 1\n"));
        assert!(report.contains("dropped: 1\n"));
        assert!(report.contains("synced: true\n"));
        assert!(report.contains("watch_errors: 0\n"));

        shared.set_synced(false);
        assert!(!status.is_ready());
    }
}
