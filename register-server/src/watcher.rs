use crate::metrics_defs::{WATCH_ERRORS, WATCH_NOTIFICATIONS, WATCH_SYNCED};
use crate::status::WatchStatus;
use async_trait::async_trait;
use futures::StreamExt;
use register_common::{ChangeNotification, LabelSelector, RecordWatcher, WatchEvent};
use shared::{counter, gauge};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Receives every change of the watch session, one at a time.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    async fn on_change(&self, notification: ChangeNotification);
}

/// Transport glue between a [`RecordWatcher`] and a handler. Performs no
/// decoding of its own.
pub struct ChangeWatcher {
    source: Arc<dyn RecordWatcher>,
    selector: LabelSelector,
    status: WatchStatus,
}

impl ChangeWatcher {
    /// Watches registration records only, leaving other objects in the
    /// namespace alone.
    pub fn new(source: Arc<dyn RecordWatcher>, status: WatchStatus) -> Self {
        ChangeWatcher {
            source,
            selector: LabelSelector::registration_records(),
            status,
        }
    }

    /// Subscribes and drives the session on a background task.
    ///
    /// The handler runs inline, so a slow handler delays the notifications
    /// behind it. Reconnects are left to the source; the task ends when the
    /// source's stream ends or the returned handle is stopped or dropped.
    ///
    /// The session counts as synced from the source's first
    /// [`WatchEvent::Synced`] until it reports an error. After an error the
    /// next item from the source marks it synced again.
    pub fn start(&self, handler: Arc<dyn NotificationHandler>) -> WatchHandle {
        let mut stream = self.source.subscribe(&self.selector);
        let status = self.status.clone();
        let selector = self.selector.to_string();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        status.set_watching(true);
        tracing::info!(%selector, "Watching registration records");

        let task = tokio::spawn(async move {
            let mut synced_once = false;
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        tracing::info!(%selector, "Watch stopped");
                        break;
                    }
                    next = stream.next() => match next {
                        Some(Ok(WatchEvent::Synced)) => {
                            if !status.is_synced() {
                                tracing::info!(%selector, "Watch session synced");
                            }
                            synced_once = true;
                            mark_synced(&status, true);
                        }
                        Some(Ok(WatchEvent::Changed(notification))) => {
                            if synced_once && !status.is_synced() {
                                tracing::info!(%selector, "Watch session recovered");
                                mark_synced(&status, true);
                            }
                            status.record_observed();
                            counter!(WATCH_NOTIFICATIONS).increment(1);
                            handler.on_change(notification).await;
                        }
                        Some(Err(e)) => {
                            mark_synced(&status, false);
                            status.record_watch_error();
                            counter!(WATCH_ERRORS).increment(1);
                            tracing::warn!(error = %e, "Watch session reported an error");
                        }
                        None => {
                            tracing::warn!(%selector, "Watch stream ended");
                            break;
                        }
                    }
                }
            }
            mark_synced(&status, false);
            status.set_watching(false);
        });

        WatchHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

fn mark_synced(status: &WatchStatus, synced: bool) {
    status.set_synced(synced);
    gauge!(WATCH_SYNCED).set(if synced { 1.0 } else { 0.0 });
}

pub struct WatchHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the session after the notification in progress, if any.
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::error!("Watch task panicked: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use register_common::labels::{REGISTER_LABEL, REGISTER_LABEL_VALUE};
    use register_common::memory::MemoryStore;
    use register_common::store::NotificationStream;
    use register_common::{NotificationKind, RecordStore, RegistrationRecord, StoreError};
    use shared::admin_service::Probe;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Replays a fixed sequence, then stays open without further items.
    struct ScriptedWatcher(Vec<Result<WatchEvent, StoreError>>);

    impl RecordWatcher for ScriptedWatcher {
        fn subscribe(&self, _selector: &LabelSelector) -> NotificationStream {
            stream::iter(self.0.clone()).chain(stream::pending()).boxed()
        }
    }

    fn forbidden() -> StoreError {
        StoreError::Api {
            code: 403,
            message: "configmaps is forbidden".into(),
        }
    }

    async fn wait_for(condition: impl Fn() -> bool) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    struct Forward(mpsc::UnboundedSender<ChangeNotification>);

    #[async_trait]
    impl NotificationHandler for Forward {
        async fn on_change(&self, notification: ChangeNotification) {
            let _ = self.0.send(notification);
        }
    }

    fn record(name: &str, registered: bool) -> RegistrationRecord {
        RegistrationRecord {
            name: name.into(),
            labels: Some(BTreeMap::from([(
                REGISTER_LABEL.to_string(),
                if registered { REGISTER_LABEL_VALUE } else { "false" }.to_string(),
            )])),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_delivers_selected_records_in_order() {
        let store = Arc::new(MemoryStore::new());
        let status = WatchStatus::new();
        let watcher = ChangeWatcher::new(store.clone(), status.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = watcher.start(Arc::new(Forward(tx)));
        assert!(status.is_watching());
        wait_for(|| status.is_synced()).await;
        assert!(status.is_ready());

        store.create(&record("a", true)).await.unwrap();
        store.create(&record("other", false)).await.unwrap();
        store.delete("a").await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!((first.kind, first.record.name.as_str()), (NotificationKind::Added, "a"));
        assert_eq!((second.kind, second.record.name.as_str()), (NotificationKind::Removed, "a"));
        assert_eq!(status.observed(), 2);

        handle.stop().await;
        assert!(!status.is_watching());
        assert!(!status.is_ready());
    }

    #[tokio::test]
    async fn test_failing_session_is_not_ready() {
        let source = ScriptedWatcher(vec![Err(forbidden()), Err(forbidden()), Err(forbidden())]);
        let status = WatchStatus::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let handle = ChangeWatcher::new(Arc::new(source), status.clone()).start(Arc::new(Forward(tx)));
        wait_for(|| status.watch_errors() == 3).await;

        assert_eq!(status.watch_errors(), 3);
        assert_eq!(status.observed(), 0);
        assert!(status.is_watching());
        assert!(!status.is_synced());
        assert!(!status.is_ready());
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_error_withdraws_readiness() {
        let source = ScriptedWatcher(vec![Ok(WatchEvent::Synced), Err(forbidden())]);
        let status = WatchStatus::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let handle = ChangeWatcher::new(Arc::new(source), status.clone()).start(Arc::new(Forward(tx)));
        wait_for(|| status.watch_errors() == 1).await;

        assert_eq!(status.watch_errors(), 1);
        assert!(!status.is_ready());
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_change_after_error_restores_readiness() {
        let change = ChangeNotification::new(NotificationKind::Added, record("a", true));
        let source = ScriptedWatcher(vec![
            Ok(WatchEvent::Synced),
            Err(forbidden()),
            Ok(WatchEvent::Changed(change.clone())),
        ]);
        let status = WatchStatus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = ChangeWatcher::new(Arc::new(source), status.clone()).start(Arc::new(Forward(tx)));
        assert_eq!(rx.recv().await, Some(change));

        assert_eq!(status.watch_errors(), 1);
        assert!(status.is_ready());
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_changes_before_first_sync_do_not_mark_ready() {
        let change = ChangeNotification::new(NotificationKind::Added, record("a", true));
        let source = ScriptedWatcher(vec![Ok(WatchEvent::Changed(change.clone()))]);
        let status = WatchStatus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = ChangeWatcher::new(Arc::new(source), status.clone()).start(Arc::new(Forward(tx)));
        assert_eq!(rx.recv().await, Some(change));

        assert_eq!(status.observed(), 1);
        assert!(!status.is_ready());
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_ends_with_source() {
        let store = Arc::new(MemoryStore::new());
        let status = WatchStatus::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let handle = ChangeWatcher::new(store.clone(), status.clone()).start(Arc::new(Forward(tx)));
        // Dropping the store closes the broadcast channel and ends the stream.
        drop(store);

        for _ in 0..100 {
            if handle.is_finished() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(handle.is_finished());
        assert!(!status.is_watching());
    }
}
