// In-process record store with the platform's create/replace/watch semantics.
// Backs tests and single-process setups where producers and the gateway share memory.
use crate::labels::LabelSelector;
use crate::record::{ChangeNotification, NotificationKind, RegistrationRecord, WatchEvent};
use crate::store::{CONFLICT, NotificationStream, RecordStore, RecordWatcher, StoreError};
use async_trait::async_trait;
use futures::{StreamExt, future, stream};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

const WATCH_CAPACITY: usize = 1024;

pub struct MemoryStore {
    records: RwLock<BTreeMap<String, RegistrationRecord>>,
    tx: broadcast::Sender<ChangeNotification>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(WATCH_CAPACITY);
        MemoryStore {
            records: RwLock::new(BTreeMap::new()),
            tx,
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, RegistrationRecord> {
        self.records.read().clone()
    }

    /// Stores a record without the create/replace checks, notifying watchers
    /// as Added or Updated. Lets tests inject objects no producer would write.
    pub fn apply(&self, record: RegistrationRecord) {
        let mut records = self.records.write();
        let kind = match records.insert(record.name.clone(), record.clone()) {
            Some(_) => NotificationKind::Updated,
            None => NotificationKind::Added,
        };
        self.notify(kind, record);
    }

    fn notify(&self, kind: NotificationKind, record: RegistrationRecord) {
        // No receivers is fine: nobody is watching yet.
        let _ = self.tx.send(ChangeNotification::new(kind, record));
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn read(&self, name: &str) -> Result<RegistrationRecord, StoreError> {
        self.records
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::not_found(name))
    }

    async fn create(&self, record: &RegistrationRecord) -> Result<RegistrationRecord, StoreError> {
        let mut records = self.records.write();
        if records.contains_key(&record.name) {
            return Err(StoreError::Api {
                code: CONFLICT,
                message: format!("{} already exists", record.name),
            });
        }
        records.insert(record.name.clone(), record.clone());
        self.notify(NotificationKind::Added, record.clone());
        Ok(record.clone())
    }

    async fn replace(
        &self,
        name: &str,
        record: &RegistrationRecord,
    ) -> Result<RegistrationRecord, StoreError> {
        let mut records = self.records.write();
        let Some(existing) = records.get_mut(name) else {
            return Err(StoreError::not_found(name));
        };
        *existing = record.clone();
        self.notify(NotificationKind::Updated, record.clone());
        Ok(record.clone())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let removed = records
            .remove(name)
            .ok_or_else(|| StoreError::not_found(name))?;
        self.notify(NotificationKind::Removed, removed);
        Ok(())
    }
}

impl RecordWatcher for MemoryStore {
    /// The session is open when this returns, so the stream starts with
    /// [`WatchEvent::Synced`]. Records stored before subscribing are not
    /// replayed.
    fn subscribe(&self, selector: &LabelSelector) -> NotificationStream {
        let rx = self.tx.subscribe();
        let selector = selector.clone();

        let changes = stream::unfold((rx, selector), |(mut rx, selector)| async move {
            loop {
                match rx.recv().await {
                    Ok(notification) => {
                        if selector.matches(notification.record.labels.as_ref()) {
                            return Some((Ok(WatchEvent::Changed(notification)), (rx, selector)));
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Watcher fell behind, notifications were lost");
                        return Some((
                            Err(StoreError::Watch(format!("{skipped} notifications lost"))),
                            (rx, selector),
                        ));
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        });

        stream::once(future::ready(Ok(WatchEvent::Synced)))
            .chain(changes)
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{REGISTER_LABEL, REGISTER_LABEL_VALUE};

    async fn next_change(stream: &mut NotificationStream) -> ChangeNotification {
        match stream.next().await {
            Some(Ok(WatchEvent::Changed(notification))) => notification,
            other => panic!("expected a change, got {other:?}"),
        }
    }

    fn record(name: &str, registered: bool) -> RegistrationRecord {
        let labels = registered.then(|| {
            BTreeMap::from([(REGISTER_LABEL.to_string(), REGISTER_LABEL_VALUE.to_string())])
        });
        RegistrationRecord {
            name: name.into(),
            labels,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_platform_error_codes() {
        let store = MemoryStore::new();
        assert!(store.read("missing").await.unwrap_err().is_not_found());
        assert!(
            store
                .replace("missing", &record("missing", true))
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert!(store.delete("missing").await.unwrap_err().is_not_found());

        store.create(&record("a", true)).await.unwrap();
        let err = store.create(&record("a", true)).await.unwrap_err();
        assert!(matches!(err, StoreError::Api { code: CONFLICT, .. }));
    }

    #[tokio::test]
    async fn test_subscribe_filters_and_orders() {
        let store = MemoryStore::new();
        let mut stream = store.subscribe(&LabelSelector::registration_records());
        assert_eq!(stream.next().await, Some(Ok(WatchEvent::Synced)));

        store.create(&record("a", true)).await.unwrap();
        store.create(&record("unrelated", false)).await.unwrap();
        store.replace("a", &record("a", true)).await.unwrap();
        store.delete("a").await.unwrap();

        let mut kinds = Vec::new();
        for _ in 0..3 {
            let n = next_change(&mut stream).await;
            assert_eq!(n.record.name, "a");
            kinds.push(n.kind);
        }

        assert_eq!(
            kinds,
            vec![
                NotificationKind::Added,
                NotificationKind::Updated,
                NotificationKind::Removed
            ]
        );
    }

    #[tokio::test]
    async fn test_apply() {
        let store = MemoryStore::new();
        let mut stream = store.subscribe(&LabelSelector::new());

        store.apply(record("x", false));
        store.apply(record("x", false));

        assert_eq!(stream.next().await, Some(Ok(WatchEvent::Synced)));
        assert_eq!(next_change(&mut stream).await.kind, NotificationKind::Added);
        assert_eq!(next_change(&mut stream).await.kind, NotificationKind::Updated);
        assert_eq!(store.snapshot().len(), 1);
    }
}
