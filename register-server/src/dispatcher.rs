use crate::classifier::{Action, Outcome, classify};
use crate::metrics_defs::{DISPATCH_DROPPED, DISPATCH_FORWARDED, PUBLISH_FAILED};
use crate::publisher::Publisher;
use crate::status::WatchStatus;
use crate::watcher::NotificationHandler;
use async_trait::async_trait;
use register_common::{ChangeNotification, RegisterEvent};
use shared::counter;
use std::sync::Arc;

/// Classifies each notification and forwards accepted events to the
/// publisher. Nothing escapes: drops and publish failures are logged and
/// counted.
pub struct Dispatcher {
    publisher: Arc<dyn Publisher>,
    status: WatchStatus,
}

impl Dispatcher {
    pub fn new(publisher: Arc<dyn Publisher>, status: WatchStatus) -> Self {
        Dispatcher { publisher, status }
    }

    pub async fn dispatch(&self, notification: ChangeNotification) -> Action {
        let outcome = classify(&notification);
        let action = outcome.action();

        match outcome {
            Outcome::Forward(event) => {
                let kind = match &event {
                    RegisterEvent::Metadata(_) => "metadata",
                    RegisterEvent::Uri(_) => "uri",
                };
                let event_type = event.event_type().to_string();
                tracing::debug!(
                    name = %notification.record.name,
                    notification = ?notification.kind,
                    kind,
                    %event_type,
                    "Forwarding registration event"
                );

                match self.publisher.publish(event).await {
                    Ok(()) => {
                        self.status.record_forwarded();
                        counter!(DISPATCH_FORWARDED, "kind" => kind, "event_type" => event_type)
                            .increment(1);
                    }
                    Err(e) => {
                        self.status.record_publish_failure();
                        counter!(PUBLISH_FAILED).increment(1);
                        tracing::error!(
                            name = %notification.record.name,
                            error = %e,
                            "Failed to publish registration event"
                        );
                    }
                }
            }
            Outcome::Dropped(reason) => {
                self.status.record_dropped();
                counter!(DISPATCH_DROPPED, "reason" => reason.as_str()).increment(1);
                if reason.is_malformed() {
                    tracing::warn!(
                        name = %notification.record.name,
                        notification = ?notification.kind,
                        %reason,
                        "Dropping registration record"
                    );
                } else {
                    tracing::debug!(
                        name = %notification.record.name,
                        notification = ?notification.kind,
                        %reason,
                        "Ignoring registration record"
                    );
                }
            }
        }

        action
    }
}

#[async_trait]
impl NotificationHandler for Dispatcher {
    async fn on_change(&self, notification: ChangeNotification) {
        self.dispatch(notification).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::PublishError;
    use parking_lot::Mutex;
    use register_common::labels::{REGISTER_LABEL, REGISTER_TYPE_LABEL};
    use register_common::{EventType, NotificationKind, RegistrationRecord};
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<RegisterEvent>>,
        fail: bool,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, event: RegisterEvent) -> Result<(), PublishError> {
            if self.fail {
                return Err(PublishError::Failed("bus unavailable".into()));
            }
            self.events.lock().push(event);
            Ok(())
        }
    }

    fn uri_record() -> RegistrationRecord {
        RegistrationRecord {
            name: "register-uri-2f".into(),
            labels: Some(BTreeMap::from([
                (REGISTER_LABEL.to_string(), "true".to_string()),
                (REGISTER_TYPE_LABEL.to_string(), "uri".to_string()),
            ])),
            annotations: BTreeMap::new(),
            data: BTreeMap::from([(
                "data".to_string(),
                r#"{"host":"10.0.0.5","port":8080}"#.to_string(),
            )]),
        }
    }

    #[tokio::test]
    async fn test_removed_uri_publishes_offline() {
        let publisher = Arc::new(RecordingPublisher::default());
        let status = WatchStatus::new();
        let dispatcher = Dispatcher::new(publisher.clone(), status.clone());

        let action = dispatcher
            .dispatch(ChangeNotification::new(NotificationKind::Removed, uri_record()))
            .await;
        assert_eq!(action, Action::Offline);

        let events = publisher.events.lock();
        assert_eq!(events.len(), 1);
        let RegisterEvent::Uri(uri) = &events[0] else {
            panic!("expected a uri event");
        };
        assert_eq!(uri.event_type, EventType::Offline);
        assert_eq!(uri.host, "10.0.0.5");
        assert_eq!(uri.port, 8080);
        assert_eq!(status.forwarded(), 1);
    }

    #[tokio::test]
    async fn test_unlabeled_record_publishes_nothing() {
        let publisher = Arc::new(RecordingPublisher::default());
        let status = WatchStatus::new();
        let dispatcher = Dispatcher::new(publisher.clone(), status.clone());

        for kind in [
            NotificationKind::Added,
            NotificationKind::Updated,
            NotificationKind::Removed,
        ] {
            let action = dispatcher
                .dispatch(ChangeNotification::new(kind, RegistrationRecord::default()))
                .await;
            assert_eq!(action, Action::Drop);
        }

        assert!(publisher.events.lock().is_empty());
        assert_eq!(status.dropped(), 3);
    }

    #[tokio::test]
    async fn test_publish_failure_is_swallowed() {
        let publisher = Arc::new(RecordingPublisher {
            fail: true,
            ..Default::default()
        });
        let status = WatchStatus::new();
        let dispatcher = Dispatcher::new(publisher, status.clone());

        dispatcher
            .on_change(ChangeNotification::new(NotificationKind::Added, uri_record()))
            .await;
        assert_eq!(status.publish_failures(), 1);
        assert_eq!(status.forwarded(), 0);
    }
}
