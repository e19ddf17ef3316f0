use async_trait::async_trait;
use register_common::RegisterEvent;
use tokio::sync::mpsc;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PublishError {
    #[error("event bus is closed")]
    Closed,
    #[error("publish failed: {0}")]
    Failed(String),
}

/// Hands registration events to the gateway's event bus.
///
/// Delivery is best effort. The dispatcher does not retry; producers
/// re-register periodically, which repairs anything lost here.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, event: RegisterEvent) -> Result<(), PublishError>;
}

/// Publishes into a bounded channel. A full channel holds up the watch
/// session until the consumer catches up.
#[derive(Clone)]
pub struct ChannelPublisher {
    tx: mpsc::Sender<RegisterEvent>,
}

impl ChannelPublisher {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<RegisterEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ChannelPublisher { tx }, rx)
    }
}

#[async_trait]
impl Publisher for ChannelPublisher {
    async fn publish(&self, event: RegisterEvent) -> Result<(), PublishError> {
        self.tx.send(event).await.map_err(|_| PublishError::Closed)
    }
}

/// Logs every event. Used when no event bus is attached.
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, event: RegisterEvent) -> Result<(), PublishError> {
        match &event {
            RegisterEvent::Metadata(metadata) => tracing::info!(
                event_type = %event.event_type(),
                rpc_type = %metadata.rpc_type,
                context_path = ?metadata.context_path,
                path = ?metadata.path,
                "Metadata registration"
            ),
            RegisterEvent::Uri(uri) => tracing::info!(
                event_type = %event.event_type(),
                rpc_type = %uri.rpc_type,
                context_path = ?uri.context_path,
                instance = %uri.instance(),
                "Uri registration"
            ),
        }
        Ok(())
    }
}
