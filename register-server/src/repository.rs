use crate::dispatcher::Dispatcher;
use crate::publisher::Publisher;
use crate::status::WatchStatus;
use crate::watcher::{ChangeWatcher, WatchHandle};
use register_common::RecordWatcher;
use std::sync::Arc;

/// Gateway-side entry point: one watch session over the registration
/// records, dispatching to the publisher until closed.
pub struct ServerRegisterRepository {
    status: WatchStatus,
    handle: WatchHandle,
}

impl ServerRegisterRepository {
    /// Subscribes immediately. Must be called within a tokio runtime.
    pub fn init(source: Arc<dyn RecordWatcher>, publisher: Arc<dyn Publisher>) -> Self {
        let status = WatchStatus::new();
        let dispatcher = Arc::new(Dispatcher::new(publisher, status.clone()));
        let handle = ChangeWatcher::new(source, status.clone()).start(dispatcher);

        ServerRegisterRepository { status, handle }
    }

    pub fn status(&self) -> WatchStatus {
        self.status.clone()
    }

    /// True once the watch session has ended on its own.
    pub fn is_closed(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn close(self) {
        self.handle.stop().await;
        tracing::info!(
            observed = self.status.observed(),
            forwarded = self.status.forwarded(),
            dropped = self.status.dropped(),
            "Server register repository closed"
        );
    }
}
