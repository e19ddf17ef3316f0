//! Gateway side of the register center: watches registration records and
//! republishes them as registration events.
pub mod classifier;
mod dispatcher;
pub mod metrics_defs;
pub mod publisher;
mod repository;
mod status;
mod watcher;

pub use dispatcher::Dispatcher;
pub use repository::ServerRegisterRepository;
pub use status::WatchStatus;
pub use watcher::{ChangeWatcher, NotificationHandler, WatchHandle};
