//! Shared building blocks of the Kubernetes register center: registration
//! paths and their object-name encoding, payload DTOs, the stored record
//! shape, and the store and watch abstractions both sides talk through.
pub mod dto;
pub mod kubernetes;
pub mod labels;
pub mod memory;
pub mod naming;
pub mod path;
pub mod record;
pub mod store;

pub use dto::{EventType, MetaDataRegisterDto, RegisterEvent, UriRegisterDto};
pub use labels::{LabelSelector, RecordKind};
pub use naming::{LogicalPath, NamingError, ObjectName};
pub use record::{ChangeNotification, NotificationKind, RegistrationRecord, WatchEvent};
pub use store::{RecordStore, RecordWatcher, StoreError, UpsertOutcome, upsert};
