//! Access to the platform object store holding registration records.
//!
//! Producers write through [`RecordStore`], gateways observe through
//! [`RecordWatcher`]. The two sides never talk to each other directly.
use crate::labels::LabelSelector;
use crate::record::{RegistrationRecord, WatchEvent};
use async_trait::async_trait;
use futures::stream::BoxStream;

pub const NOT_FOUND: u16 = 404;
pub const CONFLICT: u16 = 409;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("store returned {code}: {message}")]
    Api { code: u16, message: String },
    #[error("could not reach the store: {0}")]
    Transport(String),
    #[error("could not initialize the platform client: {0}")]
    Init(String),
    #[error("watch failed: {0}")]
    Watch(String),
}

impl StoreError {
    pub fn not_found(name: &str) -> Self {
        StoreError::Api {
            code: NOT_FOUND,
            message: format!("{name} not found"),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Api { code, .. } if *code == NOT_FOUND)
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn read(&self, name: &str) -> Result<RegistrationRecord, StoreError>;
    async fn create(&self, record: &RegistrationRecord) -> Result<RegistrationRecord, StoreError>;
    async fn replace(
        &self,
        name: &str,
        record: &RegistrationRecord,
    ) -> Result<RegistrationRecord, StoreError>;
    async fn delete(&self, name: &str) -> Result<(), StoreError>;
}

pub type NotificationStream = BoxStream<'static, Result<WatchEvent, StoreError>>;

pub trait RecordWatcher: Send + Sync {
    /// Opens a watch session for records matching `selector`.
    ///
    /// The session may open lazily, on first poll. Until the stream yields
    /// [`WatchEvent::Synced`] nothing is known about its health. Changes are
    /// delivered in order per object.
    fn subscribe(&self, selector: &LabelSelector) -> NotificationStream;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Replaced,
}

/// Creates the record if absent, replaces it otherwise.
///
/// The read-then-write sequence is not atomic: a concurrent writer of the
/// same name may have its create clobbered by this replace, or make this
/// create fail with a conflict. Callers needing a single writer per name must
/// serialize themselves.
pub async fn upsert(
    store: &dyn RecordStore,
    record: &RegistrationRecord,
) -> Result<UpsertOutcome, StoreError> {
    let exists = match store.read(&record.name).await {
        Ok(_) => true,
        Err(e) if e.is_not_found() => false,
        Err(e) => {
            tracing::error!(name = %record.name, error = %e, "Failed to read registration record");
            return Err(e);
        }
    };

    if exists {
        tracing::debug!(name = %record.name, "Record exists, replacing it");
        store.replace(&record.name, record).await?;
        Ok(UpsertOutcome::Replaced)
    } else {
        tracing::debug!(name = %record.name, "Record does not exist, creating it");
        store.create(record).await?;
        Ok(UpsertOutcome::Created)
    }
}
