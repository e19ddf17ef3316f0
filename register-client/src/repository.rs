use crate::config::{Config, OfflineStrategy};
use crate::metrics_defs::{REGISTER_OFFLINE, REGISTER_UPSERT};
use register_common::naming::{encode_metadata_name, encode_uri_name};
use register_common::{
    LogicalPath, MetaDataRegisterDto, NamingError, ObjectName, RecordKind, RecordStore,
    RegistrationRecord, StoreError, UpsertOutcome, UriRegisterDto, upsert,
};
use shared::counter;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(thiserror::Error, Debug)]
pub enum RegisterError {
    #[error("could not name the registration: {0}")]
    Naming(#[from] NamingError),
    #[error("could not encode the registration payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Writes registrations of one producer process.
///
/// Uri registrations are serialized so that two registrations of the same
/// instance never interleave their read and write. Metadata registrations are
/// not; producers must not register the same interface concurrently.
pub struct ClientRegisterRepository {
    store: Arc<dyn RecordStore>,
    uri_lock: Mutex<()>,
    offline_strategy: OfflineStrategy,
}

impl ClientRegisterRepository {
    pub fn new(store: Arc<dyn RecordStore>, config: &Config) -> Self {
        tracing::info!(offline_strategy = ?config.offline_strategy, "Register client initialized");
        ClientRegisterRepository {
            store,
            uri_lock: Mutex::new(()),
            offline_strategy: config.offline_strategy,
        }
    }

    pub async fn persist_interface(
        &self,
        metadata: &MetaDataRegisterDto,
    ) -> Result<ObjectName, RegisterError> {
        let path = LogicalPath::for_metadata(metadata)?;
        let name = encode_metadata_name(&path)?;
        let record = RegistrationRecord::for_metadata(&name, &path, metadata)?;

        self.write(RecordKind::Metadata, &name, &record).await?;
        tracing::info!(
            rpc_type = %metadata.rpc_type,
            path = %path.metadata_path(),
            %name,
            "Registered metadata"
        );
        Ok(name)
    }

    pub async fn persist_uri(&self, uri: &UriRegisterDto) -> Result<ObjectName, RegisterError> {
        let path = LogicalPath::for_uri(uri);
        let name = encode_uri_name(&path)?;
        let record = RegistrationRecord::for_uri(&name, &path, uri)?;

        {
            let _guard = self.uri_lock.lock().await;
            self.write(RecordKind::Uri, &name, &record).await?;
        }
        tracing::info!(
            rpc_type = %uri.rpc_type,
            path = %path.uri_path(),
            %name,
            "Registered uri"
        );
        Ok(name)
    }

    /// Takes an instance offline according to the configured strategy.
    pub async fn offline(&self, uri: &UriRegisterDto) -> Result<(), RegisterError> {
        match self.offline_strategy {
            OfflineStrategy::LogOnly => {
                tracing::info!(rpc_type = %uri.rpc_type, instance = %uri.instance(), "Offline");
                counter!(REGISTER_OFFLINE, "strategy" => "log_only").increment(1);
                Ok(())
            }
            OfflineStrategy::DeleteRecord => {
                let name = encode_uri_name(&LogicalPath::for_uri(uri))?;
                let result = {
                    let _guard = self.uri_lock.lock().await;
                    self.store.delete(name.as_str()).await
                };
                match result {
                    Ok(()) => {
                        tracing::info!(%name, instance = %uri.instance(), "Deleted uri record");
                    }
                    Err(e) if e.is_not_found() => {
                        tracing::debug!(%name, "Uri record already gone");
                    }
                    Err(e) => return Err(e.into()),
                }
                counter!(REGISTER_OFFLINE, "strategy" => "delete_record").increment(1);
                Ok(())
            }
        }
    }

    async fn write(
        &self,
        kind: RecordKind,
        name: &ObjectName,
        record: &RegistrationRecord,
    ) -> Result<UpsertOutcome, StoreError> {
        if name.exceeds_platform_limit() {
            tracing::warn!(%name, len = name.as_str().len(), "Object name exceeds the platform limit");
        }

        let kind_label = kind.as_label().to_string();
        match upsert(self.store.as_ref(), record).await {
            Ok(outcome) => {
                let outcome_label = match outcome {
                    UpsertOutcome::Created => "created",
                    UpsertOutcome::Replaced => "replaced",
                };
                counter!(REGISTER_UPSERT, "kind" => kind_label, "outcome" => outcome_label)
                    .increment(1);
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(%name, error = %e, "Failed to write registration record");
                counter!(REGISTER_UPSERT, "kind" => kind_label, "outcome" => "failed").increment(1);
                Err(e)
            }
        }
    }
}
