//! Registration records stored as Kubernetes ConfigMaps.
use crate::labels::{LabelSelector, NAMESPACE};
use crate::record::{ChangeNotification, NotificationKind, RegistrationRecord, WatchEvent};
use crate::store::{NotificationStream, RecordStore, RecordWatcher, StoreError};
use async_trait::async_trait;
use futures::{StreamExt, future};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::runtime::WatchStreamExt;
use kube::runtime::watcher::{self, Event};
use kube::{Client, Config};
use serde::Deserialize;
use std::collections::HashSet;

/// How the platform client authenticates.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum Credentials {
    /// Service account of the pod the process runs in.
    #[default]
    InCluster,
    /// A kubeconfig file. Without a path, `$KUBECONFIG` or `~/.kube/config` is used.
    Kubeconfig { path: Option<String> },
}

/// Client handle scoped to the registration namespace. Built once and
/// never mutated afterwards, so clones can be shared freely.
#[derive(Clone)]
pub struct KubeStore {
    api: Api<ConfigMap>,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        KubeStore {
            api: Api::namespaced(client, NAMESPACE),
        }
    }

    pub async fn connect(credentials: &Credentials) -> Result<Self, StoreError> {
        let config = match credentials {
            Credentials::InCluster => {
                Config::incluster().map_err(|e| StoreError::Init(e.to_string()))?
            }
            Credentials::Kubeconfig { path: Some(path) } => {
                let kubeconfig =
                    Kubeconfig::read_from(path).map_err(|e| StoreError::Init(e.to_string()))?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| StoreError::Init(e.to_string()))?
            }
            Credentials::Kubeconfig { path: None } => {
                Config::from_kubeconfig(&KubeConfigOptions::default())
                    .await
                    .map_err(|e| StoreError::Init(e.to_string()))?
            }
        };

        let client = Client::try_from(config).map_err(|e| StoreError::Init(e.to_string()))?;
        tracing::info!(?credentials, namespace = NAMESPACE, "Kubernetes client initialized");
        Ok(KubeStore::new(client))
    }
}

#[async_trait]
impl RecordStore for KubeStore {
    async fn read(&self, name: &str) -> Result<RegistrationRecord, StoreError> {
        let config_map = self.api.get(name).await.map_err(map_error)?;
        Ok(to_record(config_map))
    }

    async fn create(&self, record: &RegistrationRecord) -> Result<RegistrationRecord, StoreError> {
        let created = self
            .api
            .create(&PostParams::default(), &to_config_map(record))
            .await
            .map_err(map_error)?;
        Ok(to_record(created))
    }

    async fn replace(
        &self,
        name: &str,
        record: &RegistrationRecord,
    ) -> Result<RegistrationRecord, StoreError> {
        let replaced = self
            .api
            .replace(name, &PostParams::default(), &to_config_map(record))
            .await
            .map_err(map_error)?;
        Ok(to_record(replaced))
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.api
            .delete(name, &DeleteParams::default())
            .await
            .map_err(map_error)?;
        Ok(())
    }
}

impl RecordWatcher for KubeStore {
    /// The session opens on first poll and reports [`WatchEvent::Synced`]
    /// once the initial list has been delivered. After a dropped session the
    /// watcher may re-list, re-applying every live object (seen as Updated)
    /// and syncing again; objects deleted while disconnected are not reported.
    fn subscribe(&self, selector: &LabelSelector) -> NotificationStream {
        let config = watcher::Config::default().labels(&selector.to_string());
        let mut tracker = AppliedNames::default();

        watcher::watcher(self.api.clone(), config)
            .default_backoff()
            .filter_map(move |event| {
                let item = match event {
                    Ok(event) => tracker.translate(event).map(Ok),
                    Err(e) => Some(Err(StoreError::Watch(e.to_string()))),
                };
                future::ready(item)
            })
            .boxed()
    }
}

/// Tells Added from Updated, which the runtime watcher folds into a single
/// apply event.
#[derive(Default)]
struct AppliedNames {
    seen: HashSet<String>,
}

impl AppliedNames {
    fn translate(&mut self, event: Event<ConfigMap>) -> Option<WatchEvent> {
        let notification = match event {
            Event::Apply(config_map) | Event::InitApply(config_map) => {
                let record = to_record(config_map);
                let kind = if self.seen.insert(record.name.clone()) {
                    NotificationKind::Added
                } else {
                    NotificationKind::Updated
                };
                ChangeNotification::new(kind, record)
            }
            Event::Delete(config_map) => {
                let record = to_record(config_map);
                self.seen.remove(&record.name);
                ChangeNotification::new(NotificationKind::Removed, record)
            }
            Event::Init => return None,
            Event::InitDone => return Some(WatchEvent::Synced),
        };
        Some(WatchEvent::Changed(notification))
    }
}

fn map_error(error: kube::Error) -> StoreError {
    match error {
        kube::Error::Api(response) => StoreError::Api {
            code: response.code,
            message: response.message,
        },
        other => StoreError::Transport(other.to_string()),
    }
}

fn to_record(config_map: ConfigMap) -> RegistrationRecord {
    RegistrationRecord {
        name: config_map.metadata.name.unwrap_or_default(),
        labels: config_map.metadata.labels,
        annotations: config_map.metadata.annotations.unwrap_or_default(),
        data: config_map.data.unwrap_or_default(),
    }
}

fn to_config_map(record: &RegistrationRecord) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(record.name.clone()),
            namespace: Some(NAMESPACE.to_string()),
            labels: record.labels.clone(),
            annotations: (!record.annotations.is_empty()).then(|| record.annotations.clone()),
            ..Default::default()
        },
        data: Some(record.data.clone()),
        ..Default::default()
    }
}
