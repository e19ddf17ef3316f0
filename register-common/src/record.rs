use crate::dto::{MetaDataRegisterDto, UriRegisterDto};
use crate::labels::{
    CONTEXT_PATH_ANNOTATION, DATA_KEY, IP_PORT_ANNOTATION, METADATA_FULL_PATH_ANNOTATION,
    REGISTER_LABEL, REGISTER_LABEL_VALUE, REGISTER_TYPE_LABEL, REGISTER_TYPE_METADATA,
    REGISTER_TYPE_URI, RPC_TYPE_LABEL, RULE_NAME_ANNOTATION, URI_FULL_PATH_ANNOTATION,
};
use crate::naming::{LogicalPath, ObjectName};
use std::collections::BTreeMap;

/// The stored unit of a registration: labels for selection and
/// classification, annotations for operators, and the JSON payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegistrationRecord {
    pub name: String,
    /// `None` when the stored object carries no labels at all.
    pub labels: Option<BTreeMap<String, String>>,
    pub annotations: BTreeMap<String, String>,
    pub data: BTreeMap<String, String>,
}

impl RegistrationRecord {
    pub fn for_metadata(
        name: &ObjectName,
        path: &LogicalPath,
        metadata: &MetaDataRegisterDto,
    ) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_string(metadata)?;

        let mut annotations = BTreeMap::new();
        if let Some(rule_name) = &metadata.rule_name {
            annotations.insert(RULE_NAME_ANNOTATION.to_string(), rule_name.clone());
        }
        if let Some(context_path) = &metadata.context_path {
            annotations.insert(CONTEXT_PATH_ANNOTATION.to_string(), context_path.clone());
        }
        annotations.insert(
            METADATA_FULL_PATH_ANNOTATION.to_string(),
            path.metadata_path(),
        );

        Ok(RegistrationRecord {
            name: name.to_string(),
            labels: Some(registration_labels(REGISTER_TYPE_METADATA, &metadata.rpc_type)),
            annotations,
            data: BTreeMap::from([(DATA_KEY.to_string(), payload)]),
        })
    }

    pub fn for_uri(
        name: &ObjectName,
        path: &LogicalPath,
        uri: &UriRegisterDto,
    ) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_string(uri)?;

        let mut annotations = BTreeMap::from([
            (IP_PORT_ANNOTATION.to_string(), uri.instance()),
            (URI_FULL_PATH_ANNOTATION.to_string(), path.uri_path()),
        ]);
        if let Some(context_path) = &uri.context_path {
            annotations.insert(CONTEXT_PATH_ANNOTATION.to_string(), context_path.clone());
        }

        Ok(RegistrationRecord {
            name: name.to_string(),
            labels: Some(registration_labels(REGISTER_TYPE_URI, &uri.rpc_type)),
            annotations,
            data: BTreeMap::from([(DATA_KEY.to_string(), payload)]),
        })
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.as_ref()?.get(key).map(String::as_str)
    }

    /// The JSON payload, if present.
    pub fn payload(&self) -> Option<&str> {
        self.data.get(DATA_KEY).map(String::as_str)
    }
}

fn registration_labels(kind: &str, rpc_type: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (REGISTER_LABEL.to_string(), REGISTER_LABEL_VALUE.to_string()),
        (REGISTER_TYPE_LABEL.to_string(), kind.to_string()),
        (RPC_TYPE_LABEL.to_string(), rpc_type.to_string()),
    ])
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Added,
    Updated,
    Removed,
}

/// A raw change delivered by a watch subscription.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeNotification {
    pub kind: NotificationKind,
    pub record: RegistrationRecord,
}

impl ChangeNotification {
    pub fn new(kind: NotificationKind, record: RegistrationRecord) -> Self {
        ChangeNotification { kind, record }
    }
}

/// An item of a watch session.
#[derive(Clone, Debug, PartialEq)]
pub enum WatchEvent {
    /// The session is established and every record present when it opened
    /// has been delivered. Sent again after the session recovers from a
    /// re-list.
    Synced,
    Changed(ChangeNotification),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::{encode_metadata_name, encode_uri_name};

    #[test]
    fn test_metadata_record() {
        let metadata = MetaDataRegisterDto {
            rpc_type: "http".into(),
            context_path: Some("/order".into()),
            rule_name: Some("create".into()),
            ..Default::default()
        };
        let path = LogicalPath::for_metadata(&metadata).unwrap();
        let name = encode_metadata_name(&path).unwrap();
        let record = RegistrationRecord::for_metadata(&name, &path, &metadata).unwrap();

        assert!(record.name.starts_with("register-metadata-"));
        assert_eq!(record.label(REGISTER_LABEL), Some("true"));
        assert_eq!(record.label(REGISTER_TYPE_LABEL), Some("metadata"));
        assert_eq!(record.label(RPC_TYPE_LABEL), Some("http"));
        assert_eq!(record.annotations[RULE_NAME_ANNOTATION], "create");
        assert_eq!(record.annotations[CONTEXT_PATH_ANNOTATION], "/order");
        assert_eq!(
            record.annotations[METADATA_FULL_PATH_ANNOTATION],
            "/shenyu/register/metadata/http/order/order-create"
        );

        let decoded: MetaDataRegisterDto = serde_json::from_str(record.payload().unwrap()).unwrap();
        assert_eq!(decoded, metadata);
    }

    #[test]
    fn test_uri_record() {
        let uri = UriRegisterDto {
            rpc_type: "grpc".into(),
            app_name: Some("order".into()),
            host: "10.0.0.5".into(),
            port: 8080,
            ..Default::default()
        };
        let path = LogicalPath::for_uri(&uri);
        let name = encode_uri_name(&path).unwrap();
        let record = RegistrationRecord::for_uri(&name, &path, &uri).unwrap();

        assert_eq!(record.label(REGISTER_TYPE_LABEL), Some("uri"));
        assert_eq!(record.label(RPC_TYPE_LABEL), Some("grpc"));
        assert_eq!(record.annotations[IP_PORT_ANNOTATION], "10.0.0.5:8080");
        assert_eq!(
            record.annotations[URI_FULL_PATH_ANNOTATION],
            "/shenyu/register/uri/grpc/order/10.0.0.5:8080"
        );
        assert!(!record.annotations.contains_key(CONTEXT_PATH_ANNOTATION));
        assert_eq!(record.data.len(), 1);
    }

    #[test]
    fn test_label_lookup_without_labels() {
        let record = RegistrationRecord::default();
        assert_eq!(record.label(REGISTER_TYPE_LABEL), None);
        assert_eq!(record.payload(), None);
    }
}
