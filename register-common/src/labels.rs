//! Label and annotation keys carried by registration records, and the
//! record kind derived from them.
use std::collections::BTreeMap;
use std::fmt;

/// Namespace holding every registration record.
pub const NAMESPACE: &str = "shenyu";

macro_rules! shenyu_key {
    ($name:literal) => {
        concat!("shenyu.apache.org/", $name)
    };
}

/// Marks an object as a registration record. Watchers select on it.
pub const REGISTER_LABEL: &str = shenyu_key!("register");
pub const REGISTER_LABEL_VALUE: &str = "true";

/// Kind label, see [`RecordKind`].
pub const REGISTER_TYPE_LABEL: &str = shenyu_key!("register-type");
pub const REGISTER_TYPE_METADATA: &str = "metadata";
pub const REGISTER_TYPE_URI: &str = "uri";
pub const REGISTER_TYPE_API_DOC: &str = "api-doc";

pub const RPC_TYPE_LABEL: &str = shenyu_key!("register-rpc-type");

// Annotations are informational copies of the logical path. Nothing decodes them.
pub const RULE_NAME_ANNOTATION: &str = shenyu_key!("rule-name");
pub const CONTEXT_PATH_ANNOTATION: &str = shenyu_key!("context-path");
pub const IP_PORT_ANNOTATION: &str = shenyu_key!("ip-port");
pub const METADATA_FULL_PATH_ANNOTATION: &str = shenyu_key!("register-metadata-full-path");
pub const URI_FULL_PATH_ANNOTATION: &str = shenyu_key!("register-uri-full-path");

/// Key of the single data entry holding the JSON payload.
pub const DATA_KEY: &str = "data";

/// Payload kind of a registration record, decoded once from the kind label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Metadata,
    Uri,
    ApiDoc,
    Unknown(String),
}

impl RecordKind {
    pub fn from_label(value: &str) -> Self {
        match value {
            REGISTER_TYPE_METADATA => RecordKind::Metadata,
            REGISTER_TYPE_URI => RecordKind::Uri,
            REGISTER_TYPE_API_DOC => RecordKind::ApiDoc,
            other => RecordKind::Unknown(other.to_string()),
        }
    }

    pub fn as_label(&self) -> &str {
        match self {
            RecordKind::Metadata => REGISTER_TYPE_METADATA,
            RecordKind::Uri => REGISTER_TYPE_URI,
            RecordKind::ApiDoc => REGISTER_TYPE_API_DOC,
            RecordKind::Unknown(value) => value,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// An equality-based label selector, rendered as `key=value[,key=value]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelSelector {
    terms: BTreeMap<String, String>,
}

impl LabelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects registration records only.
    pub fn registration_records() -> Self {
        Self::new().with(REGISTER_LABEL, REGISTER_LABEL_VALUE)
    }

    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.terms.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        self.terms.iter().all(|(key, value)| {
            labels
                .and_then(|labels| labels.get(key))
                .is_some_and(|actual| actual == value)
        })
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}
