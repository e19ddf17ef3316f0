//! Maps hierarchical registration paths to flat object names.
//!
//! Object names must be lowercase RFC 1123 labels, while logical paths are
//! case sensitive and contain `/`, `*` and `:`. A name is the kind prefix
//! followed by the lowercase hex encoding of the path below its kind root:
//!
//! ```text
//! /shenyu/register/uri/http/order/10.0.0.5:8080
//!   -> register-uri-2f687474702f6f726465722f31302e302e302e353a38303830
//! ```
//!
//! Encoding is pure and injective, so distinct paths never share a name.
use crate::dto::{MetaDataRegisterDto, UriRegisterDto, is_http_family};
use crate::labels::RecordKind;
use crate::path::{
    PATH_SEPARATOR, REGISTER_METADATA_INSTANCE_ROOT_PATH, REGISTER_URI_INSTANCE_ROOT_PATH,
    SELECTOR_JOIN_RULE, build_metadata_parent_path, build_node_name, build_real_node,
    build_uri_parent_path, real_context_node,
};
use std::fmt;

pub const METADATA_NAME_PREFIX: &str = "register-metadata-";
pub const URI_NAME_PREFIX: &str = "register-uri-";

/// Longest object name the platform accepts. Not enforced here.
pub const MAX_OBJECT_NAME_LEN: usize = 253;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum NamingError {
    #[error("logical path is empty")]
    EmptyPath,
    #[error("missing {0} to build the logical path")]
    MissingField(&'static str),
    #[error("not a registration object name: {0}")]
    UnknownPrefix(String),
    #[error("malformed object name {name}: {reason}")]
    Malformed { name: String, reason: String },
}

/// `(rpcType, contextPath, leaf)` identity of a registration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LogicalPath {
    pub rpc_type: String,
    pub context_path: String,
    pub leaf: String,
}

impl LogicalPath {
    pub fn new<R, C, L>(rpc_type: R, context_path: C, leaf: L) -> Self
    where
        R: Into<String>,
        C: Into<String>,
        L: Into<String>,
    {
        LogicalPath {
            rpc_type: rpc_type.into(),
            context_path: context_path.into(),
            leaf: leaf.into(),
        }
    }

    /// Path of a metadata registration. HTTP-family leaves come from the
    /// rule name, all other protocols use `service.method`.
    pub fn for_metadata(metadata: &MetaDataRegisterDto) -> Result<Self, NamingError> {
        let leaf = if is_http_family(&metadata.rpc_type) {
            let rule_name = metadata
                .rule_name
                .as_deref()
                .ok_or(NamingError::MissingField("ruleName"))?;
            build_leaf_for_http_family(metadata.context_path.as_deref().unwrap_or_default(), rule_name)
        } else {
            let service_name = metadata
                .service_name
                .as_deref()
                .ok_or(NamingError::MissingField("serviceName"))?;
            let method_name = metadata
                .method_name
                .as_deref()
                .ok_or(NamingError::MissingField("methodName"))?;
            build_leaf_for_rpc_family(service_name, method_name)
        };

        Ok(LogicalPath::new(
            metadata.rpc_type.clone(),
            real_context_node(metadata.context_path.as_deref(), metadata.app_name.as_deref()),
            leaf,
        ))
    }

    pub fn for_uri(uri: &UriRegisterDto) -> Self {
        LogicalPath::new(
            uri.rpc_type.clone(),
            real_context_node(uri.context_path.as_deref(), uri.app_name.as_deref()),
            uri.instance(),
        )
    }

    /// `/shenyu/register/metadata/{rpcType}/{contextPath}/{leaf}`
    pub fn metadata_path(&self) -> String {
        build_real_node(
            &build_metadata_parent_path(&self.rpc_type, &self.context_path),
            &self.leaf,
        )
    }

    /// `/shenyu/register/uri/{rpcType}/{contextPath}/{leaf}`
    pub fn uri_path(&self) -> String {
        build_real_node(
            &build_uri_parent_path(&self.rpc_type, &self.context_path),
            &self.leaf,
        )
    }

    fn is_empty(&self) -> bool {
        self.rpc_type.is_empty() && self.context_path.is_empty() && self.leaf.is_empty()
    }
}

/// Flat, platform-legal name of a registration record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectName(String);

impl ObjectName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn exceeds_platform_limit(&self) -> bool {
        self.0.len() > MAX_OBJECT_NAME_LEN
    }

    /// Recovers the kind and full logical path from a name produced by
    /// [`encode_metadata_name`] or [`encode_uri_name`]. Those only encode
    /// paths below the kind root, which is what makes re-rooting the decoded
    /// suffix sound. Any other name with a known prefix decodes to a path
    /// that was never written.
    pub fn decode(&self) -> Result<(RecordKind, String), NamingError> {
        let (kind, root, encoded) = if let Some(rest) = self.0.strip_prefix(METADATA_NAME_PREFIX) {
            (RecordKind::Metadata, REGISTER_METADATA_INSTANCE_ROOT_PATH, rest)
        } else if let Some(rest) = self.0.strip_prefix(URI_NAME_PREFIX) {
            (RecordKind::Uri, REGISTER_URI_INSTANCE_ROOT_PATH, rest)
        } else {
            return Err(NamingError::UnknownPrefix(self.0.clone()));
        };

        let malformed = |reason: String| NamingError::Malformed {
            name: self.0.clone(),
            reason,
        };
        let bytes = hex::decode(encoded).map_err(|e| malformed(e.to_string()))?;
        let suffix = String::from_utf8(bytes).map_err(|e| malformed(e.to_string()))?;

        // Names are only built from paths under the kind root, so the root
        // was stripped whenever the remainder is itself absolute.
        let path = if suffix.starts_with(PATH_SEPARATOR) {
            format!("{root}{suffix}")
        } else {
            suffix
        };
        Ok((kind, path))
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wraps a name read back from the store.
impl From<String> for ObjectName {
    fn from(name: String) -> Self {
        ObjectName(name)
    }
}

impl From<ObjectName> for String {
    fn from(name: ObjectName) -> Self {
        name.0
    }
}

pub fn encode_metadata_name(path: &LogicalPath) -> Result<ObjectName, NamingError> {
    if path.is_empty() {
        return Err(NamingError::EmptyPath);
    }
    encode_full_path(
        &path.metadata_path(),
        REGISTER_METADATA_INSTANCE_ROOT_PATH,
        METADATA_NAME_PREFIX,
    )
}

pub fn encode_uri_name(path: &LogicalPath) -> Result<ObjectName, NamingError> {
    if path.is_empty() {
        return Err(NamingError::EmptyPath);
    }
    encode_full_path(&path.uri_path(), REGISTER_URI_INSTANCE_ROOT_PATH, URI_NAME_PREFIX)
}

/// Encodes a full path, stripping `root` when the path lies below it.
/// Paths outside `root` keep their leading separator and would not survive
/// [`ObjectName::decode`], so only the kind-specific encoders call this.
fn encode_full_path(
    full_path: &str,
    root: &str,
    prefix: &str,
) -> Result<ObjectName, NamingError> {
    if full_path.is_empty() {
        return Err(NamingError::EmptyPath);
    }
    let relative = full_path.strip_prefix(root).unwrap_or(full_path);
    // hex::encode emits lowercase digits
    Ok(ObjectName(format!("{prefix}{}", hex::encode(relative.as_bytes()))))
}

/// Flat leaf of an HTTP-family metadata path: the context path and the rule
/// name joined by `-`, with separators inside the rule rewritten to `-`.
pub fn build_leaf_for_http_family(context_path: &str, rule_name: &str) -> String {
    let rule = rule_name.replace(PATH_SEPARATOR, SELECTOR_JOIN_RULE);
    let leaf = [context_path, rule.as_str()].join(SELECTOR_JOIN_RULE);
    strip_leading_separator(leaf)
}

/// Leaf of an RPC-family metadata path: `service.method`.
pub fn build_leaf_for_rpc_family(service_name: &str, method_name: &str) -> String {
    strip_leading_separator(build_node_name(service_name, method_name))
}

fn strip_leading_separator(leaf: String) -> String {
    match leaf.strip_prefix(PATH_SEPARATOR) {
        Some(stripped) => stripped.to_string(),
        None => leaf,
    }
}
