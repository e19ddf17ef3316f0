//! Hierarchical registration paths.
//!
//! These are the logical, storage independent identifiers of registered
//! interfaces and instances, e.g. `/shenyu/register/uri/{rpcType}/{context}/{host:port}`.
//! Stores with a flat naming scheme derive their object names from them, see
//! [`crate::naming`].

/// Root path of the register center.
pub const ROOT_PATH: &str = "/shenyu/register";

/// Root path of uri registrations.
pub const REGISTER_URI_INSTANCE_ROOT_PATH: &str = "/shenyu/register/uri";

/// Root path of metadata registrations.
pub const REGISTER_METADATA_INSTANCE_ROOT_PATH: &str = "/shenyu/register/metadata";

/// e.g. `/shenyu/register/uri/{rpcType}/{context}/{urlInstance}`
pub const REGISTER_URI_INSTANCE_PATH: &str = "/shenyu/register/uri/*/*/*";

/// e.g. `/shenyu/register/metadata/{rpcType}/{context}/{metadata}`
pub const REGISTER_METADATA_INSTANCE_PATH: &str = "/shenyu/register/metadata/*/*/*";

pub const PATH_SEPARATOR: &str = "/";

const DOT_SEPARATOR: &str = ".";

/// Token joining the context path and rule segments of an HTTP-family leaf.
pub const SELECTOR_JOIN_RULE: &str = "-";

pub fn build_metadata_context_path_parent(rpc_type: &str) -> String {
    [REGISTER_METADATA_INSTANCE_ROOT_PATH, rpc_type].join(PATH_SEPARATOR)
}

/// `/shenyu/register/metadata/{rpcType}/{contextPath}`
pub fn build_metadata_parent_path(rpc_type: &str, context_path: &str) -> String {
    [REGISTER_METADATA_INSTANCE_ROOT_PATH, rpc_type, context_path].join(PATH_SEPARATOR)
}

pub fn build_uri_context_path_parent(rpc_type: &str) -> String {
    [REGISTER_URI_INSTANCE_ROOT_PATH, rpc_type].join(PATH_SEPARATOR)
}

/// `/shenyu/register/uri/{rpcType}/{contextPath}`
pub fn build_uri_parent_path(rpc_type: &str, context_path: &str) -> String {
    [REGISTER_URI_INSTANCE_ROOT_PATH, rpc_type, context_path].join(PATH_SEPARATOR)
}

/// `/shenyu/register/{name}`, where `name` defaults to `instance`.
pub fn build_instance_parent_path(register_service_name: Option<&str>) -> String {
    [ROOT_PATH, register_service_name.unwrap_or("instance")].join(PATH_SEPARATOR)
}

pub fn build_real_node(node_path: &str, node_name: &str) -> String {
    [node_path, node_name].join(PATH_SEPARATOR)
}

/// `{serviceName}.{methodName}`
pub fn build_node_name(service_name: &str, method_name: &str) -> String {
    [service_name, method_name].join(DOT_SEPARATOR)
}

/// `shenyu.register.service.{rpcType}`
pub fn build_service_instance_path(rpc_type: &str) -> String {
    let path = [ROOT_PATH, "service", rpc_type].join(PATH_SEPARATOR);
    dotted(&path)
}

/// `shenyu.register.service.{rpcType}.{contextPath}`, with wildcards removed.
pub fn build_service_config_path(rpc_type: &str, context_path: &str) -> String {
    let path = [ROOT_PATH, "service", rpc_type, context_path]
        .join(PATH_SEPARATOR)
        .replace('*', "");
    let dotted = dotted(&path);
    match dotted.strip_suffix(DOT_SEPARATOR) {
        Some(trimmed) => trimmed.to_string(),
        None => dotted,
    }
}

fn dotted(path: &str) -> String {
    let replaced = path.replace(PATH_SEPARATOR, DOT_SEPARATOR);
    replaced
        .strip_prefix(DOT_SEPARATOR)
        .unwrap_or(&replaced)
        .to_string()
}

/// The context segment of a logical path: the context path without its
/// leading separator, or the application name when no context path is set.
pub fn real_context_node(context_path: Option<&str>, app_name: Option<&str>) -> String {
    match context_path.map(str::trim) {
        Some(ctx) if !ctx.is_empty() => ctx.strip_prefix(PATH_SEPARATOR).unwrap_or(ctx).to_string(),
        _ => app_name.unwrap_or_default().to_string(),
    }
}
