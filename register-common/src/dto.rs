//! Registration payloads exchanged between producers and the gateway.
//!
//! Both DTOs are stored as camelCase JSON in the record's data field. Every
//! field is optional on decode so that payloads written by older or newer
//! producers still classify.
use serde::{Deserialize, Serialize};
use std::fmt;

pub const RPC_TYPE_HTTP: &str = "http";
pub const RPC_TYPE_SPRING_CLOUD: &str = "springCloud";

/// HTTP-family protocols name their metadata leaves after the rule, all other
/// protocols after `service.method`.
pub fn is_http_family(rpc_type: &str) -> bool {
    rpc_type == RPC_TYPE_HTTP || rpc_type == RPC_TYPE_SPRING_CLOUD
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    #[default]
    Register,
    Updated,
    Deleted,
    Ignored,
    Offline,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::Register => "REGISTER",
            EventType::Updated => "UPDATED",
            EventType::Deleted => "DELETED",
            EventType::Ignored => "IGNORED",
            EventType::Offline => "OFFLINE",
        };
        f.write_str(name)
    }
}

/// Describes one API endpoint: its route rule, context path and protocol.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaDataRegisterDto {
    pub app_name: Option<String>,
    pub context_path: Option<String>,
    pub path: Option<String>,
    pub path_desc: Option<String>,
    pub rpc_type: String,
    pub service_name: Option<String>,
    pub method_name: Option<String>,
    pub rule_name: Option<String>,
    pub parameter_types: Option<String>,
    pub rpc_ext: Option<String>,
    pub enabled: bool,
    pub host: Option<String>,
    pub port: Option<i32>,
    pub plugin_names: Vec<String>,
    pub register_meta_data: bool,
    pub time_millis: Option<u64>,
    pub add_prefixed: bool,
    pub namespace_id: Option<String>,
}

/// A live network instance of a service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UriRegisterDto {
    pub protocol: Option<String>,
    pub app_name: Option<String>,
    pub context_path: Option<String>,
    pub rpc_type: String,
    pub host: String,
    /// Any 32-bit integer producers send is accepted; not range-checked.
    pub port: i32,
    pub event_type: EventType,
    pub namespace_id: Option<String>,
}

impl UriRegisterDto {
    /// `host:port`, the leaf of a uri logical path.
    pub fn instance(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// What the gateway's publisher receives for each accepted change.
#[derive(Clone, Debug, PartialEq)]
pub enum RegisterEvent {
    Metadata(MetaDataRegisterDto),
    Uri(UriRegisterDto),
}

impl RegisterEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            RegisterEvent::Metadata(_) => EventType::Register,
            RegisterEvent::Uri(uri) => uri.event_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_metadata() {
        let json = r#"{
            "appName": "order-service",
            "contextPath": "/order",
            "path": "/order/create",
            "rpcType": "http",
            "ruleName": "/order/create",
            "enabled": true,
            "pluginNames": ["divide"],
            "unknownField": 1
        }"#;

        let dto: MetaDataRegisterDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.app_name.as_deref(), Some("order-service"));
        assert_eq!(dto.rule_name.as_deref(), Some("/order/create"));
        assert_eq!(dto.plugin_names, vec!["divide".to_string()]);
        assert!(dto.enabled);
        assert!(!dto.register_meta_data);
    }

    #[test]
    fn test_uri_wire_format() {
        let dto = UriRegisterDto {
            rpc_type: "http".into(),
            host: "10.0.0.5".into(),
            port: 8080,
            event_type: EventType::Offline,
            ..Default::default()
        };

        let value = serde_json::to_value(&dto).unwrap();
        assert_eq!(value["rpcType"], "http");
        assert_eq!(value["eventType"], "OFFLINE");
        assert_eq!(dto.instance(), "10.0.0.5:8080");

        let decoded: UriRegisterDto = serde_json::from_str(r#"{"host":"10.0.0.5","port":8080}"#).unwrap();
        assert_eq!(decoded.event_type, EventType::Register);
        assert_eq!(decoded.port, 8080);
    }

    #[test]
    fn test_out_of_range_port_still_decodes() {
        let decoded: UriRegisterDto =
            serde_json::from_str(r#"{"rpcType":"http","host":"10.0.0.5","port":70000}"#).unwrap();
        assert_eq!(decoded.instance(), "10.0.0.5:70000");

        let decoded: MetaDataRegisterDto =
            serde_json::from_str(r#"{"rpcType":"http","port":-1}"#).unwrap();
        assert_eq!(decoded.port, Some(-1));
    }

    #[test]
    fn test_http_family() {
        assert!(is_http_family("http"));
        assert!(is_http_family("springCloud"));
        assert!(!is_http_family("dubbo"));
        assert!(!is_http_family("HTTP"));
    }
}
