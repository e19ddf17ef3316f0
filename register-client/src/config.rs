use serde::Deserialize;

/// What `offline` does with the instance's uri record.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OfflineStrategy {
    /// Only log the request. The record stays until something else removes it.
    #[default]
    LogOnly,
    /// Delete the record, so watchers observe the instance going offline.
    DeleteRecord,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub offline_strategy: OfflineStrategy,
}
