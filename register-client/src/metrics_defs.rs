//! Metrics definitions for the register client.

use shared::metrics_defs::{MetricDef, MetricType};

pub const REGISTER_UPSERT: MetricDef = MetricDef {
    name: "register.client.upsert",
    metric_type: MetricType::Counter,
    description: "Registration writes, labeled by record kind and outcome (created, replaced, failed)",
};

pub const REGISTER_OFFLINE: MetricDef = MetricDef {
    name: "register.client.offline",
    metric_type: MetricType::Counter,
    description: "Offline requests, labeled by the strategy applied",
};

pub const ALL_METRICS: &[MetricDef] = &[REGISTER_UPSERT, REGISTER_OFFLINE];
