//! Metrics definitions for the register server.

use shared::metrics_defs::{MetricDef, MetricType};

pub const WATCH_NOTIFICATIONS: MetricDef = MetricDef {
    name: "register.server.watch.notifications",
    metric_type: MetricType::Counter,
    description: "Change notifications received from the watch session",
};

pub const WATCH_ERRORS: MetricDef = MetricDef {
    name: "register.server.watch.errors",
    metric_type: MetricType::Counter,
    description: "Errors reported by the watch session",
};

pub const WATCH_SYNCED: MetricDef = MetricDef {
    name: "register.server.watch.synced",
    metric_type: MetricType::Gauge,
    description: "1 while the watch session is synced with the store, 0 otherwise",
};

pub const DISPATCH_FORWARDED: MetricDef = MetricDef {
    name: "register.server.dispatch.forwarded",
    metric_type: MetricType::Counter,
    description: "Events handed to the publisher, labeled by kind and event type",
};

pub const DISPATCH_DROPPED: MetricDef = MetricDef {
    name: "register.server.dispatch.dropped",
    metric_type: MetricType::Counter,
    description: "Notifications dropped by the classifier, labeled by reason",
};

pub const PUBLISH_FAILED: MetricDef = MetricDef {
    name: "register.server.publish.failed",
    metric_type: MetricType::Counter,
    description: "Events the publisher failed to accept",
};

pub const ALL_METRICS: &[MetricDef] = &[
    WATCH_NOTIFICATIONS,
    WATCH_ERRORS,
    WATCH_SYNCED,
    DISPATCH_FORWARDED,
    DISPATCH_DROPPED,
    PUBLISH_FAILED,
];
