use shared::metrics_defs::{MetricDef, MetricType};

pub const SCOPE_ALLOWED: MetricDef = MetricDef {
    name: "gateway.scope.allowed",
    metric_type: MetricType::Counter,
    description: "Requests that passed tenant-scope authorization",
};

pub const SCOPE_DENIED: MetricDef = MetricDef {
    name: "gateway.scope.denied",
    metric_type: MetricType::Counter,
    description: "Requests rejected by tenant-scope authorization",
};
