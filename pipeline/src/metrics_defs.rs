use shared::metrics_defs::{MetricDef, MetricType};

pub const EVENTS_PUBLISHED: MetricDef = MetricDef {
    name: "pipeline.bus.events_published",
    metric_type: MetricType::Counter,
    description: "Events published on the in-process bus",
};

pub const HANDLER_FAILURES: MetricDef = MetricDef {
    name: "pipeline.bus.handler_failures",
    metric_type: MetricType::Counter,
    description: "Subscriber handlers that returned an error during fan-out",
};

pub const RUNS_COMMITTED: MetricDef = MetricDef {
    name: "pipeline.runs_committed",
    metric_type: MetricType::Counter,
    description: "Moment-handler runs whose results were cached and published",
};

pub const OPTIMIZE_DURATION: MetricDef = MetricDef {
    name: "pipeline.optimizer.duration_seconds",
    metric_type: MetricType::Histogram,
    description: "Wall time of calls to the optimization engine",
};
