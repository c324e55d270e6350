pub mod events;
pub mod ids;
pub mod metrics_defs;
