use crate::config::MetricsConfig;
use metrics_exporter_statsd::StatsdBuilder;
use tracing_subscriber::EnvFilter;

/// Installs the tracing subscriber and, when configured, the statsd
/// metrics recorder. A failed exporter never blocks startup.
pub fn init(metrics: Option<&MetricsConfig>) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Some(config) = metrics {
        match StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
            .build(Some("matchday"))
        {
            Ok(recorder) => {
                if metrics::set_global_recorder(recorder).is_err() {
                    tracing::warn!("metrics recorder was already installed");
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not build statsd exporter");
            }
        }
    }
}
