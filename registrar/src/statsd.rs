use crate::config::MetricsConfig;
use metrics_exporter_statsd::StatsdBuilder;
use shared::metrics_defs::describe_all;

const METRICS_PREFIX: &str = "registrar";

#[derive(thiserror::Error, Debug)]
pub enum MetricsError {
    #[error("could not build statsd recorder: {0}")]
    Statsd(#[from] metrics_exporter_statsd::StatsdError),
    #[error("a metrics recorder is already installed")]
    AlreadyInstalled,
}

/// Installs the statsd exporter as the global recorder. Without a config
/// the `metrics` macros stay no-ops.
pub fn init(config: Option<&MetricsConfig>) -> Result<(), MetricsError> {
    let Some(config) = config else {
        tracing::info!("No metrics config, statsd export disabled");
        return Ok(());
    };

    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some(METRICS_PREFIX))?;
    metrics::set_global_recorder(recorder).map_err(|_| MetricsError::AlreadyInstalled)?;

    describe_all(register_client::metrics_defs::ALL_METRICS);
    describe_all(register_server::metrics_defs::ALL_METRICS);

    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "Exporting metrics to statsd"
    );
    Ok(())
}
