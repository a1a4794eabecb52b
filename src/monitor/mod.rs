// Inner modules
mod driver;
mod errors;

use std::sync::Arc;

use prometheus::Registry;
use rdkafka::ClientConfig;
use tokio_util::sync::CancellationToken;

use crate::kafka_client::RdKafkaClient;
use crate::metrics_sink::StatsdSink;

// Exports
pub use driver::Monitor;
pub use errors::MonitorResult;

/// Connect to the Kafka cluster and to StatsD, then assemble a [`Monitor`] over empty offset tables.
///
/// # Arguments
///
/// * `client_config` - Kafka client configuration
/// * `statsd_addr` - StatsD server address (format: 'HOST:PORT')
/// * `statsd_prefix` - Prefix of every emitted stat name
/// * `shutdown_token` - Cancelled when it's time to shut down
/// * `metrics` - Registry for self-instrumentation
pub async fn init(
    client_config: ClientConfig,
    statsd_addr: &str,
    statsd_prefix: String,
    shutdown_token: CancellationToken,
    metrics: Arc<Registry>,
) -> MonitorResult<Monitor<RdKafkaClient, StatsdSink>> {
    let client = RdKafkaClient::connect(client_config).await?;
    let sink = StatsdSink::new(statsd_addr)?;

    let monitor = Monitor::new(Arc::new(client), Arc::new(sink), statsd_prefix, shutdown_token, metrics);

    debug!("Initialized");
    Ok(monitor)
}
