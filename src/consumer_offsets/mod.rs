// Inner modules
mod ingestor;
mod register;

use std::sync::Arc;

use prometheus::Registry;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::kafka_client::KafkaClient;

// Exports
pub use ingestor::ConsumerOffsetsIngestor;
pub use register::ConsumerOffsetsRegister;

/// Start mirroring `__consumer_offsets` into the given register.
///
/// The returned [`JoinHandle`] is never joined during normal operation.
pub fn init<C: KafkaClient>(
    client: Arc<C>,
    register: Arc<ConsumerOffsetsRegister>,
    shutdown_token: CancellationToken,
    metrics: Arc<Registry>,
) -> JoinHandle<()> {
    let join = ConsumerOffsetsIngestor::new(client, register, metrics).spawn(shutdown_token);

    debug!("Initialized");
    join
}
