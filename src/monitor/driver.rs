use std::sync::Arc;

use prometheus::Registry;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

use crate::broker_offsets::{BrokerOffsetsPoller, BrokerOffsetsRegister, PollSummary};
use crate::consumer_offsets::{self, ConsumerOffsetsRegister};
use crate::kafka_client::KafkaClient;
use crate::lag_reporter::{LagOutcome, LagPoint, LagReporter};
use crate::metrics_sink::GaugeSink;

/// What happened during a single [`Monitor::tick`].
#[derive(Debug, Clone)]
pub struct TickSummary {
    pub poll: PollSummary,
    pub lag: Vec<LagPoint>,
}

/// Owns the offset tables, and drives ingestion, polling and reporting over them.
///
/// Ingestion of `__consumer_offsets` is started once by [`Monitor::run`], and continues in
/// the background; then, every interval, latest offsets are polled and lag is reported.
pub struct Monitor<C: KafkaClient, S: GaugeSink> {
    client: Arc<C>,
    consumer_register: Arc<ConsumerOffsetsRegister>,
    broker_register: Arc<BrokerOffsetsRegister>,
    poller: BrokerOffsetsPoller<C>,
    reporter: LagReporter<S>,
    shutdown_token: CancellationToken,
    metrics: Arc<Registry>,
}

impl<C: KafkaClient, S: GaugeSink> Monitor<C, S> {
    /// Create a new [`Monitor`], with empty offset tables.
    ///
    /// # Arguments
    ///
    /// * `client` - Kafka client
    /// * `sink` - Where lag gauges are emitted
    /// * `prefix` - Prefix of every emitted stat name
    /// * `shutdown_token` - Cancelled when it's time to shut down
    /// * `metrics` - Registry for self-instrumentation
    pub fn new(
        client: Arc<C>,
        sink: Arc<S>,
        prefix: String,
        shutdown_token: CancellationToken,
        metrics: Arc<Registry>,
    ) -> Self {
        let consumer_register = Arc::new(ConsumerOffsetsRegister::new());
        let broker_register = Arc::new(BrokerOffsetsRegister::new());

        Self {
            poller: BrokerOffsetsPoller::new(
                client.clone(),
                consumer_register.clone(),
                broker_register.clone(),
                metrics.clone(),
            ),
            reporter: LagReporter::new(
                consumer_register.clone(),
                broker_register.clone(),
                sink,
                prefix,
                metrics.clone(),
            ),
            client,
            consumer_register,
            broker_register,
            shutdown_token,
            metrics,
        }
    }

    /// Start ingesting `__consumer_offsets` into the consumer offsets table.
    ///
    /// Must be called once: the ingestor registers its own metrics.
    fn spawn_ingestor(&self) -> JoinHandle<()> {
        consumer_offsets::init(
            self.client.clone(),
            self.consumer_register.clone(),
            self.shutdown_token.clone(),
            self.metrics.clone(),
        )
    }

    /// Poll latest offsets, then compute and report lag.
    ///
    /// Reporting begins only once every latest offset request of this tick has completed.
    pub async fn tick(&self) -> TickSummary {
        let poll = self.poller.poll().await;
        let lag = self.reporter.report().await;

        let emitted = lag.iter().filter(|p| p.outcome == LagOutcome::Emitted).count();
        info!(
            "Polled {} leaders ({} partitions updated, {} unresolved); lag points: {} emitted, {} dropped",
            poll.leaders,
            poll.updated,
            poll.unresolved,
            emitted,
            lag.len() - emitted
        );
        trace!("{} broker offsets known", self.broker_register.len().await);

        TickSummary {
            poll,
            lag,
        }
    }

    /// Start ingestion, then tick every `interval`, until shutdown.
    ///
    /// Never returns during normal operation: only once the shutdown token is cancelled.
    pub async fn run(self, interval: Duration) {
        let ingestor = self.spawn_ingestor();
        info!("Monitoring consumer groups lag, every {}s", interval.as_secs_f64());

        loop {
            self.tick().await;

            tokio::select! {
                _ = sleep(interval) => {},
                _ = self.shutdown_token.cancelled() => {
                    info!("Stopped ticking");
                    break;
                },
            }
        }

        if let Err(e) = ingestor.await {
            error!("Consumer offsets ingestion failed: {e}");
        }
    }
}
