use std::sync::Arc;

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_vec_with_registry, IntCounter, IntGaugeVec, Registry,
};

use crate::broker_offsets::BrokerOffsetsRegister;
use crate::consumer_offsets::ConsumerOffsetsRegister;
use crate::metrics_sink::GaugeSink;
use crate::prometheus_metrics::{LABEL_GROUP, LABEL_PARTITION, LABEL_TOPIC};

const MET_LAG_NAME: &str = "consumer_partition_lag_offset";
const MET_LAG_HELP: &str = "The difference (lag) between the last produced offset and the last committed offset, \
    by the consumer group of the topic partition";
const MET_NEGATIVE_NAME: &str = "consumer_partition_negative_lag_total";
const MET_NEGATIVE_HELP: &str =
    "Lag data points dropped because the committed offset was ahead of the last produced offset";

/// Name of the gauge that carries the lag of `group` consuming `topic:partition`.
///
/// Format: `<prefix>.group.<group>.<topic>.<partition>`.
pub fn stat_name(prefix: &str, group: &str, topic: &str, partition: i32) -> String {
    format!("{prefix}.group.{group}.{topic}.{partition}")
}

/// What happened to a single lag data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LagOutcome {
    /// Handed to the sink
    Emitted,
    /// Committed offset ahead of latest offset: dropped
    Negative,
    /// The sink refused it: lost
    SinkFailed,
}

/// Lag of a Consumer Group for a Topic Partition, at the time of a [`LagReporter::report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LagPoint {
    pub group: String,
    pub topic: String,
    pub partition: i32,
    /// Last offset committed by `group`
    pub consumer_offset: i64,
    /// Latest produced offset; `None` if it was never polled
    pub broker_offset: Option<i64>,
    /// `broker_offset - consumer_offset`, with an unknown `broker_offset` counted as `0`
    pub lag: i64,
    pub outcome: LagOutcome,
}

/// Joins committed offsets and latest offsets into lag, and emits it as gauges.
pub struct LagReporter<S: GaugeSink> {
    consumer_register: Arc<ConsumerOffsetsRegister>,
    broker_register: Arc<BrokerOffsetsRegister>,
    sink: Arc<S>,
    prefix: String,

    // Prometheus Metrics
    metric_lag: IntGaugeVec,
    metric_negative: IntCounter,
}

impl<S: GaugeSink> LagReporter<S> {
    /// Create a new [`LagReporter`]
    ///
    /// # Arguments
    ///
    /// * `consumer_register` - Last committed offsets
    /// * `broker_register` - Latest produced offsets
    /// * `sink` - Where lag gauges are emitted
    /// * `prefix` - Prefix of every emitted stat name
    /// * `metrics` - Registry where lag is also tracked
    pub fn new(
        consumer_register: Arc<ConsumerOffsetsRegister>,
        broker_register: Arc<BrokerOffsetsRegister>,
        sink: Arc<S>,
        prefix: String,
        metrics: Arc<Registry>,
    ) -> Self {
        Self {
            consumer_register,
            broker_register,
            sink,
            prefix,
            metric_lag: register_int_gauge_vec_with_registry!(
                MET_LAG_NAME,
                MET_LAG_HELP,
                &[LABEL_GROUP, LABEL_TOPIC, LABEL_PARTITION],
                metrics
            )
            .unwrap_or_else(|e| panic!("Failed to create metric '{MET_LAG_NAME}': {e}")),
            metric_negative: register_int_counter_with_registry!(MET_NEGATIVE_NAME, MET_NEGATIVE_HELP, metrics)
                .unwrap_or_else(|e| panic!("Failed to create metric '{MET_NEGATIVE_NAME}': {e}")),
        }
    }

    /// Compute the lag of every `(group, topic, partition)` with a committed offset, and emit it.
    ///
    /// Negative lag is never emitted. Returns every computed [`LagPoint`].
    pub async fn report(&self) -> Vec<LagPoint> {
        let group_offsets = self.consumer_register.snapshot().await;
        let mut points = Vec::with_capacity(group_offsets.len());

        for go in group_offsets {
            let broker = self.broker_register.get(&go.topic, go.partition).await;
            let broker_offset = broker.map(|bo| bo.offset);
            if broker.is_none() {
                warn!(
                    "Latest offset of '{}:{}' not known yet: lag of group '{}' will be off",
                    go.topic, go.partition, go.group
                );
            }

            let lag = broker_offset.unwrap_or(0).saturating_sub(go.offset);
            let stat = stat_name(&self.prefix, &go.group, &go.topic, go.partition);

            let partition = go.partition.to_string();
            let outcome = if lag < 0 {
                warn!("Negative lag for '{stat}': {lag} (committed offset {} ahead of latest offset)", go.offset);
                self.metric_negative.inc();

                // A previous, non-negative lag is no longer current
                if let Err(e) = self.metric_lag.remove_label_values(&[&go.group, &go.topic, &partition]) {
                    trace!("No lag gauge to clear for '{stat}': {e}");
                }
                LagOutcome::Negative
            } else {
                self.metric_lag.with_label_values(&[&go.group, &go.topic, &partition]).set(lag);

                match self.sink.emit_gauge(&stat, lag) {
                    Ok(()) => LagOutcome::Emitted,
                    Err(e) => {
                        error!("{e}");
                        LagOutcome::SinkFailed
                    },
                }
            };

            debug!(
                "Group '{}' on '{}:{}': broker offset {:?} (read at {:?}), consumer offset {}, lag {} ({outcome:?})",
                go.group,
                go.topic,
                go.partition,
                broker_offset,
                broker.map(|bo| bo.timestamp),
                go.offset,
                lag
            );

            points.push(LagPoint {
                group: go.group,
                topic: go.topic,
                partition: go.partition,
                consumer_offset: go.offset,
                broker_offset,
                lag,
                outcome,
            });
        }

        let emitted = points.iter().filter(|p| p.outcome == LagOutcome::Emitted).count();
        debug!(
            "Reported lag of {} group partitions: {} emitted, {} dropped",
            points.len(),
            emitted,
            points.len() - emitted
        );
        points
    }
}
