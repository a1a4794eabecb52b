use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry, Histogram, IntCounterVec, Registry,
};
use tokio::task::JoinSet;

use super::register::BrokerOffsetsRegister;
use crate::consumer_offsets::ConsumerOffsetsRegister;
use crate::kafka_client::{KafkaClient, KafkaClientResult};
use crate::kafka_types::{BrokerId, TopicPartition};
use crate::prometheus_metrics::LABEL_OUTCOME;

const MET_POLL_NAME: &str = "broker_offsets_poll_time_seconds";
const MET_POLL_HELP: &str = "Time (s) taken to poll the latest offsets of all consumed topic partitions";
const MET_REQUESTS_NAME: &str = "broker_offsets_leader_requests_total";
const MET_REQUESTS_HELP: &str = "Latest offsets requests sent to partition leaders, by outcome (ok, failed)";

/// Topic Partitions to request the latest offset of, grouped by their current leader.
type LeaderBatches = BTreeMap<BrokerId, Vec<TopicPartition>>;

/// What happened during a single [`BrokerOffsetsPoller::poll`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Topic Partitions that consumers have committed offsets for
    pub targets: usize,
    /// Targets whose leader could not be resolved: not polled this time
    pub unresolved: usize,
    /// Leaders that were sent a request
    pub leaders: usize,
    /// Leaders whose request failed as a whole
    pub failed_leaders: usize,
    /// Partitions the leader could not provide an offset for
    pub failed_items: usize,
    /// Partitions whose latest offset was updated
    pub updated: usize,
}

/// Outcome of the request sent to a single leader.
#[derive(Debug, Default)]
struct LeaderOutcome {
    updated: usize,
    failed_items: usize,
}

/// Polls partition leaders for the latest offset of the Topic Partitions that Consumer Groups
/// commit offsets for, and stores them into a [`BrokerOffsetsRegister`].
pub struct BrokerOffsetsPoller<C: KafkaClient> {
    client: Arc<C>,
    consumer_register: Arc<ConsumerOffsetsRegister>,
    broker_register: Arc<BrokerOffsetsRegister>,

    // Prometheus Metrics
    metric_poll: Histogram,
    metric_requests: IntCounterVec,
}

impl<C: KafkaClient> BrokerOffsetsPoller<C> {
    /// Create a new [`BrokerOffsetsPoller`]
    ///
    /// # Arguments
    ///
    /// * `client` - Kafka client, used to resolve leaders and request offsets
    /// * `consumer_register` - Source of the Topic Partitions to poll
    /// * `broker_register` - Destination of the polled offsets
    /// * `metrics` - Registry for the polling metrics
    pub fn new(
        client: Arc<C>,
        consumer_register: Arc<ConsumerOffsetsRegister>,
        broker_register: Arc<BrokerOffsetsRegister>,
        metrics: Arc<Registry>,
    ) -> Self {
        Self {
            client,
            consumer_register,
            broker_register,
            metric_poll: register_histogram_with_registry!(MET_POLL_NAME, MET_POLL_HELP, metrics)
                .unwrap_or_else(|e| panic!("Failed to create metric '{MET_POLL_NAME}': {e}")),
            metric_requests: register_int_counter_vec_with_registry!(
                MET_REQUESTS_NAME,
                MET_REQUESTS_HELP,
                &[LABEL_OUTCOME],
                metrics
            )
            .unwrap_or_else(|e| panic!("Failed to create metric '{MET_REQUESTS_NAME}': {e}")),
        }
    }

    /// Poll the latest offset of every Topic Partition currently known to have consumers.
    ///
    /// One request is sent per leader, all at the same time.
    /// Returns only once every request has completed (or failed).
    pub async fn poll(&self) -> PollSummary {
        let timer = self.metric_poll.start_timer();

        let targets = self.consumer_register.snapshot_topic_partitions().await;
        let mut summary = PollSummary {
            targets: targets.len(),
            ..Default::default()
        };

        let (batches, unresolved) = self.build_leader_batches(targets).await;
        summary.unresolved = unresolved;
        summary.leaders = batches.len();

        let mut requests = JoinSet::new();
        for (leader, batch) in batches {
            trace!("Requesting latest offsets of {} partitions to {leader}", batch.len());
            requests.spawn(request_latest_offsets(self.client.clone(), self.broker_register.clone(), leader, batch));
        }

        while let Some(res) = requests.join_next().await {
            match res {
                Ok(Ok(outcome)) => {
                    self.metric_requests.with_label_values(&["ok"]).inc();
                    summary.updated += outcome.updated;
                    summary.failed_items += outcome.failed_items;
                },
                Ok(Err(e)) => {
                    self.metric_requests.with_label_values(&["failed"]).inc();
                    error!("{e}");
                    summary.failed_leaders += 1;
                },
                Err(e) => {
                    self.metric_requests.with_label_values(&["failed"]).inc();
                    error!("Latest offsets request task failed: {e}");
                    summary.failed_leaders += 1;
                },
            }
        }

        timer.observe_duration();
        debug!("Polled broker offsets: {summary:?}");
        summary
    }

    /// Group `targets` by their current leader.
    ///
    /// Leaders are looked up once per topic, for all its targeted partitions.
    /// Targets whose leader can't be resolved are left out: returns how many.
    async fn build_leader_batches(&self, targets: BTreeSet<TopicPartition>) -> (LeaderBatches, usize) {
        let mut partitions_by_topic: BTreeMap<String, Vec<i32>> = BTreeMap::new();
        for tp in targets {
            partitions_by_topic.entry(tp.topic).or_default().push(tp.partition);
        }

        let mut batches = LeaderBatches::new();
        let mut unresolved = 0;

        for (topic, partitions) in partitions_by_topic {
            for (partition, res) in self.client.resolve_leaders(&topic, &partitions).await {
                let tp = TopicPartition::new(topic.as_str(), partition);
                match res {
                    Ok(leader) => batches.entry(leader).or_default().push(tp),
                    Err(e) => {
                        warn!("Skipping '{tp}' this time: {e}");
                        unresolved += 1;
                    },
                }
            }
        }

        (batches, unresolved)
    }
}

async fn request_latest_offsets<C: KafkaClient>(
    client: Arc<C>,
    broker_register: Arc<BrokerOffsetsRegister>,
    leader: BrokerId,
    batch: Vec<TopicPartition>,
) -> KafkaClientResult<LeaderOutcome> {
    let response = client.fetch_latest_offsets(leader, batch).await?;

    let mut outcome = LeaderOutcome::default();
    for (topic, blocks) in response {
        for (partition, block) in blocks {
            if let Some(e) = block.error {
                warn!("{leader} could not provide latest offset of '{topic}:{partition}': {e}");
                outcome.failed_items += 1;
                continue;
            }

            broker_register.upsert(topic.clone(), partition, block.offset, block.timestamp).await;
            outcome.updated += 1;
        }
    }

    Ok(outcome)
}
