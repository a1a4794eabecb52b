use std::sync::Arc;

use prometheus::{register_int_counter_vec_with_registry, IntCounterVec, Registry};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use super::register::ConsumerOffsetsRegister;
use crate::constants::CONSUMER_OFFSETS_TOPIC;
use crate::kafka_client::{KafkaClient, PartitionTail, RawRecord};
use crate::offset_codec::{decode_commit, DecodeError};
use crate::prometheus_metrics::LABEL_OUTCOME;

const MET_RECORDS_NAME: &str = "consumer_offsets_records_total";
const MET_RECORDS_HELP: &str = "Records read from __consumer_offsets, by outcome (upserted, skipped, failed)";

const OUTCOME_UPSERTED: &str = "upserted";
const OUTCOME_SKIPPED: &str = "skipped";
const OUTCOME_FAILED: &str = "failed";

/// Mirrors `__consumer_offsets` into a [`ConsumerOffsetsRegister`].
///
/// Every partition of `__consumer_offsets` is tailed by its own task, from the newest offset:
/// only commits that happen after startup are seen.
/// Records are decoded into offset commits, that are then upserted into the register.
///
/// It shuts down when the provided [`CancellationToken`] is cancelled.
pub struct ConsumerOffsetsIngestor<C: KafkaClient> {
    client: Arc<C>,
    register: Arc<ConsumerOffsetsRegister>,

    // Prometheus Metrics
    metric_records: IntCounterVec,
}

impl<C: KafkaClient> ConsumerOffsetsIngestor<C> {
    /// Create a new [`ConsumerOffsetsIngestor`]
    ///
    /// # Arguments
    ///
    /// * `client` - Kafka client, used to tail the partitions of `__consumer_offsets`
    /// * `register` - Where decoded offset commits are upserted
    /// * `metrics` - Registry for the ingestion metrics
    pub fn new(client: Arc<C>, register: Arc<ConsumerOffsetsRegister>, metrics: Arc<Registry>) -> Self {
        Self {
            client,
            register,
            metric_records: register_int_counter_vec_with_registry!(
                MET_RECORDS_NAME,
                MET_RECORDS_HELP,
                &[LABEL_OUTCOME],
                metrics
            )
            .unwrap_or_else(|e| panic!("Failed to create metric '{MET_RECORDS_NAME}': {e}")),
        }
    }

    /// Spawn a new async task that tails all the partitions of `__consumer_offsets`.
    ///
    /// The returned [`JoinHandle`] concludes only once every per-partition task has concluded:
    /// that is, when their tail ends or when `shutdown_token` is cancelled.
    ///
    /// # Arguments
    ///
    /// * `shutdown_token`: A [`CancellationToken`] that, when cancelled, will make the per-partition tasks terminate.
    pub fn spawn(&self, shutdown_token: CancellationToken) -> JoinHandle<()> {
        let client = self.client.clone();
        let register = self.register.clone();
        let metric_records = self.metric_records.clone();

        tokio::spawn(async move {
            let partitions = match client.list_partitions(CONSUMER_OFFSETS_TOPIC).await {
                Ok(partitions) => partitions,
                Err(e) => {
                    error!("Failed to list partitions of '{CONSUMER_OFFSETS_TOPIC}': {e}");
                    return;
                },
            };
            info!("Tailing {} partitions of '{CONSUMER_OFFSETS_TOPIC}'", partitions.len());

            let mut workers = JoinSet::new();
            for partition in partitions {
                match client.open_tail(CONSUMER_OFFSETS_TOPIC, partition).await {
                    Ok(tail) => {
                        workers.spawn(tail_partition(
                            partition,
                            tail,
                            register.clone(),
                            metric_records.clone(),
                            shutdown_token.clone(),
                        ));
                    },
                    Err(e) => {
                        error!("Failed to tail partition {partition} of '{CONSUMER_OFFSETS_TOPIC}': {e}");
                    },
                }
            }

            while let Some(res) = workers.join_next().await {
                if let Err(e) = res {
                    error!("Tail task of '{CONSUMER_OFFSETS_TOPIC}' failed: {e}");
                }
            }
            info!("Stopped tailing '{CONSUMER_OFFSETS_TOPIC}'");
        })
    }
}

async fn tail_partition(
    partition: i32,
    mut tail: Box<dyn PartitionTail>,
    register: Arc<ConsumerOffsetsRegister>,
    metric_records: IntCounterVec,
    shutdown_token: CancellationToken,
) {
    debug!("Begin tailing '{CONSUMER_OFFSETS_TOPIC}:{partition}'");

    loop {
        let next = tokio::select! {
            next = tail.next_record() => next,
            _ = shutdown_token.cancelled() => {
                debug!("Shutting down tail of '{CONSUMER_OFFSETS_TOPIC}:{partition}'");
                break;
            },
        };

        match next {
            Some(Ok(record)) => {
                let outcome = ingest_record(partition, &record, &register).await;
                metric_records.with_label_values(&[outcome]).inc();
            },
            Some(Err(e)) => {
                error!("{e}");
            },
            None => {
                warn!("Tail of '{CONSUMER_OFFSETS_TOPIC}:{partition}' terminated");
                break;
            },
        }
    }
}

/// Decode a single record and, if it's an offset commit, upsert it.
///
/// Returns the outcome, as used to label the records metric.
async fn ingest_record(partition: i32, record: &RawRecord, register: &ConsumerOffsetsRegister) -> &'static str {
    match decode_commit(record.key.as_deref(), record.value.as_deref()) {
        Ok(po) => {
            trace!(
                "Group '{}' committed offset {} for '{}:{}' (at {})",
                po.group,
                po.offset,
                po.topic,
                po.partition,
                po.timestamp
            );
            register.upsert(po.group, po.topic, po.partition, po.offset).await;
            OUTCOME_UPSERTED
        },
        Err(DecodeError::UnsupportedKeyVersion(v)) => {
            trace!("Skipping record with key version {v} from partition {partition}: not an offset commit");
            OUTCOME_SKIPPED
        },
        Err(DecodeError::MissingValue) => {
            debug!("Skipping tombstone record from partition {partition}");
            OUTCOME_SKIPPED
        },
        Err(e) => {
            warn!("Dropping undecodable record from partition {partition}: {e}");
            OUTCOME_FAILED
        },
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use prometheus::Registry;
    use tokio::time::Duration;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::kafka_client::mock::MockKafkaClient;
    use crate::kafka_client::KafkaClientError;
    use crate::kafka_types::TopicPartition;
    use crate::offset_codec::fixtures::{encode_commit_key, encode_commit_value, encode_group_metadata_key};
    use crate::test_utils::block_on;

    fn commit_record(group: &str, topic: &str, partition: i32, offset: i64) -> RawRecord {
        RawRecord {
            key: Some(encode_commit_key(1, group, topic, partition)),
            value: Some(encode_commit_value(1, offset, "", 1_700_000_000_000)),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_mirror_commits_from_every_partition() {
        let client = Arc::new(MockKafkaClient::new(vec![0, 1]));
        let tail_0 = client.tail_sender(0);
        let tail_1 = client.tail_sender(1);
        let register = Arc::new(ConsumerOffsetsRegister::new());

        let ingestor = ConsumerOffsetsIngestor::new(client, register.clone(), Arc::new(Registry::new()));
        let join = ingestor.spawn(CancellationToken::new());

        tail_0.send(Ok(commit_record("g1", "orders", 0, 10))).unwrap();
        tail_1.send(Ok(commit_record("g2", "payments", 3, 7))).unwrap();
        tail_0.send(Ok(commit_record("g1", "orders", 0, 12))).unwrap();

        block_on(|| async { register.lookup("g1", "orders", 0).await == Some(12) }, Duration::from_secs(5)).await;
        block_on(|| async { register.lookup("g2", "payments", 3).await == Some(7) }, Duration::from_secs(5)).await;

        // Ending all tails concludes the ingestor
        drop(tail_0);
        drop(tail_1);
        tokio::time::timeout(Duration::from_secs(5), join).await.unwrap().unwrap();

        assert_eq!(ingestor.metric_records.with_label_values(&[OUTCOME_UPSERTED]).get(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_keep_ingesting_past_bad_records_and_stream_errors() {
        let client = Arc::new(MockKafkaClient::new(vec![0]));
        let tail = client.tail_sender(0);
        let register = Arc::new(ConsumerOffsetsRegister::new());

        let ingestor = ConsumerOffsetsIngestor::new(client, register.clone(), Arc::new(Registry::new()));
        let join = ingestor.spawn(CancellationToken::new());

        // Group Metadata: skipped
        tail.send(Ok(RawRecord {
            key: Some(encode_group_metadata_key("g1")),
            value: Some(vec![0x00, 0x03]),
        }))
        .unwrap();
        // Truncated key: failed
        tail.send(Ok(RawRecord {
            key: Some(vec![0x00, 0x01, 0x00]),
            value: Some(encode_commit_value(1, 1, "", 1)),
        }))
        .unwrap();
        // Tombstone: skipped
        tail.send(Ok(RawRecord {
            key: Some(encode_commit_key(1, "g1", "orders", 0)),
            value: None,
        }))
        .unwrap();
        // Stream error: logged, tail goes on
        tail.send(Err(KafkaClientError::Stream {
            topic_partition: TopicPartition::new(CONSUMER_OFFSETS_TOPIC, 0),
            reason: "broker transport failure".to_string(),
        }))
        .unwrap();
        tail.send(Ok(commit_record("g1", "orders", 0, 50))).unwrap();

        block_on(|| async { register.lookup("g1", "orders", 0).await == Some(50) }, Duration::from_secs(5)).await;
        drop(tail);
        tokio::time::timeout(Duration::from_secs(5), join).await.unwrap().unwrap();

        assert_eq!(register.len().await, 1);
        assert_eq!(ingestor.metric_records.with_label_values(&[OUTCOME_UPSERTED]).get(), 1);
        assert_eq!(ingestor.metric_records.with_label_values(&[OUTCOME_SKIPPED]).get(), 2);
        assert_eq!(ingestor.metric_records.with_label_values(&[OUTCOME_FAILED]).get(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_tail_remaining_partitions_when_one_fails_to_open() {
        // No tail is prepared for partition 1: opening it fails
        let client = Arc::new(MockKafkaClient::new(vec![0, 1]));
        let tail_0 = client.tail_sender(0);
        let register = Arc::new(ConsumerOffsetsRegister::new());

        let ingestor = ConsumerOffsetsIngestor::new(client, register.clone(), Arc::new(Registry::new()));
        let _join = ingestor.spawn(CancellationToken::new());

        tail_0.send(Ok(commit_record("g1", "orders", 1, 5))).unwrap();
        block_on(|| async { register.lookup("g1", "orders", 1).await == Some(5) }, Duration::from_secs(5)).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_stop_on_shutdown() {
        let client = Arc::new(MockKafkaClient::new(vec![0]));
        let _tail = client.tail_sender(0);
        let shutdown_token = CancellationToken::new();

        let ingestor =
            ConsumerOffsetsIngestor::new(client, Arc::new(ConsumerOffsetsRegister::new()), Arc::new(Registry::new()));
        let join = ingestor.spawn(shutdown_token.clone());

        shutdown_token.cancel();
        tokio::time::timeout(Duration::from_secs(5), join).await.unwrap().unwrap();
    }
}
