use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rdkafka::{
    consumer::{BaseConsumer, Consumer, StreamConsumer},
    ClientConfig, Message, Offset, TopicPartitionList,
};
use tokio::task::spawn_blocking;

use super::errors::{KafkaClientError, KafkaClientResult};
use super::{KafkaClient, LatestOffsets, OffsetBlock, PartitionTail, RawRecord};
use crate::constants::{CONSUMER_OFFSETS_READER_GROUP, CONSUMER_OFFSETS_TOPIC};
use crate::kafka_types::{BrokerId, TopicPartition};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Partition, as described by the cluster metadata.
struct PartitionMeta {
    id: i32,
    leader: i32,
    error: Option<String>,
}

/// [`KafkaClient`] backed by `rdkafka` (i.e. librdkafka).
///
/// A single [`BaseConsumer`] serves metadata and offsets requests;
/// every partition tail gets its own [`StreamConsumer`].
pub struct RdKafkaClient {
    client_config: ClientConfig,
    consumer: Arc<BaseConsumer>,
}

impl RdKafkaClient {
    /// Create a new [`RdKafkaClient`], and check that the cluster is reachable.
    ///
    /// # Arguments
    ///
    /// * `client_config` - Kafka client configuration, used for every client this creates
    pub async fn connect(client_config: ClientConfig) -> KafkaClientResult<Self> {
        let consumer: BaseConsumer = Self::set_kafka_config(client_config.clone())
            .create()
            .map_err(|e| KafkaClientError::Connection(e.to_string()))?;

        let client = Self {
            client_config,
            consumer: Arc::new(consumer),
        };

        // Creating a client doesn't connect: fetching metadata does
        let partitions = client
            .fetch_partitions_meta(CONSUMER_OFFSETS_TOPIC)
            .await
            .map_err(|e| KafkaClientError::Connection(e.to_string()))?;
        info!("Connected to Kafka cluster: '{}' has {} partitions", CONSUMER_OFFSETS_TOPIC, partitions.len());

        Ok(client)
    }

    fn set_kafka_config(mut client_config: ClientConfig) -> ClientConfig {
        client_config.set("enable.auto.commit", "false");
        client_config.set("enable.partition.eof", "false");
        if client_config.get("group.id").is_none() {
            client_config.set("group.id", CONSUMER_OFFSETS_READER_GROUP);
        }

        client_config
    }

    async fn fetch_partitions_meta(&self, topic: &str) -> KafkaClientResult<Vec<PartitionMeta>> {
        let consumer = self.consumer.clone();
        let t = topic.to_string();

        let res = spawn_blocking(move || -> Result<Vec<PartitionMeta>, String> {
            let metadata = consumer.fetch_metadata(Some(&t), FETCH_TIMEOUT).map_err(|e| e.to_string())?;
            let mt = metadata
                .topics()
                .iter()
                .find(|mt| mt.name() == t)
                .ok_or_else(|| "topic not found in metadata".to_string())?;

            if let Some(e) = mt.error() {
                return Err(format!("{e:?}"));
            }

            Ok(mt
                .partitions()
                .iter()
                .map(|mp| PartitionMeta {
                    id: mp.id(),
                    leader: mp.leader(),
                    error: mp.error().map(|e| format!("{e:?}")),
                })
                .collect())
        })
        .await;

        match res {
            Ok(Ok(partitions)) => Ok(partitions),
            Ok(Err(reason)) => Err(KafkaClientError::Metadata {
                topic: topic.to_string(),
                reason,
            }),
            Err(e) => Err(KafkaClientError::Metadata {
                topic: topic.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl KafkaClient for RdKafkaClient {
    async fn list_partitions(&self, topic: &str) -> KafkaClientResult<Vec<i32>> {
        Ok(self.fetch_partitions_meta(topic).await?.into_iter().map(|p| p.id).collect())
    }

    async fn open_tail(&self, topic: &str, partition: i32) -> KafkaClientResult<Box<dyn PartitionTail>> {
        let topic_partition = TopicPartition::new(topic, partition);
        let stream_err = |reason: String| KafkaClientError::Stream {
            topic_partition: topic_partition.clone(),
            reason,
        };

        let consumer: StreamConsumer =
            Self::set_kafka_config(self.client_config.clone()).create().map_err(|e| stream_err(e.to_string()))?;

        let mut tpl = TopicPartitionList::with_capacity(1);
        tpl.add_partition_offset(topic, partition, Offset::End).map_err(|e| stream_err(e.to_string()))?;
        consumer.assign(&tpl).map_err(|e| stream_err(e.to_string()))?;

        debug!("Tailing '{topic_partition}' from its newest offset");
        Ok(Box::new(RdKafkaPartitionTail {
            topic_partition,
            consumer,
        }))
    }

    async fn resolve_leader(&self, topic: &str, partition: i32) -> KafkaClientResult<BrokerId> {
        let mut resolved = self.resolve_leaders(topic, &[partition]).await;
        match resolved.pop() {
            Some((_, res)) => res,
            None => Err(KafkaClientError::LeaderResolution {
                topic_partition: TopicPartition::new(topic, partition),
                reason: "partition not resolved".to_string(),
            }),
        }
    }

    async fn resolve_leaders(&self, topic: &str, partitions: &[i32]) -> Vec<(i32, KafkaClientResult<BrokerId>)> {
        // A single metadata request serves every partition of the topic
        match self.fetch_partitions_meta(topic).await {
            Ok(partitions_meta) => {
                partitions.iter().map(|p| (*p, leader_of(topic, *p, &partitions_meta))).collect()
            },
            Err(e) => partitions
                .iter()
                .map(|p| {
                    let err = KafkaClientError::LeaderResolution {
                        topic_partition: TopicPartition::new(topic, *p),
                        reason: e.to_string(),
                    };
                    (*p, Err(err))
                })
                .collect(),
        }
    }

    async fn fetch_latest_offsets(
        &self,
        leader: BrokerId,
        batch: Vec<TopicPartition>,
    ) -> KafkaClientResult<LatestOffsets> {
        let consumer = self.consumer.clone();

        // librdkafka routes a "list offsets" request to the partitions leader on its own:
        // asking for the offsets "at time" `Offset::End` returns the latest offsets.
        let res = spawn_blocking(move || -> Result<Vec<(String, i32, Result<i64, String>)>, String> {
            let mut tpl = TopicPartitionList::with_capacity(batch.len());
            for tp in batch.iter() {
                tpl.add_partition_offset(&tp.topic, tp.partition, Offset::End).map_err(|e| e.to_string())?;
            }

            let res_tpl = consumer.offsets_for_times(tpl, FETCH_TIMEOUT).map_err(|e| e.to_string())?;

            Ok(res_tpl
                .elements()
                .iter()
                .map(|elem| {
                    let res_offset = match (elem.error(), elem.offset()) {
                        (Err(e), _) => Err(e.to_string()),
                        (Ok(()), Offset::Offset(o)) => Ok(o),
                        (Ok(()), o) => Err(format!("no offset available ({o:?})")),
                    };
                    (elem.topic().to_string(), elem.partition(), res_offset)
                })
                .collect())
        })
        .await;

        let blocks = match res {
            Ok(Ok(blocks)) => blocks,
            Ok(Err(reason)) => {
                return Err(KafkaClientError::Request {
                    leader,
                    reason,
                })
            },
            Err(e) => {
                return Err(KafkaClientError::Request {
                    leader,
                    reason: e.to_string(),
                })
            },
        };

        let read_timestamp = Utc::now().timestamp_millis();
        let mut latest = LatestOffsets::new();
        for (topic, partition, res_offset) in blocks {
            let block = match res_offset {
                Ok(offset) => OffsetBlock {
                    offset,
                    timestamp: read_timestamp,
                    error: None,
                },
                Err(e) => OffsetBlock {
                    offset: -1,
                    timestamp: read_timestamp,
                    error: Some(e),
                },
            };
            latest.entry(topic).or_default().insert(partition, block);
        }

        Ok(latest)
    }
}

/// Leader of `partition`, as found in the metadata of its topic.
fn leader_of(topic: &str, partition: i32, partitions_meta: &[PartitionMeta]) -> KafkaClientResult<BrokerId> {
    let resolution_err = |reason: String| KafkaClientError::LeaderResolution {
        topic_partition: TopicPartition::new(topic, partition),
        reason,
    };

    let pm = partitions_meta
        .iter()
        .find(|pm| pm.id == partition)
        .ok_or_else(|| resolution_err("partition not found in metadata".to_string()))?;

    match (&pm.error, pm.leader) {
        (Some(e), _) => Err(resolution_err(e.clone())),
        (None, leader) if leader < 0 => Err(resolution_err("partition has no leader".to_string())),
        (None, leader) => Ok(BrokerId(leader)),
    }
}

/// [`PartitionTail`] over a [`StreamConsumer`] assigned to a single partition.
struct RdKafkaPartitionTail {
    topic_partition: TopicPartition,
    consumer: StreamConsumer,
}

#[async_trait]
impl PartitionTail for RdKafkaPartitionTail {
    async fn next_record(&mut self) -> Option<KafkaClientResult<RawRecord>> {
        // `StreamConsumer::recv` never ends: this tail is endless too
        match self.consumer.recv().await {
            Ok(m) => Some(Ok(RawRecord {
                key: m.key().map(<[u8]>::to_vec),
                value: m.payload().map(<[u8]>::to_vec),
            })),
            Err(e) => Some(Err(KafkaClientError::Stream {
                topic_partition: self.topic_partition.clone(),
                reason: e.to_string(),
            })),
        }
    }
}
