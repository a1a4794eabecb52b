use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::errors::{KafkaClientError, KafkaClientResult};
use super::{KafkaClient, LatestOffsets, OffsetBlock, PartitionTail, RawRecord};
use crate::kafka_types::{BrokerId, TopicPartition};

pub(crate) type TailSender = mpsc::UnboundedSender<KafkaClientResult<RawRecord>>;

/// In-memory [`KafkaClient`]: tests decide partitions, leaders, offsets and failures.
#[derive(Default)]
pub(crate) struct MockKafkaClient {
    partitions: Vec<i32>,
    tails: Mutex<HashMap<i32, mpsc::UnboundedReceiver<KafkaClientResult<RawRecord>>>>,
    leaders: Mutex<HashMap<TopicPartition, BrokerId>>,
    latest_offsets: Mutex<HashMap<TopicPartition, i64>>,
    failing_leaders: Mutex<HashSet<BrokerId>>,
    failing_items: Mutex<HashSet<TopicPartition>>,
    leader_lookups: Mutex<Vec<(String, Vec<i32>)>>,
    fetch_calls: Mutex<Vec<(BrokerId, Vec<TopicPartition>)>>,
}

impl MockKafkaClient {
    pub(crate) fn new(partitions: Vec<i32>) -> Self {
        Self {
            partitions,
            ..Default::default()
        }
    }

    /// Sender feeding the tail of `partition`: dropping it ends the tail.
    pub(crate) fn tail_sender(&self, partition: i32) -> TailSender {
        let (sx, rx) = mpsc::unbounded_channel();
        self.tails.lock().unwrap().insert(partition, rx);
        sx
    }

    pub(crate) fn set_leader(&self, topic: &str, partition: i32, leader: BrokerId) {
        self.leaders.lock().unwrap().insert(TopicPartition::new(topic, partition), leader);
    }

    pub(crate) fn set_latest_offset(&self, topic: &str, partition: i32, offset: i64) {
        self.latest_offsets.lock().unwrap().insert(TopicPartition::new(topic, partition), offset);
    }

    pub(crate) fn fail_leader(&self, leader: BrokerId) {
        self.failing_leaders.lock().unwrap().insert(leader);
    }

    pub(crate) fn fail_item(&self, topic: &str, partition: i32) {
        self.failing_items.lock().unwrap().insert(TopicPartition::new(topic, partition));
    }

    /// Every call to [`KafkaClient::resolve_leaders`], sorted.
    pub(crate) fn leader_lookups(&self) -> Vec<(String, Vec<i32>)> {
        let mut lookups = self.leader_lookups.lock().unwrap().clone();
        lookups.sort();
        lookups
    }

    /// Every call to [`KafkaClient::fetch_latest_offsets`], with its batch sorted.
    pub(crate) fn fetch_calls(&self) -> Vec<(BrokerId, Vec<TopicPartition>)> {
        let mut calls = self.fetch_calls.lock().unwrap().clone();
        for (_, batch) in calls.iter_mut() {
            batch.sort();
        }
        calls.sort();
        calls
    }
}

struct MockTail {
    rx: mpsc::UnboundedReceiver<KafkaClientResult<RawRecord>>,
}

#[async_trait]
impl PartitionTail for MockTail {
    async fn next_record(&mut self) -> Option<KafkaClientResult<RawRecord>> {
        self.rx.recv().await
    }
}

#[async_trait]
impl KafkaClient for MockKafkaClient {
    async fn list_partitions(&self, _topic: &str) -> KafkaClientResult<Vec<i32>> {
        Ok(self.partitions.clone())
    }

    async fn open_tail(&self, topic: &str, partition: i32) -> KafkaClientResult<Box<dyn PartitionTail>> {
        match self.tails.lock().unwrap().remove(&partition) {
            Some(rx) => Ok(Box::new(MockTail {
                rx,
            })),
            None => Err(KafkaClientError::Stream {
                topic_partition: TopicPartition::new(topic, partition),
                reason: "no tail prepared".to_string(),
            }),
        }
    }

    async fn resolve_leader(&self, topic: &str, partition: i32) -> KafkaClientResult<BrokerId> {
        let tp = TopicPartition::new(topic, partition);
        self.leaders.lock().unwrap().get(&tp).copied().ok_or(KafkaClientError::LeaderResolution {
            topic_partition: tp,
            reason: "unknown leader".to_string(),
        })
    }

    async fn resolve_leaders(&self, topic: &str, partitions: &[i32]) -> Vec<(i32, KafkaClientResult<BrokerId>)> {
        self.leader_lookups.lock().unwrap().push((topic.to_string(), partitions.to_vec()));

        let mut resolved = Vec::with_capacity(partitions.len());
        for p in partitions {
            resolved.push((*p, self.resolve_leader(topic, *p).await));
        }
        resolved
    }

    async fn fetch_latest_offsets(
        &self,
        leader: BrokerId,
        batch: Vec<TopicPartition>,
    ) -> KafkaClientResult<LatestOffsets> {
        self.fetch_calls.lock().unwrap().push((leader, batch.clone()));

        if self.failing_leaders.lock().unwrap().contains(&leader) {
            return Err(KafkaClientError::Request {
                leader,
                reason: "leader unavailable".to_string(),
            });
        }

        let offsets = self.latest_offsets.lock().unwrap();
        let failing_items = self.failing_items.lock().unwrap();
        let mut latest = LatestOffsets::new();
        for tp in batch {
            let block = match (failing_items.contains(&tp), offsets.get(&tp)) {
                (false, Some(offset)) => OffsetBlock {
                    offset: *offset,
                    timestamp: 1_000,
                    error: None,
                },
                _ => OffsetBlock {
                    offset: -1,
                    timestamp: 1_000,
                    error: Some("not leader for partition".to_string()),
                },
            };
            latest.entry(tp.topic).or_default().insert(tp.partition, block);
        }

        Ok(latest)
    }
}
