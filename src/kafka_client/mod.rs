//! What the lag computation needs from a Kafka client, and the `rdkafka` based implementation.

mod errors;
#[cfg(test)]
pub(crate) mod mock;
mod rdkafka_client;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::kafka_types::{BrokerId, TopicPartition};

pub use errors::{KafkaClientError, KafkaClientResult};
pub use rdkafka_client::RdKafkaClient;

/// A raw record, as read from a partition: key and value are still binary encoded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRecord {
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
}

/// Latest offset of a partition, as reported by its leader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetBlock {
    /// Latest (produced) offset
    pub offset: i64,
    /// Milliseconds since epoch of when the offset was read
    pub timestamp: i64,
    /// Set when the leader could not provide an offset for this specific partition
    pub error: Option<String>,
}

/// Response of a leader to a batched latest offset request: `topic -> partition -> block`.
pub type LatestOffsets = HashMap<String, HashMap<i32, OffsetBlock>>;

/// Lazy, endless sequence of [`RawRecord`] from a single topic partition.
///
/// Errors are reported in-line, and don't end the sequence: only `None` does.
#[async_trait]
pub trait PartitionTail: Send {
    async fn next_record(&mut self) -> Option<KafkaClientResult<RawRecord>>;
}

/// Capabilities of a Kafka client that the lag computation relies upon.
#[async_trait]
pub trait KafkaClient: Send + Sync + 'static {
    /// Identifiers of the partitions of `topic`.
    async fn list_partitions(&self, topic: &str) -> KafkaClientResult<Vec<i32>>;

    /// Start tailing a partition from its newest offset: history is not replayed.
    async fn open_tail(&self, topic: &str, partition: i32) -> KafkaClientResult<Box<dyn PartitionTail>>;

    /// Broker currently leading the given partition.
    async fn resolve_leader(&self, topic: &str, partition: i32) -> KafkaClientResult<BrokerId>;

    /// Broker currently leading each of the given `partitions` of `topic`, looked up all at once.
    ///
    /// Every partition gets its own result, in the same order as `partitions`:
    /// failing to resolve one doesn't affect the others.
    async fn resolve_leaders(&self, topic: &str, partitions: &[i32]) -> Vec<(i32, KafkaClientResult<BrokerId>)>;

    /// Ask `leader`, in a single request, for the latest offset of every partition in `batch`.
    async fn fetch_latest_offsets(
        &self,
        leader: BrokerId,
        batch: Vec<TopicPartition>,
    ) -> KafkaClientResult<LatestOffsets>;
}
