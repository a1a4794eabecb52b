use thiserror::Error;

use crate::kafka_types::{BrokerId, TopicPartition};

/// Possible errors when talking to the Kafka cluster.
///
/// Apart from [`KafkaClientError::Connection`] at startup, these are never fatal:
/// they are contained to the record, partition or leader they occurred for.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum KafkaClientError {
    /// The cluster could not be reached (or the client could not be created).
    #[error("Failed to connect to Kafka cluster: {0}")]
    Connection(String),

    /// Metadata about a topic could not be fetched.
    #[error("Failed to fetch metadata of topic '{topic}': {reason}")]
    Metadata {
        topic: String,
        reason: String,
    },

    /// The leader of a topic partition could not be determined.
    #[error("Failed to resolve leader of '{topic_partition}': {reason}")]
    LeaderResolution {
        topic_partition: TopicPartition,
        reason: String,
    },

    /// A request sent to a specific leader failed as a whole.
    #[error("Request to {leader} failed: {reason}")]
    Request {
        leader: BrokerId,
        reason: String,
    },

    /// A tail stream of a partition reported an error.
    #[error("Tail of '{topic_partition}' failed: {reason}")]
    Stream {
        topic_partition: TopicPartition,
        reason: String,
    },
}

pub type KafkaClientResult<T> = Result<T, KafkaClientError>;
