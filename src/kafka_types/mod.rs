mod broker;
mod partition_offset;
mod topic_partition;

pub use broker::BrokerId;
pub use partition_offset::PartitionOffset;
pub use topic_partition::TopicPartition;
