/// Offset information for a Topic Partition.
///
/// Produced either by decoding a record of `__consumer_offsets` (and then `group` is set),
/// or by asking a Broker for the latest offset of a partition (and then `group` is empty).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct PartitionOffset {
    /// Topic of the Partition
    pub topic: String,
    /// Partition
    pub partition: i32,
    /// Committed offset (for a Consumer Group) or latest produced offset (for a Broker)
    pub offset: i64,
    /// Milliseconds since epoch: commit time, or time the Broker was asked
    pub timestamp: i64,
    /// Consumer Group that committed the offset; empty when not applicable
    pub group: String,
}
