use std::fmt;

/// Identifier of a Broker in the Kafka cluster.
///
/// This is what Topic Partitions are grouped by, when their latest offset is requested
/// to the Broker that currently leads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BrokerId(pub i32);

impl fmt::Display for BrokerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "broker#{}", self.0)
    }
}
