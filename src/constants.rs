/// Kafka internal topic that keeps track of Consumer's committed Offsets.
/// This is consumed inside the `consumer_offsets` module.
pub(crate) const CONSUMER_OFFSETS_TOPIC: &str = "__consumer_offsets";

/// This is the Consumer Group (`group.id`) value used by
/// the Consumers tailing [`CONSUMER_OFFSETS_TOPIC`] partitions.
///
/// Offsets are never committed for it: it's only set because librdkafka expects one.
pub(crate) const CONSUMER_OFFSETS_READER_GROUP: &str = "__kqm__consumer_offsets_reader";

pub(crate) const DEFAULT_STATSD_ADDR: &str = "127.0.0.1:8125";
pub(crate) const DEFAULT_STATSD_PREFIX: &str = "kqm";
pub(crate) const DEFAULT_READ_INTERVAL_SECS: &str = "60";
pub(crate) const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
pub(crate) const DEFAULT_HTTP_PORT: &str = "6565";
