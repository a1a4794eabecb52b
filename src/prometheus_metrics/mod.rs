use prometheus::Registry;

pub const NAMESPACE: &str = "kqm";

pub const LABEL_GROUP: &str = "group";
pub const LABEL_TOPIC: &str = "topic";
pub const LABEL_PARTITION: &str = "partition";
pub const LABEL_OUTCOME: &str = "outcome";

/// Registry for the metrics that describe this service itself.
///
/// Lag is not only sent to StatsD: it's also tracked here, so it can be scraped.
pub fn init() -> Registry {
    let registry = Registry::new_custom(Some(NAMESPACE.to_string()), None)
        .unwrap_or_else(|e| panic!("Unable to create a Prometheus Metrics Registry: {e}"));

    debug!("Initialized");
    registry
}
