use thiserror::Error;

use crate::kafka_client::KafkaClientError;
use crate::metrics_sink::SinkError;

/// Failures that prevent a [`super::Monitor`] from being constructed.
///
/// These are the only fatal errors: once running, every failure is contained and logged.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Unable to connect to Kafka: {0}")]
    Connection(#[from] KafkaClientError),

    #[error("Unable to set up metrics sink: {0}")]
    Sink(#[from] SinkError),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
