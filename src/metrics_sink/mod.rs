//! Where lag gauges go: a StatsD server, via the `cadence` crate.

#[cfg(test)]
pub(crate) mod mock;
mod statsd;

use thiserror::Error;

pub use statsd::StatsdSink;

/// Possible errors of a [`GaugeSink`].
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum SinkError {
    /// The sink could not be set up: fatal at startup.
    #[error("Failed to set up metrics sink towards '{addr}': {reason}")]
    Connection {
        addr: String,
        reason: String,
    },

    /// A single gauge could not be emitted: the data point is lost.
    #[error("Failed to emit gauge '{stat}': {reason}")]
    Emit {
        stat: String,
        reason: String,
    },
}

pub type SinkResult<T> = Result<T, SinkError>;

/// Destination of gauge data points.
///
/// Implementations must be safe to call from many tasks at once, and must not block:
/// the caller is the tick loop.
pub trait GaugeSink: Send + Sync + 'static {
    fn emit_gauge(&self, stat: &str, value: i64) -> SinkResult<()>;
}
