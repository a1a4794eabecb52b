use std::net::{ToSocketAddrs, UdpSocket};

use cadence::prelude::*;
use cadence::{QueuingMetricSink, StatsdClient, UdpMetricSink};

use super::{GaugeSink, SinkError, SinkResult};

/// How many data points can wait to be sent, before new ones get dropped.
const QUEUE_CAPACITY: usize = 10_000;

/// Sends gauges to a StatsD server over UDP.
///
/// Gauges are queued and sent by a background thread (see [`QueuingMetricSink`]),
/// so [`GaugeSink::emit_gauge`] never waits on the network.
pub struct StatsdSink {
    client: StatsdClient,
}

impl StatsdSink {
    /// Create a new [`StatsdSink`].
    ///
    /// No prefix is applied here: stat names are expected to be complete.
    ///
    /// # Arguments
    ///
    /// * `addr` - StatsD server address (format: 'HOST:PORT')
    pub fn new(addr: &str) -> SinkResult<Self> {
        let conn_err = |reason: String| SinkError::Connection {
            addr: addr.to_string(),
            reason,
        };

        let target = addr
            .to_socket_addrs()
            .map_err(|e| conn_err(e.to_string()))?
            .next()
            .ok_or_else(|| conn_err("address did not resolve".to_string()))?;

        let bind_addr = if target.is_ipv6() {
            "[::]:0"
        } else {
            "0.0.0.0:0"
        };
        let socket = UdpSocket::bind(bind_addr).map_err(|e| conn_err(e.to_string()))?;
        socket.set_nonblocking(true).map_err(|e| conn_err(e.to_string()))?;

        let udp_sink = UdpMetricSink::from(target, socket).map_err(|e| conn_err(e.to_string()))?;
        let queuing_sink = QueuingMetricSink::with_capacity(udp_sink, QUEUE_CAPACITY);

        let client = StatsdClient::builder("", queuing_sink)
            .with_error_handler(|e| error!("Failed to send gauge to StatsD: {e}"))
            .build();

        info!("Sending gauges to StatsD at '{addr}' ({target})");
        Ok(Self {
            client,
        })
    }
}

impl GaugeSink for StatsdSink {
    fn emit_gauge(&self, stat: &str, value: i64) -> SinkResult<()> {
        // StatsD reads a signed gauge value as a delta: only absolute values are sent
        let value = u64::try_from(value).map_err(|_| SinkError::Emit {
            stat: stat.to_string(),
            reason: format!("negative value {value}"),
        })?;

        self.client.gauge(stat, value).map(|_| ()).map_err(|e| SinkError::Emit {
            stat: stat.to_string(),
            reason: e.to_string(),
        })
    }
}
