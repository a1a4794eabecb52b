use std::sync::Mutex;

use super::{GaugeSink, SinkError, SinkResult};

/// [`GaugeSink`] that keeps every gauge in memory, in emission order.
#[derive(Default)]
pub(crate) struct RecordingSink {
    gauges: Mutex<Vec<(String, i64)>>,
    failing: bool,
}

impl RecordingSink {
    /// A sink that refuses every gauge.
    pub(crate) fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub(crate) fn gauges(&self) -> Vec<(String, i64)> {
        self.gauges.lock().unwrap().clone()
    }
}

impl GaugeSink for RecordingSink {
    fn emit_gauge(&self, stat: &str, value: i64) -> SinkResult<()> {
        if self.failing {
            return Err(SinkError::Emit {
                stat: stat.to_string(),
                reason: "sink unavailable".to_string(),
            });
        }

        self.gauges.lock().unwrap().push((stat.to_string(), value));
        Ok(())
    }
}
