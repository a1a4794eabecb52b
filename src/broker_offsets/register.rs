use std::collections::HashMap;

use tokio::sync::RwLock;

/// Latest offset of a Topic Partition, as last read from its leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BrokerOffset {
    /// Latest produced offset
    pub offset: i64,
    /// Milliseconds since epoch of when `offset` was read
    pub timestamp: i64,
}

/// Registers and exposes the latest produced offset of every polled `(topic, partition)`.
///
/// It exposes the accessor methods via an async interface,
/// while dealing internally with concurrency and synchronization:
/// the lock is held only for the duration of each call.
#[derive(Debug, Default)]
pub struct BrokerOffsetsRegister {
    offsets_by_topic: RwLock<HashMap<String, HashMap<i32, BrokerOffset>>>,
}

impl BrokerOffsetsRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the latest known offset of `topic:partition`.
    pub async fn upsert(&self, topic: String, partition: i32, offset: i64, timestamp: i64) {
        self.offsets_by_topic.write().await.entry(topic).or_default().insert(
            partition,
            BrokerOffset {
                offset,
                timestamp,
            },
        );
    }

    /// Latest known offset of `topic:partition`, if it was ever polled successfully.
    pub async fn lookup(&self, topic: &str, partition: i32) -> Option<i64> {
        self.get(topic, partition).await.map(|bo| bo.offset)
    }

    /// Like [`Self::lookup`], but includes when the offset was read.
    pub async fn get(&self, topic: &str, partition: i32) -> Option<BrokerOffset> {
        self.offsets_by_topic.read().await.get(topic)?.get(&partition).copied()
    }

    /// Count of `(topic, partition)` entries.
    pub async fn len(&self) -> usize {
        self.offsets_by_topic.read().await.values().map(HashMap::len).sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn should_replace_on_upsert() {
        let reg = BrokerOffsetsRegister::new();
        assert_eq!(reg.lookup("t", 0).await, None);

        reg.upsert("t".into(), 0, 100, 1).await;
        reg.upsert("t".into(), 1, 5, 1).await;
        reg.upsert("t".into(), 0, 110, 2).await;

        assert_eq!(reg.lookup("t", 0).await, Some(110));
        assert_eq!(
            reg.get("t", 0).await,
            Some(BrokerOffset {
                offset: 110,
                timestamp: 2
            })
        );
        assert_eq!(reg.lookup("t", 1).await, Some(5));
        assert_eq!(reg.lookup("other", 0).await, None);
        assert_eq!(reg.len().await, 2);
    }
}
