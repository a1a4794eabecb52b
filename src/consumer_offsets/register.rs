use std::collections::{BTreeSet, HashMap};

use tokio::sync::RwLock;

use crate::kafka_types::TopicPartition;

/// `partition -> offset`
type PartitionOffsets = HashMap<i32, i64>;

/// `topic -> partition -> offset`
type TopicOffsets = HashMap<String, PartitionOffsets>;

/// Last offset committed by a Consumer Group, for a specific Topic Partition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupOffset {
    pub group: String,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// Registers and exposes the last committed offset of every `(group, topic, partition)`.
///
/// It exposes the accessor methods via an async interface,
/// while dealing internally with concurrency and synchronization:
/// the lock is held only for the duration of each call.
#[derive(Debug, Default)]
pub struct ConsumerOffsetsRegister {
    offsets_by_group: RwLock<HashMap<String, TopicOffsets>>,
}

impl ConsumerOffsetsRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `offset` as the last committed by `group` for `topic:partition`.
    ///
    /// Overwrites unconditionally: the latest call wins.
    pub async fn upsert(&self, group: String, topic: String, partition: i32, offset: i64) {
        self.offsets_by_group
            .write()
            .await
            .entry(group)
            .or_default()
            .entry(topic)
            .or_default()
            .insert(partition, offset);
    }

    /// Last committed offset of `group` for `topic:partition`, if any is known.
    pub async fn lookup(&self, group: &str, topic: &str, partition: i32) -> Option<i64> {
        self.offsets_by_group.read().await.get(group)?.get(topic)?.get(&partition).copied()
    }

    /// Every [`TopicPartition`] that at least one Consumer Group has committed an offset for.
    pub async fn snapshot_topic_partitions(&self) -> BTreeSet<TopicPartition> {
        self.offsets_by_group
            .read()
            .await
            .values()
            .flat_map(|topics| {
                topics.iter().flat_map(|(t, partitions)| {
                    partitions.keys().map(move |p| TopicPartition::new(t.as_str(), *p))
                })
            })
            .collect()
    }

    /// Copy of the whole register, as a sorted [`Vec`] of [`GroupOffset`].
    pub async fn snapshot(&self) -> Vec<GroupOffset> {
        let mut res: Vec<GroupOffset> = {
            let r_guard = self.offsets_by_group.read().await;
            r_guard
                .iter()
                .flat_map(|(g, topics)| {
                    topics.iter().flat_map(move |(t, partitions)| {
                        partitions.iter().map(move |(p, o)| GroupOffset {
                            group: g.clone(),
                            topic: t.clone(),
                            partition: *p,
                            offset: *o,
                        })
                    })
                })
                .collect()
        };

        res.sort();
        res
    }

    /// Count of `(group, topic, partition)` entries.
    pub async fn len(&self) -> usize {
        self.offsets_by_group.read().await.values().flat_map(|topics| topics.values()).map(HashMap::len).sum()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn should_overwrite_on_upsert() {
        let reg = ConsumerOffsetsRegister::new();
        assert_eq!(reg.lookup("g", "t", 0).await, None);

        reg.upsert("g".into(), "t".into(), 0, 100).await;
        assert_eq!(reg.lookup("g", "t", 0).await, Some(100));

        // Going backwards is allowed too: the latest commit wins
        reg.upsert("g".into(), "t".into(), 0, 42).await;
        assert_eq!(reg.lookup("g", "t", 0).await, Some(42));
        assert_eq!(reg.len().await, 1);
    }

    #[tokio::test]
    async fn should_snapshot_topic_partitions_across_groups() {
        let reg = ConsumerOffsetsRegister::new();
        reg.upsert("g1".into(), "t1".into(), 0, 1).await;
        reg.upsert("g1".into(), "t1".into(), 1, 1).await;
        reg.upsert("g2".into(), "t1".into(), 0, 5).await;
        reg.upsert("g2".into(), "t2".into(), 3, 5).await;

        assert_eq!(
            reg.snapshot_topic_partitions().await.into_iter().collect::<Vec<_>>(),
            vec![TopicPartition::new("t1", 0), TopicPartition::new("t1", 1), TopicPartition::new("t2", 3)]
        );
        assert_eq!(reg.len().await, 4);
    }

    #[tokio::test]
    async fn should_snapshot_sorted_group_offsets() {
        let reg = ConsumerOffsetsRegister::new();
        reg.upsert("g2".into(), "t".into(), 0, 7).await;
        reg.upsert("g1".into(), "t".into(), 1, 3).await;
        reg.upsert("g1".into(), "t".into(), 0, 2).await;

        let snapshot = reg.snapshot().await;
        assert_eq!(
            snapshot.iter().map(|go| (go.group.as_str(), go.partition, go.offset)).collect::<Vec<_>>(),
            vec![("g1", 0, 2), ("g1", 1, 3), ("g2", 0, 7)]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn should_not_lose_entries_under_concurrent_upserts() {
        const WORKERS: usize = 16;
        const KEYS: usize = 250;

        let reg = Arc::new(ConsumerOffsetsRegister::new());

        let handles = (0..WORKERS)
            .map(|w| {
                let reg = reg.clone();
                tokio::spawn(async move {
                    for k in 0..KEYS {
                        let topic = format!("t{}", k % 5);
                        // Write a stale value first, then the right one
                        reg.upsert(format!("g{w}"), topic.clone(), k as i32, -1).await;
                        reg.upsert(format!("g{w}"), topic, k as i32, (w * KEYS + k) as i64).await;
                    }
                })
            })
            .collect::<Vec<_>>();
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(reg.len().await, WORKERS * KEYS);
        for w in 0..WORKERS {
            for k in 0..KEYS {
                assert_eq!(
                    reg.lookup(&format!("g{w}"), &format!("t{}", k % 5), k as i32).await,
                    Some((w * KEYS + k) as i64)
                );
            }
        }
        assert_eq!(reg.snapshot_topic_partitions().await.len(), KEYS);
    }
}
