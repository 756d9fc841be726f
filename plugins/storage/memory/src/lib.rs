use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::RwLock;

use browse_api::{
    ConsumerGroup, LogStore, NewTopic, Offset, PartitionId, PartitionInfo, ProduceRecord, Record,
    RecordStream, SortOrder, StoreError, StoreFuture, now_ms,
};

// ═══════════════════════════════════════════════════════════════
//  MemoryStoreConfig
// ═══════════════════════════════════════════════════════════════

fn default_batch_size() -> usize {
    500
}

fn default_max_records() -> usize {
    100_000
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MemoryStoreConfig {
    /// Records returned per [`RecordStream::next_batch`] call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Retention: oldest records are dropped once a partition holds more.
    #[serde(default = "default_max_records")]
    pub max_records_per_partition: usize,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_records_per_partition: default_max_records(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Partition / topic state
// ═══════════════════════════════════════════════════════════════

/// Ring buffer of one partition. `records[i].offset == earliest + i`.
#[derive(Default)]
struct PartitionLog {
    earliest: Offset,
    records: VecDeque<Record>,
}

impl PartitionLog {
    fn latest(&self) -> Offset {
        self.earliest + self.records.len() as Offset
    }

    fn info(&self, index: PartitionId) -> PartitionInfo {
        PartitionInfo {
            index,
            earliest_offset: self.earliest,
            latest_offset: self.latest(),
        }
    }

    /// Records in `start..end`, clamped to what is retained.
    fn slice(&self, start: Offset, end: Offset) -> Vec<Record> {
        let start = start.max(self.earliest);
        let end = end.min(self.latest());
        if start >= end {
            return Vec::new();
        }
        let from = (start - self.earliest) as usize;
        let to = (end - self.earliest) as usize;
        self.records.range(from..to).cloned().collect()
    }
}

struct TopicLog {
    partitions: Vec<RwLock<PartitionLog>>,
    round_robin: AtomicU32,
    /// group id -> partition -> committed offset
    groups: RwLock<BTreeMap<String, BTreeMap<PartitionId, Offset>>>,
}

impl TopicLog {
    fn new(partitions: u32) -> Self {
        Self {
            partitions: (0..partitions).map(|_| RwLock::new(PartitionLog::default())).collect(),
            round_robin: AtomicU32::new(0),
            groups: RwLock::new(BTreeMap::new()),
        }
    }

    fn partition(&self, topic: &str, index: PartitionId) -> Result<&RwLock<PartitionLog>, StoreError> {
        self.partitions.get(index as usize).ok_or_else(|| {
            StoreError::invalid(format!("topic '{topic}' has no partition {index}"))
        })
    }

    fn pick_partition(&self, key: Option<&[u8]>) -> PartitionId {
        let count = self.partitions.len() as u32;
        match key {
            Some(key) => {
                let mut hasher = DefaultHasher::new();
                key.hash(&mut hasher);
                (hasher.finish() % count as u64) as PartitionId
            }
            None => self.round_robin.fetch_add(1, Ordering::Relaxed) % count,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryLogStore
// ═══════════════════════════════════════════════════════════════

/// In-memory partitioned log. Each partition is a bounded ring buffer;
/// offsets keep growing after old records are evicted.
pub struct MemoryLogStore {
    topics: RwLock<HashMap<String, Arc<TopicLog>>>,
    config: MemoryStoreConfig,
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self::new(MemoryStoreConfig::default())
    }
}

impl MemoryLogStore {
    pub fn new(config: MemoryStoreConfig) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            config: MemoryStoreConfig {
                batch_size: config.batch_size.max(1),
                max_records_per_partition: config.max_records_per_partition.max(1),
            },
        }
    }

    async fn topic(&self, name: &str) -> Result<Arc<TopicLog>, StoreError> {
        self.topics
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::topic_not_found(name))
    }

    async fn do_produce(
        &self,
        topic: &str,
        record: ProduceRecord,
    ) -> Result<(PartitionId, Offset), StoreError> {
        let log = self.topic(topic).await?;
        let partition = match record.partition {
            Some(p) => p,
            None => log.pick_partition(record.key.as_deref()),
        };
        let mut part = log.partition(topic, partition)?.write().await;
        let offset = part.latest();
        part.records.push_back(Record {
            partition,
            offset,
            timestamp_ms: record.timestamp_ms.unwrap_or_else(now_ms),
            key: record.key,
            value: record.value,
            headers: record.headers,
        });
        while part.records.len() > self.config.max_records_per_partition {
            part.records.pop_front();
            part.earliest += 1;
        }
        Ok((partition, offset))
    }

    /// Record `offset` as the next offset `group` consumes from `partition`.
    /// The offset may not run past the partition's latest offset.
    pub async fn commit_offset(
        &self,
        group: &str,
        topic: &str,
        partition: PartitionId,
        offset: Offset,
    ) -> Result<(), StoreError> {
        let log = self.topic(topic).await?;
        let latest = log.partition(topic, partition)?.read().await.latest();
        if offset > latest {
            return Err(StoreError::invalid(format!(
                "offset {offset} is past the end of {topic}/{partition} ({latest})"
            )));
        }
        log.groups
            .write()
            .await
            .entry(group.to_string())
            .or_default()
            .insert(partition, offset);
        tracing::debug!(group, topic = %topic, partition, offset, "committed offset");
        Ok(())
    }
}

impl LogStore for MemoryLogStore {
    fn list_topics(&self) -> StoreFuture<'_, Vec<String>> {
        Box::pin(async move {
            let mut names: Vec<String> = self.topics.read().await.keys().cloned().collect();
            names.sort();
            Ok(names)
        })
    }

    fn list_partitions(&self, topic: &str) -> StoreFuture<'_, Vec<PartitionInfo>> {
        let topic = topic.to_string();
        Box::pin(async move {
            let log = self.topic(&topic).await?;
            let mut infos = Vec::with_capacity(log.partitions.len());
            for (index, part) in log.partitions.iter().enumerate() {
                infos.push(part.read().await.info(index as PartitionId));
            }
            Ok(infos)
        })
    }

    fn read_window(
        &self,
        topic: &str,
        partition: PartitionId,
        start: Offset,
        max_count: usize,
    ) -> StoreFuture<'_, Vec<Record>> {
        let topic = topic.to_string();
        Box::pin(async move {
            let log = self.topic(&topic).await?;
            let part = log.partition(&topic, partition)?.read().await;
            let end = start.saturating_add(max_count as Offset);
            Ok(part.slice(start, end))
        })
    }

    fn stream(
        &self,
        topic: &str,
        partition: PartitionId,
        window: Range<Offset>,
        order: SortOrder,
    ) -> StoreFuture<'_, Box<dyn RecordStream>> {
        let topic = topic.to_string();
        let batch_size = self.config.batch_size as Offset;
        Box::pin(async move {
            let log = self.topic(&topic).await?;
            log.partition(&topic, partition)?;
            let position = match order {
                SortOrder::OldestFirst => window.start,
                SortOrder::NewestFirst => window.end,
            };
            tracing::debug!(topic = %topic, partition, ?window, %order, "opening memory stream");
            Ok(Box::new(MemoryStream {
                log,
                partition,
                window,
                order,
                position,
                batch_size,
            }) as Box<dyn RecordStream>)
        })
    }

    fn offset_for_timestamp(
        &self,
        topic: &str,
        partition: PartitionId,
        timestamp_ms: i64,
    ) -> StoreFuture<'_, Option<Offset>> {
        let topic = topic.to_string();
        Box::pin(async move {
            let log = self.topic(&topic).await?;
            let part = log.partition(&topic, partition)?.read().await;
            Ok(part
                .records
                .iter()
                .find(|r| r.timestamp_ms >= timestamp_ms)
                .map(|r| r.offset))
        })
    }

    fn produce(&self, topic: &str, record: ProduceRecord) -> StoreFuture<'_, (PartitionId, Offset)> {
        let topic = topic.to_string();
        Box::pin(async move { self.do_produce(&topic, record).await })
    }

    fn create_topic(&self, topic: NewTopic) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if topic.partitions == 0 {
                return Err(StoreError::invalid("topic needs at least one partition"));
            }
            let mut topics = self.topics.write().await;
            if topics.contains_key(&topic.name) {
                return Err(StoreError::invalid(format!("topic '{}' already exists", topic.name)));
            }
            tracing::info!(
                topic = %topic.name,
                partitions = topic.partitions,
                replication_factor = topic.replication_factor,
                configs = ?topic.configs,
                "created topic"
            );
            topics.insert(topic.name, Arc::new(TopicLog::new(topic.partitions)));
            Ok(())
        })
    }

    fn list_consumer_groups(&self, topic: &str) -> StoreFuture<'_, Vec<ConsumerGroup>> {
        let topic = topic.to_string();
        Box::pin(async move {
            let log = self.topic(&topic).await?;
            let groups = log.groups.read().await;
            Ok(groups
                .iter()
                .map(|(group_id, offsets)| ConsumerGroup {
                    group_id: group_id.clone(),
                    offsets: offsets.clone(),
                })
                .collect())
        })
    }

    fn delete_topic(&self, topic: &str) -> StoreFuture<'_, ()> {
        let topic = topic.to_string();
        Box::pin(async move {
            match self.topics.write().await.remove(&topic) {
                Some(_) => {
                    tracing::info!(topic = %topic, "deleted topic");
                    Ok(())
                }
                None => Err(StoreError::topic_not_found(&topic)),
            }
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryStream
// ═══════════════════════════════════════════════════════════════

/// Batch cursor over one partition. Only `position` moves; the partition
/// itself is shared with writers.
struct MemoryStream {
    log: Arc<TopicLog>,
    partition: PartitionId,
    window: Range<Offset>,
    order: SortOrder,
    position: Offset,
    batch_size: Offset,
}

impl RecordStream for MemoryStream {
    fn next_batch(&mut self) -> StoreFuture<'_, Option<Vec<Record>>> {
        Box::pin(async move {
            let Some(part) = self.log.partitions.get(self.partition as usize) else {
                return Ok(None);
            };
            let part = part.read().await;
            match self.order {
                SortOrder::OldestFirst => {
                    let start = self.position.max(part.earliest);
                    let end = self.window.end.min(part.latest());
                    if start >= end {
                        self.position = self.window.end;
                        return Ok(None);
                    }
                    let hi = start.saturating_add(self.batch_size).min(end);
                    self.position = hi;
                    Ok(Some(part.slice(start, hi)))
                }
                SortOrder::NewestFirst => {
                    let floor = self.window.start.max(part.earliest);
                    let end = self.position.min(part.latest());
                    if end <= floor {
                        self.position = self.window.start;
                        return Ok(None);
                    }
                    let lo = end.saturating_sub(self.batch_size).max(floor);
                    self.position = lo;
                    let mut batch = part.slice(lo, end);
                    batch.reverse();
                    Ok(Some(batch))
                }
            }
        })
    }
}
