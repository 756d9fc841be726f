#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use browse_api::{
    ConsumerGroup, LogStore, NewTopic, Offset, PartitionId, PartitionInfo, ProduceRecord, Record, RecordStream,
    SortOrder, StoreError, StoreFuture,
};
use browse_engine::{BrowseConfig, RecordBrowser};
use storage_memory::{MemoryLogStore, MemoryStoreConfig};

pub const TOPIC: &str = "orders";

/// Timestamp of `offset` in `partition`: interleaves partitions so a
/// merged read alternates between them.
pub fn ts(partition: PartitionId, offset: Offset) -> i64 {
    1_000 + offset as i64 * 3 + partition as i64
}

/// Memory store with `sizes.len()` partitions, partition `i` holding
/// `sizes[i]` records valued `p<i>-<offset>`.
pub async fn seeded_store(sizes: &[u64], batch_size: usize) -> MemoryLogStore {
    let store = MemoryLogStore::new(MemoryStoreConfig {
        batch_size,
        ..Default::default()
    });
    store
        .create_topic(NewTopic {
            name: TOPIC.to_string(),
            partitions: sizes.len() as u32,
            replication_factor: 1,
            configs: Default::default(),
        })
        .await
        .unwrap();
    for (p, size) in sizes.iter().enumerate() {
        let p = p as PartitionId;
        for offset in 0..*size {
            produce_at(&store, p, ts(p, offset), format!("p{p}-{offset}")).await;
        }
    }
    store
}

pub async fn produce_at(store: &dyn LogStore, partition: PartitionId, timestamp_ms: i64, value: String) {
    store
        .produce(
            TOPIC,
            ProduceRecord {
                partition: Some(partition),
                timestamp_ms: Some(timestamp_ms),
                key: Some(format!("key-{partition}").into_bytes()),
                value: value.into_bytes(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

pub fn browser(store: impl LogStore + 'static, config: BrowseConfig) -> RecordBrowser {
    RecordBrowser::new(Arc::new(store), config)
}

pub fn ids(records: &[Record]) -> Vec<(PartitionId, Offset)> {
    records.iter().map(|r| (r.partition, r.offset)).collect()
}

// ═══════════════════════════════════════════════════════════════
//  InstrumentedStore
// ═══════════════════════════════════════════════════════════════

/// Memory store wrapper that counts stream reads and can stall or fail
/// reads on demand.
pub struct InstrumentedStore {
    pub inner: MemoryLogStore,
    pub stream_reads: Arc<AtomicUsize>,
    pub stall_streams: bool,
    pub stall_reads: bool,
    pub fail_reads: bool,
}

impl InstrumentedStore {
    pub fn new(inner: MemoryLogStore) -> Self {
        Self {
            inner,
            stream_reads: Arc::new(AtomicUsize::new(0)),
            stall_streams: false,
            stall_reads: false,
            fail_reads: false,
        }
    }

    pub fn reads(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.stream_reads)
    }
}

struct CountingStream {
    inner: Box<dyn RecordStream>,
    reads: Arc<AtomicUsize>,
    stall: bool,
}

impl RecordStream for CountingStream {
    fn next_batch(&mut self) -> StoreFuture<'_, Option<Vec<Record>>> {
        Box::pin(async move {
            if self.stall {
                std::future::pending::<()>().await;
            }
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.next_batch().await
        })
    }
}

impl LogStore for InstrumentedStore {
    fn list_topics(&self) -> StoreFuture<'_, Vec<String>> {
        self.inner.list_topics()
    }

    fn list_partitions(&self, topic: &str) -> StoreFuture<'_, Vec<PartitionInfo>> {
        self.inner.list_partitions(topic)
    }

    fn read_window(
        &self,
        topic: &str,
        partition: PartitionId,
        start: Offset,
        max_count: usize,
    ) -> StoreFuture<'_, Vec<Record>> {
        if self.fail_reads {
            return Box::pin(async { Err(StoreError::unavailable("broker unreachable")) });
        }
        if self.stall_reads {
            return Box::pin(std::future::pending::<Result<Vec<Record>, StoreError>>());
        }
        self.inner.read_window(topic, partition, start, max_count)
    }

    fn stream(
        &self,
        topic: &str,
        partition: PartitionId,
        window: Range<Offset>,
        order: SortOrder,
    ) -> StoreFuture<'_, Box<dyn RecordStream>> {
        let opened = self.inner.stream(topic, partition, window, order);
        let reads = Arc::clone(&self.stream_reads);
        let stall = self.stall_streams;
        Box::pin(async move {
            let inner = opened.await?;
            Ok(Box::new(CountingStream { inner, reads, stall }) as Box<dyn RecordStream>)
        })
    }

    fn offset_for_timestamp(
        &self,
        topic: &str,
        partition: PartitionId,
        timestamp_ms: i64,
    ) -> StoreFuture<'_, Option<Offset>> {
        self.inner.offset_for_timestamp(topic, partition, timestamp_ms)
    }

    fn produce(&self, topic: &str, record: ProduceRecord) -> StoreFuture<'_, (PartitionId, Offset)> {
        self.inner.produce(topic, record)
    }

    fn create_topic(&self, topic: NewTopic) -> StoreFuture<'_, ()> {
        self.inner.create_topic(topic)
    }

    fn delete_topic(&self, topic: &str) -> StoreFuture<'_, ()> {
        self.inner.delete_topic(topic)
    }

    fn list_consumer_groups(&self, topic: &str) -> StoreFuture<'_, Vec<ConsumerGroup>> {
        self.inner.list_consumer_groups(topic)
    }
}

// ═══════════════════════════════════════════════════════════════
//  GapStore
// ═══════════════════════════════════════════════════════════════

/// Read-only store whose partitions retain arbitrary offsets, the way a
/// compacted log does. Each partition is `(retained offsets, latest)`.
pub struct GapStore {
    partitions: BTreeMap<PartitionId, (Vec<Offset>, Offset)>,
    batch_size: usize,
}

impl GapStore {
    pub fn new(partitions: Vec<(Vec<Offset>, Offset)>, batch_size: usize) -> Self {
        let partitions = partitions
            .into_iter()
            .enumerate()
            .map(|(p, (mut offsets, latest))| {
                offsets.sort_unstable();
                (p as PartitionId, (offsets, latest))
            })
            .collect();
        Self { partitions, batch_size }
    }

    fn record(partition: PartitionId, offset: Offset) -> Record {
        Record {
            partition,
            offset,
            timestamp_ms: ts(partition, offset),
            key: Some(format!("key-{partition}").into_bytes()),
            value: format!("p{partition}-{offset}").into_bytes(),
            headers: BTreeMap::new(),
        }
    }

    fn retained(&self, topic: &str, partition: PartitionId) -> Result<&Vec<Offset>, StoreError> {
        if topic != TOPIC {
            return Err(StoreError::topic_not_found(topic));
        }
        self.partitions
            .get(&partition)
            .map(|(offsets, _)| offsets)
            .ok_or_else(|| StoreError::invalid(format!("no partition {partition}")))
    }
}

struct ChunkStream {
    batches: VecDeque<Vec<Record>>,
}

impl RecordStream for ChunkStream {
    fn next_batch(&mut self) -> StoreFuture<'_, Option<Vec<Record>>> {
        let next = self.batches.pop_front();
        Box::pin(async move { Ok(next) })
    }
}

impl LogStore for GapStore {
    fn list_topics(&self) -> StoreFuture<'_, Vec<String>> {
        Box::pin(async { Ok(vec![TOPIC.to_string()]) })
    }

    fn list_partitions(&self, topic: &str) -> StoreFuture<'_, Vec<PartitionInfo>> {
        let result = if topic == TOPIC {
            Ok(self
                .partitions
                .iter()
                .map(|(&index, (offsets, latest))| PartitionInfo {
                    index,
                    earliest_offset: offsets.first().copied().unwrap_or(*latest),
                    latest_offset: *latest,
                })
                .collect())
        } else {
            Err(StoreError::topic_not_found(topic))
        };
        Box::pin(async move { result })
    }

    fn read_window(
        &self,
        topic: &str,
        partition: PartitionId,
        start: Offset,
        max_count: usize,
    ) -> StoreFuture<'_, Vec<Record>> {
        let result = self.retained(topic, partition).map(|offsets| {
            offsets
                .iter()
                .filter(|&&o| o >= start)
                .take(max_count)
                .map(|&o| Self::record(partition, o))
                .collect()
        });
        Box::pin(async move { result })
    }

    fn stream(
        &self,
        topic: &str,
        partition: PartitionId,
        window: Range<Offset>,
        order: SortOrder,
    ) -> StoreFuture<'_, Box<dyn RecordStream>> {
        let result = self.retained(topic, partition).map(|offsets| {
            let mut records: Vec<Record> = offsets
                .iter()
                .filter(|o| window.contains(o))
                .map(|&o| Self::record(partition, o))
                .collect();
            if order == SortOrder::NewestFirst {
                records.reverse();
            }
            let batches = records
                .chunks(self.batch_size.max(1))
                .map(<[Record]>::to_vec)
                .collect();
            Box::new(ChunkStream { batches }) as Box<dyn RecordStream>
        });
        Box::pin(async move { result })
    }

    fn offset_for_timestamp(
        &self,
        topic: &str,
        partition: PartitionId,
        timestamp_ms: i64,
    ) -> StoreFuture<'_, Option<Offset>> {
        let result = self
            .retained(topic, partition)
            .map(|offsets| offsets.iter().copied().find(|&o| ts(partition, o) >= timestamp_ms));
        Box::pin(async move { result })
    }

    fn produce(&self, _topic: &str, _record: ProduceRecord) -> StoreFuture<'_, (PartitionId, Offset)> {
        Box::pin(async { Err(StoreError::invalid("read-only store")) })
    }

    fn create_topic(&self, _topic: NewTopic) -> StoreFuture<'_, ()> {
        Box::pin(async { Err(StoreError::invalid("read-only store")) })
    }

    fn delete_topic(&self, _topic: &str) -> StoreFuture<'_, ()> {
        Box::pin(async { Err(StoreError::invalid("read-only store")) })
    }

    fn list_consumer_groups(&self, _topic: &str) -> StoreFuture<'_, Vec<ConsumerGroup>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}
