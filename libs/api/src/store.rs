use std::future::Future;
use std::ops::Range;
use std::pin::Pin;

use crate::error::StoreError;
use crate::types::{ConsumerGroup, NewTopic, Offset, PartitionId, PartitionInfo, ProduceRecord, Record, SortOrder};

/// Boxed future returned by every store operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

// ════════════════════════════════════════════════════════════════
//  RecordStream
// ════════════════════════════════════════════════════════════════

/// Lazy sequence of record batches from one partition.
///
/// Every call to [`next_batch`](RecordStream::next_batch) performs exactly one
/// store read; the batch size is chosen by the store. `Ok(None)` means the
/// stream reached the end of its window.
///
/// Dropping the stream (including dropping an in-flight `next_batch` future)
/// cancels the scan and leaves nothing behind in the store.
pub trait RecordStream: Send {
    fn next_batch(&mut self) -> StoreFuture<'_, Option<Vec<Record>>>;
}

// ════════════════════════════════════════════════════════════════
//  LogStore
// ════════════════════════════════════════════════════════════════

/// Partitioned append-only log, as seen by the browsing engine.
///
/// Connection lifetime, reconnection and retries belong to the
/// implementation; the engine only calls these operations once each.
pub trait LogStore: Send + Sync {
    /// Names of all topics, sorted.
    fn list_topics(&self) -> StoreFuture<'_, Vec<String>>;

    /// Current offsets of every partition of `topic`.
    fn list_partitions(&self, topic: &str) -> StoreFuture<'_, Vec<PartitionInfo>>;

    /// Read up to `max_count` records of one partition with offset `>= start`,
    /// ascending. Offsets may have gaps (compaction), so fewer than
    /// `max_count` records means nothing more is retained past the last one.
    /// Returns immediately with whatever is available; never waits for new
    /// production.
    fn read_window(
        &self,
        topic: &str,
        partition: PartitionId,
        start: Offset,
        max_count: usize,
    ) -> StoreFuture<'_, Vec<Record>>;

    /// Open a batch stream over `window` (`start..end`, end exclusive) of one
    /// partition, walking it in `order`.
    fn stream(
        &self,
        topic: &str,
        partition: PartitionId,
        window: Range<Offset>,
        order: SortOrder,
    ) -> StoreFuture<'_, Box<dyn RecordStream>>;

    /// First offset whose record timestamp is `>= timestamp_ms`.
    /// `None` when every record is older.
    fn offset_for_timestamp(
        &self,
        topic: &str,
        partition: PartitionId,
        timestamp_ms: i64,
    ) -> StoreFuture<'_, Option<Offset>>;

    /// Append a record. Returns `(partition, committed offset)`.
    fn produce(&self, topic: &str, record: ProduceRecord) -> StoreFuture<'_, (PartitionId, Offset)>;

    fn create_topic(&self, topic: NewTopic) -> StoreFuture<'_, ()>;

    fn delete_topic(&self, topic: &str) -> StoreFuture<'_, ()>;

    /// Consumer groups with committed offsets on `topic`, sorted by id.
    fn list_consumer_groups(&self, topic: &str) -> StoreFuture<'_, Vec<ConsumerGroup>>;
}
