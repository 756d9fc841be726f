use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use browse_api::{LogStore, Offset, PartitionId, Record, SortOrder};

use crate::cursor::{Cursor, PartitionProgress, next_cursor};
use crate::error::{BrowseError, timed};
use crate::window::PartitionWindow;

/// Records of one page plus the cursor for the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BoundedRead {
    pub records: Vec<Record>,
    pub cursor: Cursor,
}

/// Windowed read across the active partitions.
///
/// Every partition is read concurrently, up to `page_size` records each, then
/// the partition buffers are merged in sort order. The merge only ever takes
/// a partition's head record, so what a page takes from a partition is an
/// unbroken run of its records from the window start; the cursor relies on
/// that.
pub(crate) struct BoundedReader {
    store: Arc<dyn LogStore>,
    read_timeout: Duration,
}

/// Result of one partition sub-read, in read order.
struct PartitionSlice {
    window: PartitionWindow,
    records: VecDeque<Record>,
    /// The store has nothing more in this window beyond `records`, so
    /// draining the buffer means the partition is done.
    complete: bool,
    taken: Option<Offset>,
}

impl PartitionSlice {
    fn progress(&self) -> PartitionProgress {
        PartitionProgress {
            window: self.window,
            consumed: self.taken,
            exhausted: self.complete && self.records.is_empty(),
        }
    }
}

impl BoundedReader {
    pub fn new(store: Arc<dyn LogStore>, read_timeout: Duration) -> Self {
        Self { store, read_timeout }
    }

    pub async fn read(
        &self,
        topic: &str,
        windows: &[PartitionWindow],
        order: SortOrder,
        page_size: usize,
    ) -> Result<BoundedRead, BrowseError> {
        let mut slices = self.fan_out(topic, windows, order, page_size).await?;
        slices.sort_by_key(|s| s.window.partition);

        let records = if slices.len() == 1 {
            take_single(&mut slices[0], page_size)
        } else {
            merge(&mut slices, order, page_size)
        };

        let progress: Vec<PartitionProgress> = slices.iter().map(PartitionSlice::progress).collect();
        let cursor = next_cursor(&progress, order);

        tracing::debug!(
            topic = %topic,
            partitions = slices.len(),
            records = records.len(),
            cursor = %cursor,
            "bounded read done"
        );
        Ok(BoundedRead { records, cursor })
    }

    async fn fan_out(
        &self,
        topic: &str,
        windows: &[PartitionWindow],
        order: SortOrder,
        page_size: usize,
    ) -> Result<Vec<PartitionSlice>, BrowseError> {
        let mut tasks = JoinSet::new();
        for window in windows.iter().copied() {
            let store = Arc::clone(&self.store);
            let topic = topic.to_string();
            let read_timeout = self.read_timeout;
            tasks.spawn(async move {
                let sub_read = SubRead { store: store.as_ref(), topic: &topic, window, page_size, read_timeout };
                match order {
                    SortOrder::OldestFirst => sub_read.forward().await,
                    SortOrder::NewestFirst => sub_read.backward().await,
                }
            });
        }

        let mut slices = Vec::with_capacity(windows.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(slice) => slices.push(slice?),
                Err(e) => {
                    return Err(BrowseError::StoreUnavailable(browse_api::StoreError::unavailable(
                        format!("{topic}: partition read task failed: {e}"),
                    )));
                }
            }
        }
        Ok(slices)
    }
}

/// One partition's share of a page. Offsets are increasing but may have
/// gaps, so the window is only ever used as a bound, never as a count.
struct SubRead<'a> {
    store: &'a dyn LogStore,
    topic: &'a str,
    window: PartitionWindow,
    page_size: usize,
    read_timeout: Duration,
}

impl SubRead<'_> {
    fn empty(&self) -> PartitionSlice {
        PartitionSlice { window: self.window, records: VecDeque::new(), complete: true, taken: None }
    }

    /// Oldest first: one `read_window` from the start position upward.
    async fn forward(self) -> Result<PartitionSlice, BrowseError> {
        let window = self.window;
        let remaining = window.remaining(SortOrder::OldestFirst);
        if remaining == 0 {
            return Ok(self.empty());
        }

        let wanted = remaining.min(self.page_size as u64) as usize;
        let mut records = timed(
            self.store.read_window(self.topic, window.partition, window.start, wanted),
            self.read_timeout,
            self.topic,
            "read_window",
        )
        .await?;
        let returned = records.len();
        let reached_bound = records.last().is_some_and(|r| r.offset.saturating_add(1) >= window.ceiling);

        records.retain(|r| {
            r.partition == window.partition && r.offset >= window.start && r.offset < window.ceiling
        });
        records.sort_by_key(|r| r.offset);

        tracing::debug!(
            topic = %self.topic,
            partition = window.partition,
            from = window.start,
            wanted,
            got = records.len(),
            "partition window read"
        );
        Ok(PartitionSlice {
            window,
            records: records.into(),
            complete: returned < wanted || reached_bound,
            taken: None,
        })
    }

    /// Newest first: pull store batches downward from the start position
    /// until the page is covered or the floor is reached.
    async fn backward(self) -> Result<PartitionSlice, BrowseError> {
        let window = self.window;
        let order = SortOrder::NewestFirst;
        if window.remaining(order) == 0 {
            return Ok(self.empty());
        }

        let mut stream = timed(
            self.store.stream(self.topic, window.partition, window.span(order), order),
            self.read_timeout,
            self.topic,
            "stream",
        )
        .await?;

        let mut records = Vec::new();
        let mut drained = false;
        while records.len() < self.page_size {
            let batch = timed(stream.next_batch(), self.read_timeout, self.topic, "next_batch").await?;
            match batch {
                Some(batch) if !batch.is_empty() => {
                    records.extend(batch.into_iter().filter(|r| {
                        r.partition == window.partition
                            && r.offset >= window.floor
                            && r.offset < window.start
                    }));
                }
                _ => {
                    drained = true;
                    break;
                }
            }
        }

        records.sort_by(|a, b| b.offset.cmp(&a.offset));
        let truncated = records.len() > self.page_size;
        records.truncate(self.page_size);
        let reached_bound = records.last().is_some_and(|r| r.offset <= window.floor);

        tracing::debug!(
            topic = %self.topic,
            partition = window.partition,
            below = window.start,
            got = records.len(),
            drained,
            "partition window read"
        );
        Ok(PartitionSlice {
            window,
            records: records.into(),
            complete: reached_bound || (drained && !truncated),
            taken: None,
        })
    }
}

fn take_single(slice: &mut PartitionSlice, page_size: usize) -> Vec<Record> {
    let n = slice.records.len().min(page_size);
    let records: Vec<Record> = slice.records.drain(..n).collect();
    slice.taken = records.last().map(|r| r.offset);
    records
}

/// Sort key: timestamp, then partition, then offset.
fn merge_key(record: &Record) -> (i64, PartitionId, Offset) {
    (record.timestamp_ms, record.partition, record.offset)
}

fn merge(slices: &mut [PartitionSlice], order: SortOrder, page_size: usize) -> Vec<Record> {
    let mut out = Vec::with_capacity(page_size);
    while out.len() < page_size {
        if slices.iter().any(|s| s.records.is_empty() && !s.complete) {
            // The store still holds records of this partition that may sort
            // before the remaining heads; let the next page pick them up.
            break;
        }

        let heads = slices
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.records.front().map(|r| (i, merge_key(r))));
        let best = match order {
            SortOrder::OldestFirst => heads.min_by_key(|(_, key)| *key),
            SortOrder::NewestFirst => heads.max_by_key(|(_, key)| *key),
        };
        let Some((i, _)) = best else {
            break;
        };

        let slice = &mut slices[i];
        if let Some(record) = slice.records.pop_front() {
            slice.taken = Some(record.offset);
            out.push(record);
        }
    }
    out
}
