//! Free-text search over the log.
//!
//! The scan is a lazy sequence ([`SearchScan`]) of store batches; the
//! searcher pulls from it until one batch contains a match, the log end is
//! reached, or the caller's deadline/cancellation fires.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use browse_api::{LogStore, Offset, PartitionId, Record, RecordStream, SortOrder};

use crate::cursor::{Cursor, PartitionProgress, next_cursor};
use crate::error::{BrowseError, timed};
use crate::window::PartitionWindow;

// ═══════════════════════════════════════════════════════════════
//  Predicate
// ═══════════════════════════════════════════════════════════════

/// Case-sensitive substring match over key, value, header names and
/// header values.
#[derive(Debug, Clone)]
pub struct SearchPredicate {
    needle: Vec<u8>,
}

impl SearchPredicate {
    pub fn new(term: &str) -> Self {
        Self { needle: term.as_bytes().to_vec() }
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.key.as_deref().is_some_and(|k| self.found_in(k))
            || self.found_in(&record.value)
            || record
                .headers
                .iter()
                .any(|(name, value)| self.found_in(name.as_bytes()) || self.found_in(value))
    }

    fn found_in(&self, haystack: &[u8]) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        haystack.windows(self.needle.len()).any(|w| w == self.needle.as_slice())
    }
}

// ═══════════════════════════════════════════════════════════════
//  SearchScan
// ═══════════════════════════════════════════════════════════════

/// One element of the scan: a single store batch after filtering.
#[derive(Debug)]
pub struct ScanBatch {
    pub partition: PartitionId,
    /// Records read from the store for this batch, matching or not.
    pub scanned: usize,
    pub matches: Vec<Record>,
}

struct PartitionScan {
    window: PartitionWindow,
    stream: Option<Box<dyn RecordStream>>,
    consumed: Option<Offset>,
    exhausted: bool,
}

/// Round-robin scan over one stream per active partition.
///
/// Each [`next_batch`](SearchScan::next_batch) call triggers exactly one store
/// read. Progress is recorded only after a read completes, so dropping an
/// in-flight call loses nothing already accounted for in [`cursor`](SearchScan::cursor).
pub struct SearchScan {
    topic: String,
    order: SortOrder,
    predicate: SearchPredicate,
    partitions: Vec<PartitionScan>,
    next: usize,
}

impl SearchScan {
    pub(crate) async fn open(
        store: &Arc<dyn LogStore>,
        topic: &str,
        windows: &[PartitionWindow],
        order: SortOrder,
        predicate: SearchPredicate,
        read_timeout: Duration,
    ) -> Result<Self, BrowseError> {
        let mut partitions = Vec::with_capacity(windows.len());
        for window in windows.iter().copied() {
            if window.remaining(order) == 0 {
                partitions.push(PartitionScan { window, stream: None, consumed: None, exhausted: true });
                continue;
            }
            let stream = timed(
                store.stream(topic, window.partition, window.span(order), order),
                read_timeout,
                topic,
                "stream",
            )
            .await?;
            partitions.push(PartitionScan {
                window,
                stream: Some(stream),
                consumed: None,
                exhausted: false,
            });
        }
        Ok(Self {
            topic: topic.to_string(),
            order,
            predicate,
            partitions,
            next: 0,
        })
    }

    /// Pull one batch. `Ok(None)` once every partition reached its bound.
    pub async fn next_batch(&mut self) -> Result<Option<ScanBatch>, BrowseError> {
        let count = self.partitions.len();
        let Some(idx) = (0..count)
            .map(|i| (self.next + i) % count)
            .find(|&i| !self.partitions[i].exhausted)
        else {
            return Ok(None);
        };
        self.next = (idx + 1) % count;

        let scan = &mut self.partitions[idx];
        let partition = scan.window.partition;
        let Some(stream) = scan.stream.as_mut() else {
            scan.exhausted = true;
            return Ok(Some(ScanBatch { partition, scanned: 0, matches: Vec::new() }));
        };

        let batch = stream
            .next_batch()
            .await
            .map_err(|e| BrowseError::from_store(&self.topic, e))?;

        let Some(batch) = batch else {
            scan.exhausted = true;
            scan.stream = None;
            return Ok(Some(ScanBatch { partition, scanned: 0, matches: Vec::new() }));
        };
        if batch.is_empty() {
            scan.exhausted = true;
            scan.stream = None;
        }

        if let Some(last) = batch.last() {
            scan.consumed = Some(last.offset);
            if scan.window.step_past(last.offset, self.order) == scan.window.bound(self.order) {
                scan.exhausted = true;
                scan.stream = None;
            }
        }
        let scanned = batch.len();
        let matches: Vec<Record> = batch.into_iter().filter(|r| self.predicate.matches(r)).collect();
        Ok(Some(ScanBatch { partition, scanned, matches }))
    }

    /// Where a follow-up search resumes: past every fully consumed batch.
    pub fn cursor(&self) -> Cursor {
        let progress: Vec<PartitionProgress> = self
            .partitions
            .iter()
            .map(|p| PartitionProgress {
                window: p.window,
                consumed: p.consumed,
                exhausted: p.exhausted,
            })
            .collect();
        next_cursor(&progress, self.order)
    }
}

// ═══════════════════════════════════════════════════════════════
//  First-match consumption
// ═══════════════════════════════════════════════════════════════

/// Outcome of a first-match search.
#[derive(Debug)]
pub struct SearchOutcome {
    pub records: Vec<Record>,
    pub cursor: Cursor,
    /// Stopped by deadline or cancellation rather than by a match or the
    /// log end.
    pub cancelled: bool,
}

/// Drive `scan` until a batch contains a match, the log end is reached, or
/// `deadline` / `cancel` fires. Cancellation is not an error: the outcome
/// is flagged and carries the cursor of what was fully scanned.
pub async fn first_match(
    scan: &mut SearchScan,
    deadline: Instant,
    cancel: &CancellationToken,
) -> Result<SearchOutcome, BrowseError> {
    let topic = scan.topic.clone();
    let mut batches = 0usize;
    let mut scanned = 0usize;
    let (records, cancelled) = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                tracing::warn!(topic = %topic, batches, scanned, "search cancelled by caller");
                break (Vec::new(), true);
            }
            _ = tokio::time::sleep_until(deadline) => {
                tracing::warn!(topic = %topic, batches, scanned, "search deadline reached");
                break (Vec::new(), true);
            }
            step = scan.next_batch() => {
                match step? {
                    None => break (Vec::new(), false),
                    Some(batch) => {
                        batches += 1;
                        scanned += batch.scanned;
                        if !batch.matches.is_empty() {
                            break (batch.matches, false);
                        }
                    }
                }
            }
        }
    };

    let cursor = scan.cursor();
    tracing::debug!(
        topic = %topic,
        batches,
        scanned,
        matched = records.len(),
        cancelled,
        cursor = %cursor,
        "search done"
    );
    Ok(SearchOutcome { records, cursor, cancelled })
}
