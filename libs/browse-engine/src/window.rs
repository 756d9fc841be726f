use std::time::Duration;

use browse_api::{LogStore, Offset, PartitionId, SortOrder, TopicSnapshot};

use crate::error::{BrowseError, timed};
use crate::options::QueryOptions;

/// Readable span of one partition for one request.
///
/// `floor..ceiling` is what the request may see at all: `ceiling` is the
/// snapshot's latest offset, `floor` the earliest offset or the first offset
/// at or after the timestamp bound. `start` is where this page begins: in
/// oldest-first order the first offset to read, in newest-first order the
/// exclusive upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PartitionWindow {
    pub partition: PartitionId,
    pub floor: Offset,
    pub ceiling: Offset,
    pub start: Offset,
}

impl PartitionWindow {
    /// Offsets still readable in `order`.
    pub fn remaining(&self, order: SortOrder) -> u64 {
        match order {
            SortOrder::OldestFirst => self.ceiling - self.start,
            SortOrder::NewestFirst => self.start - self.floor,
        }
    }

    /// Where reading in `order` ends.
    pub fn bound(&self, order: SortOrder) -> Offset {
        match order {
            SortOrder::OldestFirst => self.ceiling,
            SortOrder::NewestFirst => self.floor,
        }
    }

    /// Cursor position once `offset` has been consumed.
    pub fn step_past(&self, offset: Offset, order: SortOrder) -> Offset {
        match order {
            SortOrder::OldestFirst => offset.saturating_add(1).min(self.ceiling),
            SortOrder::NewestFirst => offset.max(self.floor),
        }
    }

    /// Offsets left to read, in `start..end` form regardless of direction.
    pub fn span(&self, order: SortOrder) -> std::ops::Range<Offset> {
        match order {
            SortOrder::OldestFirst => self.start..self.ceiling,
            SortOrder::NewestFirst => self.floor..self.start,
        }
    }
}

/// Resolve the window of every partition the request touches.
///
/// Anchor precedence: cursor, then timestamp bound, then the log extremity
/// matching the sort direction. The timestamp bound also stays in force as
/// the floor, so newest-first reads stop at it.
pub(crate) async fn resolve_windows(
    store: &dyn LogStore,
    snapshot: &TopicSnapshot,
    options: &QueryOptions,
    read_timeout: Duration,
) -> Result<Vec<PartitionWindow>, BrowseError> {
    let active = snapshot
        .partitions
        .iter()
        .filter(|p| options.partition().is_none_or(|only| only == p.index));

    let mut windows = Vec::new();
    for info in active {
        let ceiling = info.latest_offset;
        let floor = match options.timestamp_ms() {
            Some(ts) => {
                let resolved = timed(
                    store.offset_for_timestamp(&snapshot.name, info.index, ts),
                    read_timeout,
                    &snapshot.name,
                    "offset_for_timestamp",
                )
                .await?;
                resolved.unwrap_or(ceiling).clamp(info.earliest_offset, ceiling)
            }
            None => info.earliest_offset,
        };
        let start = match options.cursor().and_then(|c| c.get(info.index)) {
            Some(offset) => offset.clamp(floor, ceiling),
            None => match options.sort() {
                SortOrder::OldestFirst => floor,
                SortOrder::NewestFirst => ceiling,
            },
        };
        windows.push(PartitionWindow { partition: info.index, floor, ceiling, start });
    }
    Ok(windows)
}
