use browse_api::TopicSnapshot;

use crate::options::QueryOptions;

/// Advisory totals for a query. Taken from a snapshot, so already stale
/// when the log keeps growing; never use it to size allocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeEstimate {
    pub record_count: u64,
    pub page_count: u64,
}

/// Record count of the partitions the query covers, and the pages needed
/// to show them. An empty topic still has one (empty) page.
pub fn estimate(topic: &TopicSnapshot, options: &QueryOptions) -> SizeEstimate {
    let record_count = match options.partition() {
        Some(index) => topic.partition(index).map_or(0, |p| p.size()),
        None => topic.size(),
    };
    SizeEstimate {
        record_count,
        page_count: page_count(record_count, options.page_size()),
    }
}

/// Pages of `page_size` needed to show `total` items; never less than one.
pub(crate) fn page_count(total: u64, page_size: usize) -> u64 {
    if total > 0 {
        total.div_ceil(page_size.max(1) as u64)
    } else {
        1
    }
}
