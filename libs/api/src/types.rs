use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════
//  Partition / Topic
// ════════════════════════════════════════════════════════════════

/// Partition index within a topic (0-based).
pub type PartitionId = u32;

/// Partition-local record position.
pub type Offset = u64;

/// Offsets of one partition as reported by the store.
///
/// `latest_offset` is exclusive: it is the offset the next produced record
/// will receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    pub index: PartitionId,
    pub earliest_offset: Offset,
    pub latest_offset: Offset,
}

impl PartitionInfo {
    /// Number of records currently retained by the partition.
    pub fn size(&self) -> u64 {
        self.latest_offset.saturating_sub(self.earliest_offset)
    }
}

/// Point-in-time view of a topic's partitions.
///
/// Partition count never changes while a query runs; offsets keep growing
/// in the store, so the snapshot is stale as soon as it is taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSnapshot {
    pub name: String,
    pub partitions: Vec<PartitionInfo>,
}

impl TopicSnapshot {
    pub fn new(name: impl Into<String>, mut partitions: Vec<PartitionInfo>) -> Self {
        partitions.sort_by_key(|p| p.index);
        Self { name: name.into(), partitions }
    }

    pub fn partition(&self, index: PartitionId) -> Option<&PartitionInfo> {
        self.partitions.iter().find(|p| p.index == index)
    }

    /// Sum of all partition sizes.
    pub fn size(&self) -> u64 {
        self.partitions.iter().map(PartitionInfo::size).sum()
    }
}

// ════════════════════════════════════════════════════════════════
//  Record
// ════════════════════════════════════════════════════════════════

/// A record read back from the log. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub partition: PartitionId,
    pub offset: Offset,
    /// Timestamp in milliseconds (Unix epoch).
    pub timestamp_ms: i64,
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
    pub headers: BTreeMap<String, Vec<u8>>,
}

/// A record handed to the store for appending.
///
/// Partition and timestamp are optional: the store picks a partition
/// (by key hash or round-robin) and stamps the current time when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProduceRecord {
    pub partition: Option<PartitionId>,
    pub timestamp_ms: Option<i64>,
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
    pub headers: BTreeMap<String, Vec<u8>>,
}

/// Direction records are returned in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Ascending offsets / timestamps.
    #[default]
    OldestFirst,
    /// Descending offsets / timestamps.
    NewestFirst,
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::OldestFirst => f.write_str("oldest_first"),
            SortOrder::NewestFirst => f.write_str("newest_first"),
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oldest_first" | "OLDEST" | "oldest" => Ok(SortOrder::OldestFirst),
            "newest_first" | "NEWEST" | "newest" => Ok(SortOrder::NewestFirst),
            other => Err(format!("unknown sort order '{other}'")),
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Topic management
// ════════════════════════════════════════════════════════════════

/// Retention / cleanup behaviour requested at topic creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    #[default]
    Delete,
    Compact,
}

impl std::fmt::Display for CleanupPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CleanupPolicy::Delete => f.write_str("delete"),
            CleanupPolicy::Compact => f.write_str("compact"),
        }
    }
}

/// Parameters for [`LogStore::create_topic`](crate::LogStore::create_topic).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTopic {
    pub name: String,
    pub partitions: u32,
    pub replication_factor: u16,
    /// Free-form store configuration (`retention.ms`, `cleanup.policy`, ...).
    #[serde(default)]
    pub configs: BTreeMap<String, String>,
}

/// Committed offsets of one consumer group on one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerGroup {
    pub group_id: String,
    /// Next offset the group will consume, per partition.
    pub offsets: BTreeMap<PartitionId, Offset>,
}
