//! Shared model and store interface for the topic record browser.
//!
//! Everything the browsing engine needs from the outside world is declared
//! here: the record/partition data model and the [`LogStore`] trait that a
//! concrete log backend implements.

pub mod error;
pub mod store;
pub mod types;
pub mod util;

pub use error::{ErrorKind, StoreError};
pub use store::{LogStore, RecordStream, StoreFuture};
pub use types::{
    CleanupPolicy, ConsumerGroup, NewTopic, Offset, PartitionId, PartitionInfo, ProduceRecord,
    Record, SortOrder, TopicSnapshot,
};
pub use util::now_ms;
