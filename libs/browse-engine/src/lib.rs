//! Record browsing and pagination over a partitioned log.
//!
//! A request is validated into [`QueryOptions`], sized by [`estimate`], and
//! served by either a bounded windowed read across partitions or, when it
//! carries a search term, a first-match scan over a lazy batch sequence.
//! Both return a [`Cursor`] to continue from.

pub mod catalog;
pub mod config;
pub mod cursor;
pub mod error;
pub mod options;
pub mod search;
pub mod size;

mod bounded;
mod browser;
mod window;

pub use browser::{BrowseRequest, PageResult, RecordBrowser};
pub use catalog::{GroupLag, PartitionLag, TopicListQuery, TopicListView, TopicPage};
pub use config::BrowseConfig;
pub use cursor::Cursor;
pub use error::BrowseError;
pub use options::{QueryOptions, QueryOptionsBuilder};
pub use search::{ScanBatch, SearchOutcome, SearchPredicate, SearchScan, first_match};
pub use size::{SizeEstimate, estimate};
