use std::time::Duration;

use browse_api::{ErrorKind, StoreError, StoreFuture};

#[derive(Debug, thiserror::Error)]
pub enum BrowseError {
    #[error("topic '{0}' not found")]
    TopicNotFound(String),

    #[error("partition {partition} out of range for topic '{topic}' ({count} partitions)")]
    PartitionOutOfRange {
        topic: String,
        partition: u32,
        count: usize,
    },

    #[error("invalid timestamp '{input}': {detail}")]
    InvalidTimestamp { input: String, detail: String },

    #[error("invalid cursor '{input}': {detail}")]
    InvalidCursor { input: String, detail: String },

    #[error("invalid page size {0}")]
    InvalidPageSize(usize),

    #[error("invalid page number {0}, pages start at 1")]
    InvalidPageNumber(usize),

    #[error("store unavailable: {0}")]
    StoreUnavailable(StoreError),

    #[error("read timed out: {0}")]
    ReadTimeout(String),
}

impl BrowseError {
    /// Map a store failure for `topic` onto the browse taxonomy.
    pub fn from_store(topic: &str, err: StoreError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => BrowseError::TopicNotFound(topic.to_string()),
            ErrorKind::Timeout => BrowseError::ReadTimeout(format!("{topic}: {}", err.message())),
            ErrorKind::Unavailable | ErrorKind::Invalid => {
                BrowseError::StoreUnavailable(err.with_context(topic))
            }
        }
    }

    /// Bad caller input (as opposed to a store failure).
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            BrowseError::PartitionOutOfRange { .. }
                | BrowseError::InvalidTimestamp { .. }
                | BrowseError::InvalidCursor { .. }
                | BrowseError::InvalidPageSize(_)
                | BrowseError::InvalidPageNumber(_)
        )
    }
}

/// Await a store call for `topic`, bounded by `timeout`.
pub(crate) async fn timed<T>(
    fut: StoreFuture<'_, T>,
    timeout: Duration,
    topic: &str,
    what: &str,
) -> Result<T, BrowseError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(|e| BrowseError::from_store(topic, e)),
        Err(_) => {
            tracing::warn!(topic = %topic, what, timeout_ms = timeout.as_millis() as u64, "store call timed out");
            Err(BrowseError::ReadTimeout(format!("{topic}: {what} exceeded {timeout:?}")))
        }
    }
}
