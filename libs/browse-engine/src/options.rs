use browse_api::{PartitionId, SortOrder, TopicSnapshot};

use crate::config::BrowseConfig;
use crate::cursor::Cursor;
use crate::error::BrowseError;

/// One validated browsing request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    cluster: String,
    topic: String,
    cursor: Option<Cursor>,
    partition: Option<PartitionId>,
    sort: SortOrder,
    timestamp_ms: Option<i64>,
    search: Option<String>,
    page_size: usize,
}

impl QueryOptions {
    pub fn builder(cluster: impl Into<String>) -> QueryOptionsBuilder {
        QueryOptionsBuilder {
            cluster: cluster.into(),
            ..Default::default()
        }
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn partition(&self) -> Option<PartitionId> {
        self.partition
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn timestamp_ms(&self) -> Option<i64> {
        self.timestamp_ms
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

/// Raw, unvalidated inputs for [`QueryOptions`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptionsBuilder {
    cluster: String,
    after: Option<String>,
    partition: Option<PartitionId>,
    sort: Option<SortOrder>,
    timestamp: Option<String>,
    search: Option<String>,
    page_size: Option<usize>,
}

impl QueryOptionsBuilder {
    /// Cursor token returned by the previous page.
    pub fn after(mut self, token: impl Into<String>) -> Self {
        self.after = Some(token.into());
        self
    }

    pub fn partition(mut self, partition: PartitionId) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }

    /// ISO-8601 instant, e.g. `2024-05-01T10:00:00Z`.
    pub fn timestamp(mut self, instant: impl Into<String>) -> Self {
        self.timestamp = Some(instant.into());
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Validate against the topic and fill gaps from `defaults`.
    pub fn build(
        self,
        topic: &TopicSnapshot,
        defaults: &BrowseConfig,
    ) -> Result<QueryOptions, BrowseError> {
        if let Some(partition) = self.partition {
            if topic.partition(partition).is_none() {
                return Err(BrowseError::PartitionOutOfRange {
                    topic: topic.name.clone(),
                    partition,
                    count: topic.partitions.len(),
                });
            }
        }

        let timestamp_ms = self.timestamp.as_deref().map(parse_instant_ms).transpose()?;
        let cursor = match self.after.as_deref() {
            None | Some("") => None,
            Some(token) => Some(parse_cursor(token, topic)?),
        };

        let page_size = self.page_size.unwrap_or(defaults.page_size);
        if page_size == 0 {
            return Err(BrowseError::InvalidPageSize(page_size));
        }

        let search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(QueryOptions {
            cluster: self.cluster,
            topic: topic.name.clone(),
            cursor,
            partition: self.partition,
            sort: self.sort.unwrap_or(defaults.default_sort),
            timestamp_ms,
            search,
            page_size,
        })
    }
}

fn parse_instant_ms(input: &str) -> Result<i64, BrowseError> {
    chrono::DateTime::parse_from_rfc3339(input.trim())
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| BrowseError::InvalidTimestamp {
            input: input.to_string(),
            detail: e.to_string(),
        })
}

fn parse_cursor(token: &str, topic: &TopicSnapshot) -> Result<Cursor, BrowseError> {
    let invalid = |detail: String| BrowseError::InvalidCursor {
        input: token.to_string(),
        detail,
    };
    let cursor: Cursor = token.parse().map_err(invalid)?;
    if let Some(unknown) = cursor.partitions().find(|p| topic.partition(*p).is_none()) {
        return Err(invalid(format!(
            "topic '{}' has no partition {unknown}",
            topic.name
        )));
    }
    Ok(cursor)
}
