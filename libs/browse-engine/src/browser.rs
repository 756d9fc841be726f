use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use browse_api::{LogStore, PartitionId, Record, SortOrder, TopicSnapshot};

use crate::bounded::BoundedReader;
use crate::catalog::{GroupLag, TopicListQuery, TopicPage, group_lag, page_topics};
use crate::config::BrowseConfig;
use crate::cursor::Cursor;
use crate::error::{BrowseError, timed};
use crate::options::QueryOptions;
use crate::search::{SearchPredicate, SearchScan, first_match};
use crate::size::{SizeEstimate, estimate};
use crate::window::resolve_windows;

/// One page of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    /// At most `page_size` records for plain reads; one store batch worth of
    /// matches in search mode.
    pub records: Vec<Record>,
    pub cursor: Cursor,
    pub record_count: u64,
    pub page_count: u64,
    /// The scanning searcher produced this page.
    pub search: bool,
    /// The search stopped at its deadline or on cancellation; `records` and
    /// `cursor` describe the partial progress.
    pub search_cancelled: bool,
}

/// Raw browsing request as received from a caller, before validation.
#[derive(Debug, Clone, Default)]
pub struct BrowseRequest {
    pub cluster: String,
    pub topic: String,
    pub after: Option<String>,
    pub partition: Option<PartitionId>,
    pub sort: Option<SortOrder>,
    pub timestamp: Option<String>,
    pub search: Option<String>,
    pub page_size: Option<usize>,
}

/// Paged, filterable reads over the topics of one log store.
pub struct RecordBrowser {
    store: Arc<dyn LogStore>,
    config: BrowseConfig,
}

impl RecordBrowser {
    pub fn new(store: Arc<dyn LogStore>, config: BrowseConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }

    pub fn config(&self) -> &BrowseConfig {
        &self.config
    }

    /// Current partition offsets of `topic`.
    pub async fn describe(&self, topic: &str) -> Result<TopicSnapshot, BrowseError> {
        let partitions = timed(
            self.store.list_partitions(topic),
            self.config.read_timeout(),
            topic,
            "list_partitions",
        )
        .await?;
        Ok(TopicSnapshot::new(topic, partitions))
    }

    /// One page of topic names, filtered by view and search term.
    pub async fn list_topics(&self, query: &TopicListQuery) -> Result<TopicPage, BrowseError> {
        let names = timed(self.store.list_topics(), self.config.read_timeout(), "*", "list_topics").await?;
        let page = page_topics(names, query, self.config.topic_page_size)?;
        tracing::debug!(total = page.total, page = page.page, page_count = page.page_count, "topics listed");
        Ok(page)
    }

    /// Committed offsets of every consumer group on `topic`, with lag
    /// against the current log end.
    pub async fn consumer_groups(&self, topic: &str) -> Result<Vec<GroupLag>, BrowseError> {
        let snapshot = self.describe(topic).await?;
        let groups = timed(
            self.store.list_consumer_groups(topic),
            self.config.read_timeout(),
            topic,
            "list_consumer_groups",
        )
        .await?;
        Ok(group_lag(&snapshot, groups))
    }

    pub fn estimate_size(&self, topic: &TopicSnapshot, options: &QueryOptions) -> SizeEstimate {
        estimate(topic, options)
    }

    /// Read one page: a bounded read, or a first-match search when the
    /// options carry a search term.
    pub async fn list_page(
        &self,
        topic: &TopicSnapshot,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<PageResult, BrowseError> {
        let size = estimate(topic, options);
        let windows =
            resolve_windows(self.store.as_ref(), topic, options, self.config.read_timeout()).await?;

        match options.search() {
            None => {
                tracing::debug!(
                    cluster = %options.cluster(),
                    topic = %topic.name,
                    partitions = windows.len(),
                    sort = %options.sort(),
                    page_size = options.page_size(),
                    "bounded read"
                );
                let reader = BoundedReader::new(Arc::clone(&self.store), self.config.read_timeout());
                let read = reader
                    .read(&topic.name, &windows, options.sort(), options.page_size())
                    .await?;
                Ok(PageResult {
                    records: read.records,
                    cursor: read.cursor,
                    record_count: size.record_count,
                    page_count: size.page_count,
                    search: false,
                    search_cancelled: false,
                })
            }
            Some(term) => {
                tracing::debug!(
                    cluster = %options.cluster(),
                    topic = %topic.name,
                    partitions = windows.len(),
                    sort = %options.sort(),
                    term,
                    "scanning search"
                );
                let deadline = Instant::now() + self.config.search_timeout();
                let mut scan = SearchScan::open(
                    &self.store,
                    &topic.name,
                    &windows,
                    options.sort(),
                    SearchPredicate::new(term),
                    self.config.read_timeout(),
                )
                .await?;
                let outcome = first_match(&mut scan, deadline, cancel).await?;
                Ok(PageResult {
                    records: outcome.records,
                    cursor: outcome.cursor,
                    record_count: size.record_count,
                    page_count: size.page_count,
                    search: true,
                    search_cancelled: outcome.cancelled,
                })
            }
        }
    }

    /// Open the lazy search sequence for `options` without consuming it.
    /// Callers that want more than the first matching batch drive it
    /// themselves.
    pub async fn open_scan(
        &self,
        topic: &TopicSnapshot,
        options: &QueryOptions,
        term: &str,
    ) -> Result<SearchScan, BrowseError> {
        let windows =
            resolve_windows(self.store.as_ref(), topic, options, self.config.read_timeout()).await?;
        SearchScan::open(
            &self.store,
            &topic.name,
            &windows,
            options.sort(),
            SearchPredicate::new(term),
            self.config.read_timeout(),
        )
        .await
    }

    /// Describe the topic, validate the raw request against it, and read
    /// one page.
    pub async fn browse(
        &self,
        request: BrowseRequest,
        cancel: &CancellationToken,
    ) -> Result<PageResult, BrowseError> {
        let topic = self.describe(&request.topic).await?;

        let mut builder = QueryOptions::builder(request.cluster);
        if let Some(after) = request.after {
            builder = builder.after(after);
        }
        if let Some(partition) = request.partition {
            builder = builder.partition(partition);
        }
        if let Some(sort) = request.sort {
            builder = builder.sort(sort);
        }
        if let Some(timestamp) = request.timestamp {
            builder = builder.timestamp(timestamp);
        }
        if let Some(search) = request.search {
            builder = builder.search(search);
        }
        if let Some(page_size) = request.page_size {
            builder = builder.page_size(page_size);
        }
        let options = builder.build(&topic, &self.config)?;

        self.list_page(&topic, &options, cancel).await
    }
}
