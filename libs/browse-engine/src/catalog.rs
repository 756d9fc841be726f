//! Topic listing and consumer-group lag: thin views over the store, with
//! no cursor state of their own.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use browse_api::{ConsumerGroup, Offset, PartitionId, TopicSnapshot};

use crate::error::BrowseError;
use crate::size::page_count;

/// Which topics the topic list shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicListView {
    #[default]
    All,
    /// Hide `_`-prefixed broker topics.
    HideInternal,
    /// Hide broker topics and stream-processing topics.
    HideInternalStream,
    /// Hide `-changelog` / `-repartition` stream-processing topics.
    HideStream,
}

impl TopicListView {
    fn shows(self, name: &str) -> bool {
        let internal = name.starts_with('_');
        let stream = name.ends_with("-changelog") || name.ends_with("-repartition");
        match self {
            TopicListView::All => true,
            TopicListView::HideInternal => !internal,
            TopicListView::HideInternalStream => !internal && !stream,
            TopicListView::HideStream => !stream,
        }
    }
}

impl FromStr for TopicListView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(TopicListView::All),
            "hide_internal" => Ok(TopicListView::HideInternal),
            "hide_internal_stream" => Ok(TopicListView::HideInternalStream),
            "hide_stream" => Ok(TopicListView::HideStream),
            other => Err(format!("unknown topic view '{other}'")),
        }
    }
}

/// One request for the topic list. `page` counts from 1.
#[derive(Debug, Clone)]
pub struct TopicListQuery {
    pub search: Option<String>,
    pub view: TopicListView,
    pub page: usize,
    pub page_size: Option<usize>,
}

impl Default for TopicListQuery {
    fn default() -> Self {
        Self {
            search: None,
            view: TopicListView::All,
            page: 1,
            page_size: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPage {
    pub topics: Vec<String>,
    /// Topics matching the view and search, across all pages.
    pub total: u64,
    pub page: usize,
    pub page_count: u64,
}

/// Filter `names` (sorted) by view and case-insensitive search term, then
/// cut out the requested page.
pub fn page_topics(
    names: Vec<String>,
    query: &TopicListQuery,
    default_page_size: usize,
) -> Result<TopicPage, BrowseError> {
    let page_size = query.page_size.unwrap_or(default_page_size);
    if page_size == 0 {
        return Err(BrowseError::InvalidPageSize(page_size));
    }
    if query.page == 0 {
        return Err(BrowseError::InvalidPageNumber(query.page));
    }

    let needle = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let matching: Vec<String> = names
        .into_iter()
        .filter(|name| query.view.shows(name))
        .filter(|name| needle.as_deref().is_none_or(|n| name.to_lowercase().contains(n)))
        .collect();

    let total = matching.len() as u64;
    let topics = matching
        .into_iter()
        .skip((query.page - 1).saturating_mul(page_size))
        .take(page_size)
        .collect();
    Ok(TopicPage {
        topics,
        total,
        page: query.page,
        page_count: page_count(total, page_size),
    })
}

// ═══════════════════════════════════════════════════════════════
//  Consumer groups
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionLag {
    pub partition: PartitionId,
    pub committed: Offset,
    pub latest: Offset,
    pub lag: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupLag {
    pub group_id: String,
    pub partitions: Vec<PartitionLag>,
    pub total_lag: u64,
}

/// Lag of each group against the snapshot's latest offsets. Committed
/// offsets on partitions the snapshot does not know are skipped.
pub fn group_lag(topic: &TopicSnapshot, groups: Vec<ConsumerGroup>) -> Vec<GroupLag> {
    groups
        .into_iter()
        .map(|group| {
            let partitions: Vec<PartitionLag> = group
                .offsets
                .iter()
                .filter_map(|(&partition, &committed)| {
                    let latest = topic.partition(partition)?.latest_offset;
                    Some(PartitionLag {
                        partition,
                        committed,
                        latest,
                        lag: latest.saturating_sub(committed),
                    })
                })
                .collect();
            GroupLag {
                group_id: group.group_id,
                total_lag: partitions.iter().map(|p| p.lag).sum(),
                partitions,
            }
        })
        .collect()
}
