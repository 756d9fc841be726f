use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use browse_api::{CleanupPolicy, NewTopic, Offset, PartitionId, PartitionInfo, ProduceRecord, Record, SortOrder};
use browse_engine::{BrowseRequest, GroupLag, PageResult, TopicListQuery, TopicListView, TopicPage};

use super::AppState;
use crate::error::ApiError;

/// Parse an optional query value. Blank counts as absent; anything else
/// that fails to parse is a 400 with the usual JSON error body.
fn parse_param<T>(name: &str, raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e| ApiError::BadRequest(format!("invalid {name} '{value}': {e}"))),
    }
}

// ═══════════════════════════════════════════════════════════════
//  REST: GET /api/{cluster}/topics?search=&view=&page=&page_size=
// ═══════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub(crate) struct TopicListParams {
    search: Option<String>,
    view: Option<String>,
    page: Option<String>,
    page_size: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct TopicPageView {
    topics: Vec<String>,
    total: u64,
    page: usize,
    page_count: u64,
}

impl From<TopicPage> for TopicPageView {
    fn from(page: TopicPage) -> Self {
        Self {
            topics: page.topics,
            total: page.total,
            page: page.page,
            page_count: page.page_count,
        }
    }
}

pub(crate) async fn handle_list_topics(
    State(state): State<AppState>,
    Path(cluster): Path<String>,
    Query(params): Query<TopicListParams>,
) -> Result<Json<TopicPageView>, ApiError> {
    let browser = state.browser(&cluster)?;
    let query = TopicListQuery {
        search: params.search,
        view: parse_param::<TopicListView>("view", params.view.as_deref())?.unwrap_or_default(),
        page: parse_param("page", params.page.as_deref())?.unwrap_or(1),
        page_size: parse_param("page_size", params.page_size.as_deref())?,
    };
    let page = browser.list_topics(&query).await?;
    Ok(Json(TopicPageView::from(page)))
}

// ═══════════════════════════════════════════════════════════════
//  REST: GET /api/{cluster}/topics/{topic}/partitions
// ═══════════════════════════════════════════════════════════════

#[derive(Serialize)]
pub(crate) struct PartitionView {
    partition: PartitionId,
    earliest_offset: Offset,
    latest_offset: Offset,
    size: u64,
}

impl From<&PartitionInfo> for PartitionView {
    fn from(info: &PartitionInfo) -> Self {
        Self {
            partition: info.index,
            earliest_offset: info.earliest_offset,
            latest_offset: info.latest_offset,
            size: info.size(),
        }
    }
}

pub(crate) async fn handle_list_partitions(
    State(state): State<AppState>,
    Path((cluster, topic)): Path<(String, String)>,
) -> Result<Json<Vec<PartitionView>>, ApiError> {
    let snapshot = state.browser(&cluster)?.describe(&topic).await?;
    Ok(Json(snapshot.partitions.iter().map(PartitionView::from).collect()))
}

// ═══════════════════════════════════════════════════════════════
//  REST: GET /api/{cluster}/topics/{topic}/groups
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_consumer_groups(
    State(state): State<AppState>,
    Path((cluster, topic)): Path<(String, String)>,
) -> Result<Json<Vec<GroupLag>>, ApiError> {
    let groups = state.browser(&cluster)?.consumer_groups(&topic).await?;
    Ok(Json(groups))
}

// ═══════════════════════════════════════════════════════════════
//  REST: GET /api/{cluster}/topics/{topic}/data?after=&partition=&sort=&timestamp=&search=&page_size=
// ═══════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub(crate) struct DataParams {
    after: Option<String>,
    partition: Option<String>,
    sort: Option<String>,
    timestamp: Option<String>,
    search: Option<String>,
    page_size: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct RecordView {
    partition: PartitionId,
    offset: Offset,
    timestamp: i64,
    key: Option<String>,
    value: String,
    headers: BTreeMap<String, String>,
}

impl From<Record> for RecordView {
    fn from(record: Record) -> Self {
        Self {
            partition: record.partition,
            offset: record.offset,
            timestamp: record.timestamp_ms,
            key: record.key.map(|k| String::from_utf8_lossy(&k).into_owned()),
            value: String::from_utf8_lossy(&record.value).into_owned(),
            headers: record
                .headers
                .into_iter()
                .map(|(name, value)| (name, STANDARD.encode(value)))
                .collect(),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct PageView {
    records: Vec<RecordView>,
    cursor: String,
    record_count: u64,
    page_count: u64,
    search: bool,
    search_cancelled: bool,
}

impl From<PageResult> for PageView {
    fn from(page: PageResult) -> Self {
        Self {
            cursor: page.cursor.encode(),
            records: page.records.into_iter().map(RecordView::from).collect(),
            record_count: page.record_count,
            page_count: page.page_count,
            search: page.search,
            search_cancelled: page.search_cancelled,
        }
    }
}

pub(crate) async fn handle_topic_data(
    State(state): State<AppState>,
    Path((cluster, topic)): Path<(String, String)>,
    Query(params): Query<DataParams>,
) -> Result<Json<PageView>, ApiError> {
    let browser = state.browser(&cluster)?;
    let request = BrowseRequest {
        cluster,
        topic,
        after: params.after,
        partition: parse_param::<PartitionId>("partition", params.partition.as_deref())?,
        sort: parse_param::<SortOrder>("sort", params.sort.as_deref())?,
        timestamp: params.timestamp,
        search: params.search,
        page_size: parse_param("page_size", params.page_size.as_deref())?,
    };
    let page = browser.browse(request, &state.request_token()).await?;
    Ok(Json(PageView::from(page)))
}

// ═══════════════════════════════════════════════════════════════
//  REST: POST /api/{cluster}/topics
// ═══════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub(crate) struct CreateTopicBody {
    name: String,
    partitions: u32,
    #[serde(default = "default_replication_factor")]
    replication_factor: u16,
    retention_ms: Option<i64>,
    cleanup_policy: Option<CleanupPolicy>,
}

fn default_replication_factor() -> u16 {
    1
}

pub(crate) async fn handle_create_topic(
    State(state): State<AppState>,
    Path(cluster): Path<String>,
    Json(body): Json<CreateTopicBody>,
) -> Result<impl IntoResponse, ApiError> {
    let browser = state.browser(&cluster)?;
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("topic name must not be empty".to_string()));
    }

    let mut configs = BTreeMap::new();
    if let Some(retention_ms) = body.retention_ms {
        configs.insert("retention.ms".to_string(), retention_ms.to_string());
    }
    if let Some(policy) = body.cleanup_policy {
        configs.insert("cleanup.policy".to_string(), policy.to_string());
    }

    let name = body.name.clone();
    browser
        .store()
        .create_topic(NewTopic {
            name: body.name,
            partitions: body.partitions,
            replication_factor: body.replication_factor,
            configs,
        })
        .await?;
    tracing::info!(cluster = %cluster, topic = %name, partitions = body.partitions, "topic created");
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "name": name }))))
}

// ═══════════════════════════════════════════════════════════════
//  REST: DELETE /api/{cluster}/topics/{topic}
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_delete_topic(
    State(state): State<AppState>,
    Path((cluster, topic)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.browser(&cluster)?.store().delete_topic(&topic).await?;
    tracing::info!(cluster = %cluster, topic = %topic, "topic deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ═══════════════════════════════════════════════════════════════
//  REST: POST /api/{cluster}/topics/{topic}/produce
// ═══════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub(crate) struct ProduceBody {
    /// Blank counts as no key.
    key: Option<String>,
    #[serde(default)]
    value: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    partition: Option<PartitionId>,
    /// ISO-8601; absent or blank defaults to the store's clock.
    timestamp: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct Produced {
    partition: PartitionId,
    offset: Offset,
}

pub(crate) async fn handle_produce(
    State(state): State<AppState>,
    Path((cluster, topic)): Path<(String, String)>,
    Json(body): Json<ProduceBody>,
) -> Result<Json<Produced>, ApiError> {
    let browser = state.browser(&cluster)?;
    let timestamp_ms = body
        .timestamp
        .as_deref()
        .filter(|ts| !ts.trim().is_empty())
        .map(|ts| {
            chrono::DateTime::parse_from_rfc3339(ts.trim())
                .map(|dt| dt.timestamp_millis())
                .map_err(|e| ApiError::BadRequest(format!("invalid timestamp '{ts}': {e}")))
        })
        .transpose()?;

    let record = ProduceRecord {
        partition: body.partition,
        timestamp_ms,
        key: body.key.filter(|k| !k.trim().is_empty()).map(String::into_bytes),
        value: body.value.into_bytes(),
        headers: body
            .headers
            .into_iter()
            .map(|(name, value)| (name, value.into_bytes()))
            .collect(),
    };
    let (partition, offset) = browser.store().produce(&topic, record).await?;
    tracing::debug!(cluster = %cluster, topic = %topic, partition, offset, "record produced");
    Ok(Json(Produced { partition, offset }))
}
