use std::time::Duration;

use serde::Deserialize;

use browse_api::SortOrder;

/// Engine settings. Usually the `[browse]` table of the server config.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowseConfig {
    /// Records per page when the request does not say.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Sort direction when the request does not say.
    #[serde(default)]
    pub default_sort: SortOrder,

    /// Upper bound on one search request. On expiry the partial result is
    /// returned, flagged as cancelled.
    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,

    /// Topic names per page of the topic list.
    #[serde(default = "default_topic_page_size")]
    pub topic_page_size: usize,

    /// Upper bound on a single store read. On expiry the request fails with
    /// `ReadTimeout`.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

fn default_page_size() -> usize {
    50
}

fn default_topic_page_size() -> usize {
    25
}

fn default_search_timeout_ms() -> u64 {
    30_000
}

fn default_read_timeout_ms() -> u64 {
    10_000
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            default_sort: SortOrder::default(),
            search_timeout_ms: default_search_timeout_ms(),
            topic_page_size: default_topic_page_size(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl BrowseConfig {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_fill_defaults_for_missing_fields() {
        // given
        let toml_str = r#"
            default_sort = "newest_first"
            search_timeout_ms = 500
        "#;

        // when
        let config: BrowseConfig = toml::from_str(toml_str).unwrap();

        // then
        assert_eq!(config.page_size, 50);
        assert_eq!(config.topic_page_size, 25);
        assert_eq!(config.default_sort, SortOrder::NewestFirst);
        assert_eq!(config.search_timeout(), Duration::from_millis(500));
        assert_eq!(config.read_timeout(), Duration::from_secs(10));
    }
}
