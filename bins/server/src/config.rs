use std::collections::HashSet;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use browse_engine::BrowseConfig;
use storage_memory::MemoryStoreConfig;

use crate::error::ServerError;

#[derive(Parser)]
#[command(name = "browse-server", about = "Paged record browsing over partitioned topics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API
    Serve(ServeArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Path to the TOML config file
    #[arg(long, default_value = "config.toml", env = "CONFIG_PATH")]
    pub config: String,
}

// ---- TOML Config ----

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default)]
    pub browse: BrowseConfig,
    /// Applied to the in-memory store of every cluster.
    #[serde(default)]
    pub storage: MemoryStoreConfig,
    #[serde(default)]
    pub clusters: Vec<ClusterConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ClusterConfig {
    pub name: String,
    /// Created at startup.
    #[serde(default)]
    pub topics: Vec<TopicConfig>,
}

#[derive(Debug, Deserialize)]
pub struct TopicConfig {
    pub name: String,
    #[serde(default = "default_partitions")]
    pub partitions: u32,
    #[serde(default = "default_replication_factor")]
    pub replication_factor: u16,
    /// Consumer groups registered at offset 0 on every partition.
    #[serde(default)]
    pub consumer_groups: Vec<String>,
}

fn default_api_port() -> u16 {
    9200
}
fn default_partitions() -> u32 {
    1
}
fn default_replication_factor() -> u16 {
    1
}

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ServerError::Config { context: "parse", detail: format!("'{path}': {e}") })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ServerError> {
        if self.clusters.is_empty() {
            return Err(ServerError::NoComponents("[[clusters]]"));
        }
        let mut seen = HashSet::new();
        for cluster in &self.clusters {
            if !seen.insert(cluster.name.as_str()) {
                return Err(ServerError::Config {
                    context: "clusters",
                    detail: format!("cluster '{}' declared twice", cluster.name),
                });
            }
        }
        if self.browse.page_size == 0 {
            return Err(ServerError::Config {
                context: "browse",
                detail: "page_size must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<ServerConfig, ServerError> {
        let config: ServerConfig = toml::from_str(text).unwrap();
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn should_parse_full_config() {
        // given
        let text = r#"
            api_port = 8080

            [browse]
            page_size = 25
            default_sort = "newest_first"

            [storage]
            batch_size = 100

            [[clusters]]
            name = "local"

            [[clusters.topics]]
            name = "orders"
            partitions = 3
            consumer_groups = ["billing"]
        "#;

        // when
        let config = parse(text).unwrap();

        // then
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.browse.page_size, 25);
        assert_eq!(config.browse.default_sort, browse_api::SortOrder::NewestFirst);
        assert_eq!(config.storage.batch_size, 100);
        assert_eq!(config.clusters[0].topics[0].partitions, 3);
        assert_eq!(config.clusters[0].topics[0].replication_factor, 1);
        assert_eq!(config.clusters[0].topics[0].consumer_groups, vec!["billing"]);
    }

    #[test]
    fn should_apply_defaults() {
        let config = parse("[[clusters]]\nname = \"local\"\n").unwrap();

        assert_eq!(config.api_port, 9200);
        assert_eq!(config.browse.page_size, 50);
        assert!(config.clusters[0].topics.is_empty());
    }

    #[test]
    fn should_require_a_cluster() {
        assert!(matches!(parse(""), Err(ServerError::NoComponents(_))));
    }

    #[test]
    fn should_reject_duplicate_clusters() {
        let text = "[[clusters]]\nname = \"a\"\n[[clusters]]\nname = \"a\"\n";

        assert!(matches!(parse(text), Err(ServerError::Config { context: "clusters", .. })));
    }
}
