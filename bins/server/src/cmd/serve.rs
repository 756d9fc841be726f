use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use browse_api::{LogStore, NewTopic};
use browse_engine::RecordBrowser;
use storage_memory::MemoryLogStore;
use topic_api_server::AppState;

use crate::config::{ClusterConfig, ServeArgs, ServerConfig};
use crate::error::ServerError;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(args: ServeArgs) -> Result<(), ServerError> {
    tracing::info!("browse-server starting");

    // --- Load config ---
    let config = ServerConfig::load(&args.config)?;
    tracing::info!(config = %args.config, clusters = config.clusters.len(), "loaded config");

    // --- CancellationToken for graceful shutdown ---
    let token = CancellationToken::new();

    // --- One store + browser per cluster ---
    let mut clusters = HashMap::new();
    for cluster_cfg in &config.clusters {
        let store = MemoryLogStore::new(config.storage.clone());
        seed_topics(&store, cluster_cfg).await?;
        let browser = RecordBrowser::new(Arc::new(store), config.browse.clone());
        clusters.insert(cluster_cfg.name.clone(), Arc::new(browser));
        tracing::info!(
            cluster = %cluster_cfg.name,
            topics = cluster_cfg.topics.len(),
            "registered cluster"
        );
    }

    // --- API server ---
    let state = AppState::new(clusters, token.clone());
    let api_port = config.api_port;
    let api_token = token.clone();
    let mut api_handle = tokio::spawn(async move {
        if let Err(e) = topic_api_server::run(api_port, state, api_token).await {
            tracing::error!(error = %e, "api server error");
        }
    });

    tracing::info!(port = config.api_port, "server ready");

    // --- Wait for Ctrl+C or an early API exit ---
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("shutting down...");
        }
        _ = &mut api_handle => {
            tracing::warn!("api server stopped unexpectedly");
            return Ok(());
        }
    }

    // In-flight requests hold child tokens, so searches stop here.
    token.cancel();

    if tokio::time::timeout(DRAIN_TIMEOUT, &mut api_handle).await.is_err() {
        tracing::warn!(timeout = ?DRAIN_TIMEOUT, "api server did not drain, aborting");
        api_handle.abort();
        let _ = api_handle.await;
    }

    tracing::info!("shutdown complete");
    Ok(())
}

async fn seed_topics(store: &MemoryLogStore, cluster: &ClusterConfig) -> Result<(), ServerError> {
    for topic in &cluster.topics {
        store
            .create_topic(NewTopic {
                name: topic.name.clone(),
                partitions: topic.partitions,
                replication_factor: topic.replication_factor,
                configs: Default::default(),
            })
            .await?;
        for group in &topic.consumer_groups {
            for partition in 0..topic.partitions {
                store.commit_offset(group, &topic.name, partition, 0).await?;
            }
        }
        tracing::info!(
            cluster = %cluster.name,
            topic = %topic.name,
            partitions = topic.partitions,
            groups = topic.consumer_groups.len(),
            "seeded topic"
        );
    }
    Ok(())
}
