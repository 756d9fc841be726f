//! HTTP API over the record browser.
//!
//! Every route is scoped by cluster: `/api/{cluster}/...`. A cluster is one
//! configured [`RecordBrowser`] with its log store.

mod error;
mod http;

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use tokio_util::sync::CancellationToken;

use browse_engine::RecordBrowser;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    clusters: Arc<HashMap<String, Arc<RecordBrowser>>>,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(clusters: HashMap<String, Arc<RecordBrowser>>, shutdown: CancellationToken) -> Self {
        Self {
            clusters: Arc::new(clusters),
            shutdown,
        }
    }

    pub(crate) fn browser(&self, cluster: &str) -> Result<&Arc<RecordBrowser>, ApiError> {
        self.clusters
            .get(cluster)
            .ok_or_else(|| ApiError::ClusterNotFound(cluster.to_string()))
    }

    /// Token for one request; cancelled when the server shuts down.
    pub(crate) fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/{cluster}/topics",
            get(http::handle_list_topics).post(http::handle_create_topic),
        )
        .route("/api/{cluster}/topics/{topic}", delete(http::handle_delete_topic))
        .route("/api/{cluster}/topics/{topic}/partitions", get(http::handle_list_partitions))
        .route("/api/{cluster}/topics/{topic}/groups", get(http::handle_consumer_groups))
        .route("/api/{cluster}/topics/{topic}/data", get(http::handle_topic_data))
        .route("/api/{cluster}/topics/{topic}/produce", post(http::handle_produce))
        .with_state(state)
}

/// Serve the API on `port` until `shutdown` fires.
pub async fn run(port: u16, state: AppState, shutdown: CancellationToken) -> Result<(), String> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|e| format!("bind api :{port}: {e}"))?;
    tracing::info!(port, "topic api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| format!("axum serve: {e}"))?;

    Ok(())
}
