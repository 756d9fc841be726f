use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use browse_api::{LogStore, NewTopic, ProduceRecord};
use browse_engine::{BrowseConfig, RecordBrowser};
use storage_memory::{MemoryLogStore, MemoryStoreConfig};
use topic_api_server::{AppState, router};

async fn setup_test_app() -> (Router, Arc<MemoryLogStore>) {
    let store = Arc::new(MemoryLogStore::new(MemoryStoreConfig::default()));
    store
        .create_topic(NewTopic {
            name: "orders".to_string(),
            partitions: 3,
            replication_factor: 1,
            configs: Default::default(),
        })
        .await
        .unwrap();
    for partition in 0..3u32 {
        for offset in 0..100i64 {
            store
                .produce(
                    "orders",
                    ProduceRecord {
                        partition: Some(partition),
                        timestamp_ms: Some(1_000 + offset * 3 + partition as i64),
                        key: Some(format!("key-{partition}").into_bytes()),
                        value: format!("order {partition}/{offset}").into_bytes(),
                        headers: [("trace".to_string(), b"abc".to_vec())].into(),
                    },
                )
                .await
                .unwrap();
        }
    }

    let browser = RecordBrowser::new(store.clone(), BrowseConfig::default());
    let clusters = HashMap::from([("local".to_string(), Arc::new(browser))]);
    let app = router(AppState::new(clusters, CancellationToken::new()));
    (app, store)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn should_list_topics() {
    // given
    let (app, _store) = setup_test_app().await;

    // when
    let (status, json) = send(app, get("/api/local/topics")).await;

    // then
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        serde_json::json!({ "topics": ["orders"], "total": 1, "page": 1, "page_count": 1 })
    );
}

#[tokio::test]
async fn should_search_and_page_topic_list() {
    // given
    let (app, store) = setup_test_app().await;
    for name in ["orders-dlq", "orders-retry", "payments"] {
        store
            .create_topic(NewTopic {
                name: name.to_string(),
                partitions: 1,
                replication_factor: 1,
                configs: Default::default(),
            })
            .await
            .unwrap();
    }

    // when
    let (status, json) = send(app, get("/api/local/topics?search=orders&page=2&page_size=2")).await;

    // then
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["topics"], serde_json::json!(["orders-retry"]));
    assert_eq!(json["total"], 3);
    assert_eq!(json["page_count"], 2);
}

#[tokio::test]
async fn should_list_consumer_groups_with_lag() {
    // given
    let (app, store) = setup_test_app().await;
    store.commit_offset("billing", "orders", 0, 90).await.unwrap();
    store.commit_offset("billing", "orders", 2, 100).await.unwrap();

    // when
    let (status, json) = send(app, get("/api/local/topics/orders/groups")).await;

    // then
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["group_id"], "billing");
    assert_eq!(json[0]["total_lag"], 10);
    assert_eq!(json[0]["partitions"][1]["partition"], 2);
    assert_eq!(json[0]["partitions"][1]["lag"], 0);
}

#[tokio::test]
async fn should_list_partitions() {
    let (app, _store) = setup_test_app().await;

    let (status, json) = send(app, get("/api/local/topics/orders/partitions")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 3);
    assert_eq!(json[1]["partition"], 1);
    assert_eq!(json[1]["latest_offset"], 100);
    assert_eq!(json[1]["size"], 100);
}

#[tokio::test]
async fn should_return_first_page_of_topic_data() {
    // given
    let (app, _store) = setup_test_app().await;

    // when
    let (status, json) = send(app, get("/api/local/topics/orders/data?page_size=50")).await;

    // then
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["records"].as_array().unwrap().len(), 50);
    assert_eq!(json["record_count"], 300);
    assert_eq!(json["page_count"], 6);
    assert_eq!(json["cursor"], "0-17_1-17_2-16");
    assert_eq!(json["search"], false);
    let first = &json["records"][0];
    assert_eq!(first["key"], "key-0");
    assert_eq!(first["value"], "order 0/0");
    assert_eq!(first["headers"]["trace"], "YWJj");
}

#[tokio::test]
async fn should_follow_cursor_and_filter() {
    let (app, _store) = setup_test_app().await;

    let (status, json) = send(
        app,
        get("/api/local/topics/orders/data?partition=1&sort=newest_first&after=1-10&page_size=5"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let offsets: Vec<u64> = json["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["offset"].as_u64().unwrap())
        .collect();
    assert_eq!(offsets, vec![9, 8, 7, 6, 5]);
    assert_eq!(json["cursor"], "1-5");
}

#[tokio::test]
async fn should_search_topic_data() {
    let (app, _store) = setup_test_app().await;

    let (status, json) = send(app, get("/api/local/topics/orders/data?search=order%202%2F42")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["search"], true);
    assert_eq!(json["search_cancelled"], false);
    assert_eq!(json["records"][0]["partition"], 2);
    assert_eq!(json["records"][0]["offset"], 42);
}

#[tokio::test]
async fn should_map_errors_to_status_codes() {
    let cases = [
        ("/api/remote/topics", StatusCode::NOT_FOUND),
        ("/api/local/topics/missing/data", StatusCode::NOT_FOUND),
        ("/api/local/topics/orders/data?partition=9", StatusCode::BAD_REQUEST),
        ("/api/local/topics/orders/data?after=garbage", StatusCode::BAD_REQUEST),
        ("/api/local/topics/orders/data?timestamp=yesterday", StatusCode::BAD_REQUEST),
        ("/api/local/topics/orders/data?sort=sideways", StatusCode::BAD_REQUEST),
        ("/api/local/topics/orders/data?page_size=0", StatusCode::BAD_REQUEST),
        ("/api/local/topics/orders/data?partition=abc", StatusCode::BAD_REQUEST),
        ("/api/local/topics/orders/data?page_size=lots", StatusCode::BAD_REQUEST),
        ("/api/local/topics?page=0", StatusCode::BAD_REQUEST),
        ("/api/local/topics?page_size=-1", StatusCode::BAD_REQUEST),
        ("/api/local/topics?view=odd", StatusCode::BAD_REQUEST),
        ("/api/local/topics/missing/groups", StatusCode::NOT_FOUND),
    ];

    for (uri, expected) in cases {
        let (app, _store) = setup_test_app().await;
        let (status, json) = send(app, get(uri)).await;
        assert_eq!(status, expected, "{uri}");
        assert!(json["error"].is_string(), "{uri}");
    }
}

#[tokio::test]
async fn should_create_produce_and_delete_topic() {
    // given
    let (app, store) = setup_test_app().await;

    // when
    let (created, _) = send(
        app.clone(),
        post_json(
            "/api/local/topics",
            serde_json::json!({ "name": "audit", "partitions": 2, "retention_ms": 60000, "cleanup_policy": "compact" }),
        ),
    )
    .await;
    let (produced, json) = send(
        app.clone(),
        post_json(
            "/api/local/topics/audit/produce",
            serde_json::json!({
                "key": "user-1",
                "value": "login",
                "headers": { "source": "web" },
                "partition": 1,
                "timestamp": "2024-05-01T10:00:00Z"
            }),
        ),
    )
    .await;

    // then
    assert_eq!(created, StatusCode::CREATED);
    assert_eq!(produced, StatusCode::OK);
    assert_eq!(json["partition"], 1);
    assert_eq!(json["offset"], 0);
    let records = store.read_window("audit", 1, 0, 10).await.unwrap();
    assert_eq!(records[0].timestamp_ms, 1_714_557_600_000);
    assert_eq!(records[0].value, b"login");

    // when
    let delete = Request::builder()
        .method("DELETE")
        .uri("/api/local/topics/audit")
        .body(Body::empty())
        .unwrap();
    let (deleted, _) = send(app.clone(), delete).await;

    // then
    assert_eq!(deleted, StatusCode::NO_CONTENT);
    assert_eq!(store.list_topics().await.unwrap(), vec!["orders".to_string()]);
}

#[tokio::test]
async fn should_treat_blank_key_and_timestamp_as_absent() {
    // given
    let (app, store) = setup_test_app().await;
    let before = browse_api::now_ms();

    // when
    let (status, json) = send(
        app,
        post_json(
            "/api/local/topics/orders/produce",
            serde_json::json!({ "key": "", "value": "x", "timestamp": "", "partition": 0 }),
        ),
    )
    .await;

    // then
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["offset"], 100);
    let records = store.read_window("orders", 0, 100, 1).await.unwrap();
    assert_eq!(records[0].key, None);
    assert!(records[0].timestamp_ms >= before);
}

#[tokio::test]
async fn should_reject_duplicate_topic() {
    let (app, _store) = setup_test_app().await;

    let (status, _) = send(
        app,
        post_json("/api/local/topics", serde_json::json!({ "name": "orders", "partitions": 1 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
