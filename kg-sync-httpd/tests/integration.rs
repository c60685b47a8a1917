use axum::body::Body;
use kg_sync_httpd::config_file::{QueryFileConfig, TypeFileConfig};
use kg_sync_httpd::{routes::build_router, AppState, ServerConfig};
use kg_sync_protocol::{index, Stage};
use kg_sync_service::{MemoryDocumentStore, MemoryGraphSource};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tower::ServiceExt;

fn type_config(name: &str, query_id: &str, auto_release: bool) -> TypeFileConfig {
    TypeFileConfig {
        name: name.to_string(),
        source_type: None,
        queries: vec![QueryFileConfig {
            id: query_id.to_string(),
            semantic_type: format!("https://openminds.ebrains.eu/core/{}", name),
        }],
        query_template: Some(r#"{"type": "${type}"}"#.to_string()),
        auto_release,
        bulk_size: Some(2),
        searchable: Some("/searchable".to_string()),
        mapping: None,
    }
}

struct TestApp {
    graph: Arc<MemoryGraphSource>,
    store: Arc<MemoryDocumentStore>,
    state: Arc<AppState>,
}

fn test_app() -> TestApp {
    let config = ServerConfig {
        memory_store: true,
        types: vec![
            type_config("Dataset", "q-dataset", false),
            type_config("ControlledTerm", "q-term", true),
        ],
        ..Default::default()
    };
    let graph = Arc::new(MemoryGraphSource::new());
    let store = Arc::new(MemoryDocumentStore::new());
    let state = Arc::new(
        AppState::with_backends(config, graph.clone(), store.clone()).expect("AppState"),
    );
    TestApp {
        graph,
        store,
        state,
    }
}

async fn send(app: &TestApp, method: &str, uri: &str, body: Body) -> http::Response<Body> {
    build_router(app.state.clone())
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_bytes(resp: http::Response<Body>) -> Vec<u8> {
    resp.into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes()
        .to_vec()
}

async fn json_body(resp: http::Response<Body>) -> (StatusCode, JsonValue) {
    let status = resp.status();
    let bytes = body_bytes(resp).await;
    let json: JsonValue = serde_json::from_slice(&bytes).expect("valid JSON response");
    (status, json)
}

fn stored_ids(store: &MemoryDocumentStore, index: &str) -> Vec<String> {
    store.documents(index).into_iter().map(|(id, _)| id).collect()
}

#[tokio::test]
async fn health_check_ok() {
    let app = test_app();
    let resp = send(&app, "GET", "/health", Body::empty()).await;

    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.get("status").and_then(|v| v.as_str()), Some("ok"));
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
    assert_eq!(json.get("target_types").and_then(|v| v.as_u64()), Some(2));
}

#[tokio::test]
async fn incremental_update_indexes_documents() {
    let app = test_app();
    app.graph.set_records(
        "q-dataset",
        Stage::Released,
        vec![
            json!({"id": "a", "searchable": true}),
            json!({"id": "b", "searchable": true}),
            json!({"id": "c", "searchable": false}),
        ],
    );

    let resp = send(&app, "PUT", "/indexing?databaseScope=RELEASED", Body::empty()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_bytes(resp).await.is_empty());

    assert_eq!(
        stored_ids(&app.store, &index::search_index(Stage::Released, "Dataset", false)),
        vec!["a", "b"]
    );
    assert_eq!(
        stored_ids(&app.store, &index::identifiers_index(Stage::Released)),
        vec!["c"]
    );
}

#[tokio::test]
async fn full_replacement_of_one_category() {
    let app = test_app();
    app.graph.set_records(
        "q-dataset",
        Stage::InProgress,
        vec![json!({"id": "a", "searchable": true})],
    );

    let resp = send(
        &app,
        "POST",
        "/indexing/categories/dataset?databaseScope=IN_PROGRESS",
        Body::empty(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        stored_ids(&app.store, &index::search_index(Stage::InProgress, "Dataset", false)),
        vec!["a"]
    );
    assert!(app
        .store
        .index_names()
        .iter()
        .all(|name| !name.starts_with("temporary_")));
}

#[tokio::test]
async fn auto_release_endpoint_only_touches_auto_released_types() {
    let app = test_app();
    app.graph
        .set_records("q-term", Stage::Released, vec![json!({"id": "t1"})]);
    app.graph.set_records(
        "q-dataset",
        Stage::Released,
        vec![json!({"id": "a", "searchable": true})],
    );

    let resp = send(&app, "POST", "/indexing/autorelease?databaseScope=RELEASED", Body::empty()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        stored_ids(
            &app.store,
            &index::auto_released_index(Stage::Released, "ControlledTerm", false)
        ),
        vec!["t1"]
    );
    assert!(app
        .graph
        .requests()
        .iter()
        .all(|request| request.query_id == "q-term"));
}

#[tokio::test]
async fn bad_or_missing_scope_is_rejected() {
    let app = test_app();

    let resp = send(&app, "PUT", "/indexing?databaseScope=DRAFT", Body::empty()).await;
    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("DRAFT"));

    let resp = send(&app, "PUT", "/indexing", Body::empty()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_category_is_not_found() {
    let app = test_app();
    let resp = send(
        &app,
        "PUT",
        "/indexing/categories/Model?databaseScope=RELEASED",
        Body::empty(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn record_errors_return_report() {
    let app = test_app();
    app.graph.set_records(
        "q-dataset",
        Stage::Released,
        vec![
            json!({"id": "a", "searchable": true}),
            json!({"id": "broken", "issueDate": "not a date"}),
        ],
    );

    let resp = send(&app, "PUT", "/indexing?databaseScope=RELEASED", Body::empty()).await;
    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let by_target = &json["errorsByTarget"][0];
    assert_eq!(by_target["targetType"], json!("Dataset"));
    assert_eq!(by_target["errorsBySource"][0]["sourceType"], json!("Dataset"));
    assert!(by_target["errorsBySource"][0]["errors"]["broken"].is_array());
}

#[tokio::test]
async fn upstream_status_is_passed_through() {
    let app = test_app();
    app.graph.fail_query("q-dataset", 503);

    let resp = send(&app, "PUT", "/indexing?databaseScope=RELEASED", Body::empty()).await;
    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], json!(503));
}

#[tokio::test]
async fn resources_can_be_stored_and_removed() {
    let app = test_app();
    let resource = json!({"title": "Terms of use", "body": "..."});

    let resp = send(
        &app,
        "PUT",
        "/indexing/resources/terms",
        Body::from(resource.to_string()),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        app.store.documents(index::RESOURCES_INDEX),
        vec![("terms".to_string(), resource.clone())]
    );

    let resp = send(&app, "GET", "/indexing/resources/terms", Body::empty()).await;
    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, resource);

    let resp = send(&app, "DELETE", "/indexing/resources/terms", Body::empty()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(app.store.documents(index::RESOURCES_INDEX).is_empty());

    let resp = send(&app, "GET", "/indexing/resources/terms", Body::empty()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&app, "DELETE", "/indexing/resources/terms", Body::empty()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn queries_are_uploaded() {
    let app = test_app();
    let resp = send(&app, "POST", "/indexing/queries", Body::empty()).await;

    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["uploaded"], json!(2));

    let mut uploads = app.graph.uploads();
    uploads.sort();
    assert_eq!(uploads[0].0, "q-dataset");
    assert_eq!(
        uploads[0].1,
        r#"{"type": "https://openminds.ebrains.eu/core/Dataset"}"#
    );
    assert_eq!(uploads[1].0, "q-term");
}
