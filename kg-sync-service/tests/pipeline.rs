//! End-to-end runs of the synchronization pipeline against the in-memory
//! graph source and document store.

use kg_sync_protocol::{index, Badge, SourcePage, Stage};
use kg_sync_service::{
    HttpGraphClient, JsonTranslator, MemoryDocumentStore, MemoryGraphSource, QueryDefinition,
    SyncConfig, SyncError, SyncService, TranslatorRegistration, TranslatorRegistry, TypeFilter,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn translator(source_type: &str, query_id: &str) -> JsonTranslator {
    JsonTranslator::new(
        source_type,
        vec![QueryDefinition {
            query_id: query_id.to_string(),
            semantic_type: format!("https://openminds.ebrains.eu/core/{}", source_type),
        }],
    )
    .with_searchable_pointer("/searchable")
}

fn dataset_registry(bulk_size: u64) -> Arc<TranslatorRegistry> {
    Arc::new(
        TranslatorRegistry::new(vec![TranslatorRegistration::new(
            "Dataset",
            Arc::new(translator("DatasetVersion", "q-dataset")),
        )
        .with_bulk_size(bulk_size)])
        .expect("registry"),
    )
}

fn service(
    registry: Arc<TranslatorRegistry>,
) -> (Arc<MemoryGraphSource>, Arc<MemoryDocumentStore>, SyncService) {
    let graph = Arc::new(MemoryGraphSource::new());
    let store = Arc::new(MemoryDocumentStore::new());
    let service = SyncService::new(graph.clone(), store.clone(), registry, &SyncConfig::default());
    (graph, store, service)
}

fn searchable(ids: &[&str]) -> Vec<Value> {
    ids.iter()
        .map(|id| json!({"id": id, "title": format!("Dataset {}", id), "searchable": true}))
        .collect()
}

fn stored_ids(store: &MemoryDocumentStore, index: &str) -> Vec<String> {
    store.documents(index).into_iter().map(|(id, _)| id).collect()
}

fn released_dataset_index() -> String {
    index::search_index(Stage::Released, "Dataset", false)
}

#[tokio::test]
async fn pages_are_fetched_in_order_until_total() {
    let (graph, store, service) = service(dataset_registry(2));
    graph.set_records("q-dataset", Stage::Released, searchable(&["a", "b", "c", "d", "e"]));

    service
        .incremental_update(Stage::Released, TypeFilter::NonAutoReleased)
        .await
        .unwrap();

    let offsets: Vec<u64> = graph.requests().iter().map(|r| r.from).collect();
    assert_eq!(offsets, vec![0, 2, 4]);
    assert!(graph.requests().iter().all(|r| r.size == 2));
    assert_eq!(
        stored_ids(&store, &released_dataset_index()),
        vec!["a", "b", "c", "d", "e"]
    );
}

#[tokio::test]
async fn missing_total_stops_after_first_page() {
    let (graph, store, service) = service(dataset_registry(2));
    graph.set_records("q-dataset", Stage::Released, searchable(&["a", "b", "c"]));
    graph.omit_total(true);

    service
        .incremental_update(Stage::Released, TypeFilter::NonAutoReleased)
        .await
        .unwrap();

    assert_eq!(graph.requests().len(), 1);
    assert_eq!(stored_ids(&store, &released_dataset_index()), vec!["a", "b"]);
}

fn page(ids: &[&str], total: Option<u64>, from: u64, size: u64) -> SourcePage {
    SourcePage {
        data: searchable(ids),
        total,
        from: Some(from),
        size: Some(size),
    }
}

#[tokio::test]
async fn last_total_is_kept_when_later_pages_omit_it() {
    let (graph, store, service) = service(dataset_registry(2));
    graph.script_pages(
        "q-dataset",
        Stage::Released,
        vec![
            page(&["a", "b"], Some(5), 0, 2),
            page(&["c", "d"], None, 2, 2),
            page(&["e"], None, 4, 1),
        ],
    );

    service
        .incremental_update(Stage::Released, TypeFilter::NonAutoReleased)
        .await
        .unwrap();

    let offsets: Vec<u64> = graph.requests().iter().map(|r| r.from).collect();
    assert_eq!(offsets, vec![0, 2, 4]);
    assert_eq!(
        stored_ids(&store, &released_dataset_index()),
        vec!["a", "b", "c", "d", "e"]
    );
}

#[tokio::test]
async fn page_that_does_not_advance_stops_the_query() {
    let (graph, store, service) = service(dataset_registry(2));
    graph.script_pages(
        "q-dataset",
        Stage::Released,
        vec![page(&["a", "b"], Some(10), 0, 0)],
    );

    service
        .incremental_update(Stage::Released, TypeFilter::NonAutoReleased)
        .await
        .unwrap();

    assert_eq!(graph.requests().len(), 1);
    assert_eq!(stored_ids(&store, &released_dataset_index()), vec!["a", "b"]);
}

#[tokio::test]
async fn overflowing_page_window_stops_the_query() {
    let (graph, store, service) = service(dataset_registry(5));
    graph.script_pages(
        "q-dataset",
        Stage::Released,
        vec![page(&["a"], Some(u64::MAX), u64::MAX - 1, 5)],
    );

    service
        .incremental_update(Stage::Released, TypeFilter::NonAutoReleased)
        .await
        .unwrap();

    assert_eq!(graph.requests().len(), 1);
    assert_eq!(stored_ids(&store, &released_dataset_index()), vec!["a"]);
}

#[tokio::test]
async fn every_query_of_a_type_is_paged_and_kept() {
    let translator = JsonTranslator::new(
        "DatasetVersion",
        vec![
            QueryDefinition {
                query_id: "q-versions".to_string(),
                semantic_type: "https://openminds.ebrains.eu/core/DatasetVersion".to_string(),
            },
            QueryDefinition {
                query_id: "q-legacy".to_string(),
                semantic_type: "https://openminds.ebrains.eu/core/Dataset".to_string(),
            },
        ],
    )
    .with_searchable_pointer("/searchable");
    let registry = Arc::new(
        TranslatorRegistry::new(vec![
            TranslatorRegistration::new("Dataset", Arc::new(translator)).with_bulk_size(2)
        ])
        .expect("registry"),
    );
    let (graph, store, service) = service(registry);
    store.put_document(
        &released_dataset_index(),
        "gone",
        json!({"id": "gone", "type": {"value": "Dataset"}}),
    );
    graph.set_records("q-versions", Stage::Released, searchable(&["a", "b", "c"]));
    graph.set_records("q-legacy", Stage::Released, searchable(&["d"]));

    service
        .incremental_update(Stage::Released, TypeFilter::NonAutoReleased)
        .await
        .unwrap();

    let requests: Vec<(String, u64)> = graph
        .requests()
        .into_iter()
        .map(|r| (r.query_id, r.from))
        .collect();
    assert_eq!(
        requests,
        vec![
            ("q-versions".to_string(), 0),
            ("q-versions".to_string(), 2),
            ("q-legacy".to_string(), 0),
        ]
    );
    assert_eq!(
        stored_ids(&store, &released_dataset_index()),
        vec!["a", "b", "c", "d"]
    );
}

#[tokio::test]
async fn repeated_incremental_runs_are_idempotent() {
    let (graph, store, service) = service(dataset_registry(10));
    graph.set_records("q-dataset", Stage::Released, searchable(&["a", "b"]));

    service
        .incremental_update(Stage::Released, TypeFilter::NonAutoReleased)
        .await
        .unwrap();
    let first = store.documents(&released_dataset_index());
    service
        .incremental_update(Stage::Released, TypeFilter::NonAutoReleased)
        .await
        .unwrap();

    assert_eq!(store.documents(&released_dataset_index()), first);
}

#[tokio::test]
async fn records_gone_upstream_are_removed() {
    let (graph, store, service) = service(dataset_registry(10));
    graph.set_records("q-dataset", Stage::Released, searchable(&["a", "b", "c"]));
    service
        .incremental_update(Stage::Released, TypeFilter::NonAutoReleased)
        .await
        .unwrap();

    graph.set_records("q-dataset", Stage::Released, searchable(&["a", "b"]));
    service
        .incremental_update(Stage::Released, TypeFilter::NonAutoReleased)
        .await
        .unwrap();

    assert_eq!(stored_ids(&store, &released_dataset_index()), vec!["a", "b"]);
}

#[tokio::test]
async fn full_replacement_cuts_over_and_drops_temporary_index() {
    let (graph, store, service) = service(dataset_registry(10));
    store.put_document(
        &released_dataset_index(),
        "stale",
        json!({"id": "stale", "type": {"value": "Dataset"}}),
    );
    graph.set_records("q-dataset", Stage::Released, searchable(&["a", "b"]));

    let report = service
        .full_replacement(Stage::Released, TypeFilter::NonAutoReleased)
        .await
        .unwrap();

    assert!(report.is_empty());
    assert_eq!(stored_ids(&store, &released_dataset_index()), vec!["a", "b"]);
    assert!(store
        .index_names()
        .iter()
        .all(|name| !name.starts_with("temporary_")));
    assert!(store
        .index_names()
        .contains(&index::identifiers_index(Stage::Released)));
}

#[tokio::test]
async fn dangling_references_are_cleared() {
    let (graph, store, service) = service(dataset_registry(10));
    store.put_document(
        &index::identifiers_index(Stage::Released),
        "person-1",
        json!({"identifier": ["person-1"]}),
    );
    graph.set_records(
        "q-dataset",
        Stage::Released,
        vec![json!({
            "id": "a",
            "searchable": true,
            "custodian": {"reference": "person-1", "value": "Jane"},
            "contributors": [{"reference": "person-2", "value": "John"}]
        })],
    );

    service
        .incremental_update(Stage::Released, TypeFilter::NonAutoReleased)
        .await
        .unwrap();

    let (_, doc) = store.documents(&released_dataset_index()).remove(0);
    assert_eq!(doc["custodian"]["reference"], json!("person-1"));
    assert_eq!(doc["contributors"][0]["reference"], Value::Null);
    assert_eq!(doc["contributors"][0]["value"], json!("John"));
}

#[tokio::test]
async fn trending_badge_follows_current_view_counts() {
    let (graph, store, service) = service(dataset_registry(10));
    for (i, views) in [50u64, 50, 20, 20, 5, 1].iter().enumerate() {
        store.put_document(
            &released_dataset_index(),
            &format!("old-{}", i),
            json!({"last30DaysViews": views}),
        );
    }
    graph.set_records(
        "q-dataset",
        Stage::Released,
        vec![
            json!({"id": "hot", "searchable": true, "last30DaysViews": 25}),
            json!({"id": "cold", "searchable": true, "last30DaysViews": 19}),
        ],
    );

    service
        .incremental_update(Stage::Released, TypeFilter::NonAutoReleased)
        .await
        .unwrap();

    let docs = store.documents(&released_dataset_index());
    let badges = |id: &str| {
        docs.iter()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(_, doc)| doc["badges"].clone())
            .unwrap()
    };
    assert_eq!(badges("hot"), json!(["isTrending"]));
    assert_eq!(badges("cold"), json!([]));

    let published = graph.published_badges();
    assert_eq!(published.len(), 1);
    assert_eq!(
        published[0].1.holders(Badge::IsTrending).collect::<Vec<_>>(),
        vec!["hot"]
    );
}

#[tokio::test]
async fn record_errors_are_grouped_by_type() {
    let registry = Arc::new(
        TranslatorRegistry::new(vec![
            TranslatorRegistration::new(
                "Dataset",
                Arc::new(translator("DatasetVersion", "q-dataset")),
            ),
            TranslatorRegistration::new("Model", Arc::new(translator("ModelVersion", "q-model"))),
        ])
        .unwrap(),
    );
    let (graph, store, service) = service(registry);
    graph.set_records(
        "q-dataset",
        Stage::InProgress,
        vec![
            json!({"id": "ok", "searchable": true}),
            json!({"id": "broken", "firstRelease": "yesterday"}),
        ],
    );
    graph.set_records("q-model", Stage::InProgress, searchable(&["m1"]));

    let report = service
        .incremental_update(Stage::InProgress, TypeFilter::NonAutoReleased)
        .await
        .unwrap();

    assert_eq!(report.errors_by_target.len(), 1);
    let dataset = &report.errors_by_target[0];
    assert_eq!(dataset.target_type, "Dataset");
    assert_eq!(dataset.errors_by_source[0].source_type, "DatasetVersion");
    assert!(dataset.errors_by_source[0].errors.get("broken").is_some());
    assert_eq!(
        stored_ids(&store, &index::search_index(Stage::InProgress, "Model", false)),
        vec!["m1"]
    );
}

#[tokio::test]
async fn transport_failure_aborts_with_upstream_status() {
    let (graph, _store, service) = service(dataset_registry(10));
    graph.fail_query("q-dataset", 503);

    let err = service
        .full_replacement(Stage::Released, TypeFilter::Type("dataset".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Graph { .. }));
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn sync_over_http_graph_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/queries/q-dataset/instances"))
        .and(query_param("stage", "RELEASED"))
        .and(query_param("from", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "https://kg.ebrains.eu/api/instances/a", "searchable": true}],
            "total": 1,
            "from": 0,
            "size": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let graph = Arc::new(
        HttpGraphClient::new(server.uri(), None, "kg-search", Duration::from_secs(5)).unwrap(),
    );
    let store = Arc::new(MemoryDocumentStore::new());
    let service = SyncService::new(graph, store.clone(), dataset_registry(10), &SyncConfig::default());

    service
        .incremental_update(Stage::Released, TypeFilter::NonAutoReleased)
        .await
        .unwrap();

    assert_eq!(stored_ids(&store, &released_dataset_index()), vec!["a"]);
}
