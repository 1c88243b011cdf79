//! Ingestion and remote retrieval against an in-process fake Qdrant.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use designpack_rag::config::{RetrievalConfig, VectorDbConfig};
use designpack_rag::ingest::{IngestReport, Ingestor};
use designpack_rag::qdrant::QdrantStore;
use designpack_rag::retriever::{Backend, Retriever};
use designpack_rag_core::embedding::FallbackEmbedder;
use designpack_rag_core::models::SourceKind;
use designpack_rag_core::store::PayloadFilter;

const DIMS: usize = 16;

#[derive(Default)]
struct Recorded {
    created: Vec<Value>,
    upserts: Vec<Value>,
    searches: Vec<Value>,
    fail_search: bool,
    scoreless_hit: bool,
    fail_upsert: bool,
}

type Shared = Arc<Mutex<Recorded>>;

async fn get_collection(State(state): State<Shared>) -> impl IntoResponse {
    let s = state.lock().unwrap();
    match s.created.last() {
        Some(body) => (
            StatusCode::OK,
            Json(json!({
                "result": {"status": "green", "config": {"params": body}},
                "status": "ok"
            })),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"status": {"error": "Not found: Collection doesn't exist!"}})),
        ),
    }
}

async fn create_collection(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    state.lock().unwrap().created.push(body);
    Json(json!({"result": true, "status": "ok"}))
}

async fn upsert(State(state): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
    let mut s = state.lock().unwrap();
    if s.fail_upsert {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": {"error": "Wrong input: vector dimension error"}})),
        );
    }
    s.upserts.push(body);
    (
        StatusCode::OK,
        Json(json!({"result": {"operation_id": 1, "status": "completed"}, "status": "ok"})),
    )
}

async fn search(State(state): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
    let mut s = state.lock().unwrap();
    s.searches.push(body);
    if s.fail_search {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"status": {"error": "boom"}})),
        );
    }
    if s.scoreless_hit {
        return (
            StatusCode::OK,
            Json(json!({
                "result": [
                    {"id": 7, "payload": {"uri": "https://x/w", "chunk_index": 0}},
                    {"id": 42, "score": 0.5, "payload": {"uri": "https://x/z", "chunk_index": 3}}
                ],
                "status": "ok"
            })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "result": [
                {"id": 8476652818528089529u64, "version": 3, "score": 0.9,
                 "payload": {"uri": "https://x/y", "chunk_index": 1, "module": "Inbound"}},
                {"id": 42, "version": 1, "score": 0.41234,
                 "payload": {"uri": "https://x/z"}}
            ],
            "status": "ok",
            "time": 0.001
        })),
    )
}

async fn page() -> Html<&'static str> {
    Html(
        "<html><head><style>.x{}</style><script>track()</script></head>\
         <body><h1>Cross-docking</h1><p>Pallets move dock to dock.</p></body></html>",
    )
}

async fn spawn_fake(state: Shared) -> String {
    let app = Router::new()
        .route(
            "/collections/{name}",
            get(get_collection).put(create_collection),
        )
        .route("/collections/{name}/points", put(upsert))
        .route("/collections/{name}/points/search", post(search))
        .route("/docs/cross-docking", get(page))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn store(url: &str) -> QdrantStore {
    let config = VectorDbConfig {
        url: Some(url.to_string()),
        collection: "wms_kb".to_string(),
        api_key: None,
        timeout_secs: 5,
    };
    QdrantStore::new(&config, DIMS).unwrap()
}

fn ingestor(url: &str) -> Ingestor {
    Ingestor::new(
        Box::new(store(url)),
        FallbackEmbedder::hash_only(DIMS),
        Duration::from_secs(5),
        "Unknown",
    )
    .unwrap()
}

fn remote_retriever(url: &str) -> Retriever {
    Retriever::new(
        Backend::Remote {
            store: Box::new(store(url)),
            embedder: FallbackEmbedder::hash_only(DIMS),
        },
        RetrievalConfig::default(),
    )
}

#[tokio::test]
async fn ingest_creates_collection_and_upserts_chunks() {
    let state = Shared::default();
    let url = spawn_fake(state.clone()).await;

    let text = "a".repeat(2500);
    let report = ingestor(&url)
        .ingest_text(
            SourceKind::Url,
            "https://x/y",
            &text,
            Some("Inbound"),
            &["receiving".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(report, IngestReport { chunks: 3, upserted: 3 });

    let s = state.lock().unwrap();
    assert_eq!(
        s.created,
        vec![json!({"vectors": {"size": DIMS, "distance": "Cosine"}})]
    );
    assert_eq!(s.upserts.len(), 1);

    let points = s.upserts[0]["points"].as_array().unwrap();
    let ids: Vec<u64> = points.iter().map(|p| p["id"].as_u64().unwrap()).collect();
    assert_eq!(
        ids,
        vec![
            8207406080902486906,
            8476652818528089529,
            8681976020108802631
        ]
    );
    for (i, p) in points.iter().enumerate() {
        assert_eq!(p["vector"].as_array().unwrap().len(), DIMS);
        assert_eq!(
            p["payload"],
            json!({
                "source": "url",
                "uri": "https://x/y",
                "chunk_index": i,
                "module": "Inbound",
                "tags": ["receiving"]
            })
        );
    }
}

#[tokio::test]
async fn existing_collection_is_not_recreated() {
    let state = Shared::default();
    let url = spawn_fake(state.clone()).await;
    let ing = ingestor(&url);

    ing.ingest_text(SourceKind::Url, "https://x/1", "first", None, &[])
        .await
        .unwrap();
    ing.ingest_text(SourceKind::Url, "https://x/2", "second", None, &[])
        .await
        .unwrap();

    let s = state.lock().unwrap();
    assert_eq!(s.created.len(), 1);
    assert_eq!(s.upserts.len(), 2);
    assert_eq!(s.upserts[1]["points"][0]["payload"]["module"], "Unknown");
}

#[tokio::test]
async fn rejected_upsert_is_a_hard_error() {
    let state = Shared::default();
    state.lock().unwrap().fail_upsert = true;
    let url = spawn_fake(state.clone()).await;

    let err = ingestor(&url)
        .ingest_text(SourceKind::Url, "https://x/y", "pick path", None, &[])
        .await
        .unwrap_err();
    let msg = format!("{:#}", err);
    assert!(msg.contains("Failed to upsert"), "{}", msg);
    assert!(msg.contains("400"), "{}", msg);
}

#[tokio::test]
async fn ingest_url_strips_html() {
    let state = Shared::default();
    let url = spawn_fake(state.clone()).await;
    let page_url = format!("{}/docs/cross-docking", url);

    let report = ingestor(&url)
        .ingest_url(&page_url, Some("Outbound"), &[])
        .await
        .unwrap();
    assert_eq!(report, IngestReport { chunks: 1, upserted: 1 });

    let s = state.lock().unwrap();
    let payload = &s.upserts[0]["points"][0]["payload"];
    assert_eq!(payload["uri"], page_url.as_str());
    assert_eq!(payload["module"], "Outbound");
}

#[tokio::test]
async fn ingest_url_missing_page_fails() {
    let state = Shared::default();
    let url = spawn_fake(state.clone()).await;

    let result = ingestor(&url)
        .ingest_url(&format!("{}/docs/missing", url), None, &[])
        .await;
    assert!(result.is_err());
    assert!(state.lock().unwrap().upserts.is_empty());
}

#[tokio::test]
async fn remote_context_sends_filter_and_renders_hits() {
    let state = Shared::default();
    let url = spawn_fake(state.clone()).await;
    let retriever = remote_retriever(&url);

    let mut filter = PayloadFilter::new();
    filter.insert("module".to_string(), "Inbound".to_string());
    let ctx = retriever
        .build_context("dock appointment", retriever.default_k(), &filter)
        .await;

    assert_eq!(
        ctx,
        "Top hits from Qdrant:\n- [0.900] https://x/y#1\n- [0.412] https://x/z#?"
    );

    let s = state.lock().unwrap();
    let body = &s.searches[0];
    assert_eq!(body["limit"], 6);
    assert_eq!(body["with_payload"], true);
    assert_eq!(body["vector"].as_array().unwrap().len(), DIMS);
    assert_eq!(
        body["filter"],
        json!({"must": [{"key": "module", "match": {"value": "Inbound"}}]})
    );
}

#[tokio::test]
async fn search_without_filter_omits_filter_field() {
    let state = Shared::default();
    let url = spawn_fake(state.clone()).await;

    remote_retriever(&url)
        .search("slotting", 3, &PayloadFilter::new())
        .await;

    let s = state.lock().unwrap();
    assert!(s.searches[0].get("filter").is_none());
    assert_eq!(s.searches[0]["limit"], 3);
}

#[tokio::test]
async fn failed_search_yields_empty_context() {
    let state = Shared::default();
    state.lock().unwrap().fail_search = true;
    let url = spawn_fake(state.clone()).await;

    let ctx = remote_retriever(&url)
        .build_context("anything", 6, &PayloadFilter::new())
        .await;
    assert_eq!(ctx, "");
}

#[tokio::test]
async fn unreachable_database_yields_empty_context() {
    let ctx = remote_retriever("http://127.0.0.1:9")
        .build_context("anything", 6, &PayloadFilter::new())
        .await;
    assert_eq!(ctx, "");
}

#[tokio::test]
async fn hit_without_score_renders_as_zero() {
    let state = Shared::default();
    state.lock().unwrap().scoreless_hit = true;
    let url = spawn_fake(state.clone()).await;

    let ctx = remote_retriever(&url)
        .build_context("cross dock", 6, &PayloadFilter::new())
        .await;
    assert_eq!(
        ctx,
        "Top hits from Qdrant:\n- [0.000] https://x/w#0\n- [0.500] https://x/z#3"
    );
}
