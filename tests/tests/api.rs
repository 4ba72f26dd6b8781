use domain::models::{CollectionEntry, DocumentChunk};
use domain::ports::VectorStore;
use infrastructure::vector_store::SqliteVectorStore;
use presentation::api::{router, AppState};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tests::{sample_result_json, HashingEmbedder, ScriptedGenerator};

async fn spawn(state: AppState, static_dir: &Path) -> String {
    let app = router(state, static_dir);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn seeded_store() -> Arc<SqliteVectorStore> {
    let store = SqliteVectorStore::open_in_memory("steel_reports_v2").unwrap();
    let chunks = [
        ("Tata Steel", "ar2024.pdf", "Tata Steel revenue from operations"),
        ("Tata Steel", "ar2023.pdf", "Tata Steel EBITDA per tonne"),
        ("JSW Steel", "ar2024.pdf", "JSW Steel revenue and net debt"),
    ];
    let entries: Vec<CollectionEntry> = chunks
        .iter()
        .map(|(company, source, text)| {
            CollectionEntry::from_chunk(
                DocumentChunk {
                    text: text.to_string(),
                    company: company.to_string(),
                    source: source.to_string(),
                    index: 0,
                },
                HashingEmbedder::embed(text),
            )
        })
        .collect();
    store.upsert(&entries).await.unwrap();
    Arc::new(store)
}

struct Harness {
    base_url: String,
    embedder: Arc<HashingEmbedder>,
    generator: Arc<ScriptedGenerator>,
    _static_dir: TempDir,
}

async fn harness(generator: ScriptedGenerator) -> Harness {
    let static_dir = TempDir::new().unwrap();
    std::fs::write(
        static_dir.path().join("index.html"),
        "<html><body>compare</body></html>",
    )
    .unwrap();
    std::fs::write(static_dir.path().join("script.js"), "console.log('ok');").unwrap();

    let embedder = Arc::new(HashingEmbedder::new());
    let generator = Arc::new(generator);
    let state = AppState::new(seeded_store().await, embedder.clone(), generator.clone(), 5);
    Harness {
        base_url: spawn(state, static_dir.path()).await,
        embedder,
        generator,
        _static_dir: static_dir,
    }
}

#[tokio::test]
async fn test_available_companies() {
    let h = harness(ScriptedGenerator::replying(sample_result_json())).await;
    let response = reqwest::get(format!("{}/api/available-companies", h.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"companies": ["JSW Steel", "Tata Steel"]}));
}

#[tokio::test]
async fn test_compare_returns_model_result() {
    let h = harness(ScriptedGenerator::replying(sample_result_json())).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/compare", h.base_url))
        .json(&json!({"query": "revenue", "competitors": ["JSW Steel"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["graph_data"]["labels"], json!(["Tata Steel", "JSW Steel"]));
    assert_eq!(body["table_data"][0]["Metric"], "Revenue (in Cr)");
    assert_eq!(body["table_data"][1]["JSW Steel"], "N/A");

    // base company defaults to Tata Steel
    let prompt = &h.generator.prompts()[0];
    assert!(prompt.contains("Compare JSW Steel against Tata Steel"));
    assert!(prompt.contains("Tata Steel revenue from operations"));
}

#[tokio::test]
async fn test_compare_body_is_model_json_unchanged() {
    let raw = r##"{"table_data":[{"Metric":"Revenue (in Cr)","Tata Steel":"2,29,171","JSW Steel":"1,75,006"}],"graph_data":{"labels":["Tata Steel","JSW Steel"],"datasets":[{"label":"Revenue (in Cr)","data":[229171,175006],"backgroundColor":"#1f77b4"}]},"notes":"standalone figures"}"##;
    let h = harness(ScriptedGenerator::replying(raw)).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/compare", h.base_url))
        .json(&json!({"query": "revenue", "competitors": ["JSW Steel"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[reqwest::header::CONTENT_TYPE],
        "application/json"
    );
    assert_eq!(response.text().await.unwrap(), raw);
}

#[tokio::test]
async fn test_compare_rejects_empty_competitors_before_embedding() {
    let h = harness(ScriptedGenerator::replying(sample_result_json())).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/compare", h.base_url))
        .json(&json!({"query": "revenue", "competitors": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("competitors"));
    assert_eq!(h.embedder.total_calls(), 0);
    assert!(h.generator.prompts().is_empty());
}

#[tokio::test]
async fn test_compare_rejects_malformed_body() {
    let h = harness(ScriptedGenerator::replying(sample_result_json())).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/compare", h.base_url))
        .json(&json!({"competitors": ["JSW Steel"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"].is_string());
    assert_eq!(h.embedder.total_calls(), 0);
}

#[tokio::test]
async fn test_non_json_model_output_is_a_server_error() {
    let h = harness(ScriptedGenerator::replying("I could not find that.")).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/compare", h.base_url))
        .json(&json!({"query": "revenue", "competitors": ["JSW Steel"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("An error occurred while processing your request:"));
}

#[tokio::test]
async fn test_missing_store_is_reported_per_request() {
    let static_dir = TempDir::new().unwrap();
    let base_url = spawn(AppState::without_store(), static_dir.path()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{base_url}/api/available-companies"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"detail": "Database not initialized."}));

    let response = client
        .post(format!("{base_url}/api/compare"))
        .json(&json!({"query": "revenue", "competitors": ["JSW Steel"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Database not initialized.");
}

#[tokio::test]
async fn test_serves_front_end() {
    let h = harness(ScriptedGenerator::replying(sample_result_json())).await;
    let index = reqwest::get(format!("{}/", h.base_url)).await.unwrap();
    assert_eq!(index.status(), StatusCode::OK);
    assert!(index.text().await.unwrap().contains("compare"));

    let script = reqwest::get(format!("{}/static/script.js", h.base_url))
        .await
        .unwrap();
    assert_eq!(script.status(), StatusCode::OK);
}
