use application::company_service::CompanyService;
use application::comparison_service::ComparisonService;
use application::generation_service::GenerationService;
use application::retrieval_service::RetrievalService;
use domain::comparison::ComparisonRequest;
use domain::errors::PipelineError;
use domain::models::{CollectionEntry, DocumentChunk};
use domain::ports::VectorStore;
use infrastructure::vector_store::SqliteVectorStore;
use std::sync::Arc;
use tests::{sample_result_json, HashingEmbedder, ScriptedGenerator};

const REPORT_TEXT: &[(&str, &str, &str)] = &[
    ("Tata Steel", "ar2024.pdf", "Tata Steel crude steel production reached 29.9 million tonnes"),
    ("Tata Steel", "ar2024.pdf", "Tata Steel revenue from operations and EBITDA margin"),
    ("Tata Steel", "ar2024.pdf", "Board of directors and corporate governance report"),
    ("Tata Steel", "ar2023.pdf", "Tata Steel sustainability and carbon emissions per tonne"),
    ("JSW Steel", "ar2024.pdf", "JSW Steel crude steel production capacity at Vijayanagar"),
    ("JSW Steel", "ar2024.pdf", "JSW Steel revenue and net debt position"),
    ("SAIL", "ar2024.pdf", "SAIL crude steel production of 19.2 million tonnes"),
];

async fn seeded_store() -> Arc<SqliteVectorStore> {
    let store = SqliteVectorStore::open_in_memory("steel_reports_v2").unwrap();
    let entries: Vec<CollectionEntry> = REPORT_TEXT
        .iter()
        .enumerate()
        .map(|(index, (company, source, text))| {
            CollectionEntry::from_chunk(
                DocumentChunk {
                    text: text.to_string(),
                    company: company.to_string(),
                    source: source.to_string(),
                    index,
                },
                HashingEmbedder::embed(text),
            )
        })
        .collect();
    store.upsert(&entries).await.unwrap();
    Arc::new(store)
}

fn request(query: &str, competitors: &[&str]) -> ComparisonRequest {
    ComparisonRequest {
        query: query.to_string(),
        competitors: competitors.iter().map(|c| c.to_string()).collect(),
        base_company: "Tata Steel".to_string(),
    }
}

#[tokio::test]
async fn test_retrieval_is_filtered_per_company_in_request_order() {
    let embedder = Arc::new(HashingEmbedder::new());
    let retrieval = RetrievalService::new(embedder.clone(), seeded_store().await, 2);

    let companies = vec!["JSW Steel".to_string(), "Tata Steel".to_string()];
    let context = retrieval
        .retrieve("crude steel production", &companies)
        .await
        .unwrap();

    assert_eq!(embedder.query_calls(), 1);
    assert_eq!(context.chunks.len(), 4);
    assert_eq!(context.count_for("JSW Steel"), 2);
    assert_eq!(context.count_for("Tata Steel"), 2);
    assert_eq!(context.count_for("SAIL"), 0);

    let order: Vec<&str> = context
        .chunks
        .iter()
        .map(|c| c.metadata.company.as_str())
        .collect();
    assert_eq!(order, vec!["JSW Steel", "JSW Steel", "Tata Steel", "Tata Steel"]);
    assert!(context.chunks[0].document.contains("production"));
    assert!(context.chunks[2].document.contains("production"));
    assert!(context.chunks[0].score >= context.chunks[1].score);
    assert!(context.chunks[2].score >= context.chunks[3].score);
    assert_eq!(
        context.text(),
        context
            .chunks
            .iter()
            .map(|c| c.document.clone())
            .collect::<Vec<_>>()
            .join("\n\n")
    );
}

#[tokio::test]
async fn test_unknown_company_contributes_nothing() {
    let retrieval = RetrievalService::new(
        Arc::new(HashingEmbedder::new()),
        seeded_store().await,
        5,
    );
    let companies = vec!["Tata Steel".to_string(), "Nippon Steel".to_string()];
    let context = retrieval.retrieve("revenue", &companies).await.unwrap();

    assert_eq!(context.count_for("Tata Steel"), 4);
    assert_eq!(context.count_for("Nippon Steel"), 0);
    assert_eq!(context.chunks.len(), 4);
}

#[tokio::test]
async fn test_company_listing_is_sorted_and_unique() {
    let companies = CompanyService::new(seeded_store().await)
        .list_companies()
        .await
        .unwrap();
    assert_eq!(companies, vec!["JSW Steel", "SAIL", "Tata Steel"]);

    let empty = SqliteVectorStore::open_in_memory("steel_reports_v2").unwrap();
    let companies = CompanyService::new(Arc::new(empty))
        .list_companies()
        .await
        .unwrap();
    assert!(companies.is_empty());
}

#[tokio::test]
async fn test_comparison_builds_prompt_from_retrieved_context() {
    let generator = Arc::new(ScriptedGenerator::replying(sample_result_json()));
    let service = ComparisonService::new(
        RetrievalService::new(Arc::new(HashingEmbedder::new()), seeded_store().await, 5),
        GenerationService::new(generator.clone()),
    );

    let result = service
        .compare(&request("crude steel production", &["JSW Steel"]))
        .await
        .unwrap();
    assert_eq!(result.graph_data.labels, vec!["Tata Steel", "JSW Steel"]);
    assert_eq!(result.table_data[0].metric, "Revenue (in Cr)");

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    let prompt = &prompts[0];
    assert!(prompt.contains("crude steel production"));
    assert!(prompt.contains("JSW Steel crude steel production capacity at Vijayanagar"));
    assert!(prompt.contains("Tata Steel crude steel production reached 29.9 million tonnes"));
    assert!(!prompt.contains("SAIL crude steel production"));
    assert!(prompt.trim_end().ends_with("JSON_OUTPUT:"));
}

#[tokio::test]
async fn test_comparison_without_indexed_chunks_still_generates() {
    let generator = Arc::new(ScriptedGenerator::replying(sample_result_json()));
    let empty = SqliteVectorStore::open_in_memory("steel_reports_v2").unwrap();
    let service = ComparisonService::new(
        RetrievalService::new(Arc::new(HashingEmbedder::new()), Arc::new(empty), 5),
        GenerationService::new(generator.clone()),
    );

    let result = service
        .compare(&request("revenue", &["Nippon Steel"]))
        .await
        .unwrap();
    assert_eq!(result.graph_data.datasets.len(), 1);
    assert!(generator.prompts()[0].contains("---\n\n---"));
}

#[tokio::test]
async fn test_invalid_request_makes_no_external_call() {
    let embedder = Arc::new(HashingEmbedder::new());
    let generator = Arc::new(ScriptedGenerator::replying(sample_result_json()));
    let service = ComparisonService::new(
        RetrievalService::new(embedder.clone(), seeded_store().await, 5),
        GenerationService::new(generator.clone()),
    );

    let err = service.compare(&request("revenue", &[])).await.unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));
    let err = service.compare(&request("revenue", &["  "])).await.unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));

    assert_eq!(embedder.total_calls(), 0);
    assert!(generator.prompts().is_empty());
}

#[tokio::test]
async fn test_bad_model_output_is_reported() {
    let cases = [
        ("Sure! Here is the table you asked for.", "invalid"),
        (r#"{"table_data": []}"#, "malformed"),
        (r#"{"table_data": [], "graph_data": {"labels": [], "datasets": [{"label": "x", "data": ["1,200"]}]}}"#, "malformed"),
    ];
    for (output, kind) in cases {
        let service = ComparisonService::new(
            RetrievalService::new(Arc::new(HashingEmbedder::new()), seeded_store().await, 5),
            GenerationService::new(Arc::new(ScriptedGenerator::replying(output))),
        );
        let err = service
            .compare(&request("revenue", &["JSW Steel"]))
            .await
            .unwrap_err();
        match kind {
            "invalid" => assert!(matches!(err, PipelineError::InvalidJson(_)), "{err}"),
            _ => assert!(matches!(err, PipelineError::MalformedOutput(_)), "{err}"),
        }
    }
}

#[tokio::test]
async fn test_generation_failure_is_propagated() {
    let service = ComparisonService::new(
        RetrievalService::new(Arc::new(HashingEmbedder::new()), seeded_store().await, 5),
        GenerationService::new(Arc::new(ScriptedGenerator::failing("prompt blocked: SAFETY"))),
    );
    let err = service
        .compare(&request("revenue", &["JSW Steel"]))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Generation(_)));
    assert!(err.to_string().contains("prompt blocked: SAFETY"));
}
