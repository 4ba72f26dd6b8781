use domain::errors::PipelineError;
use domain::models::{MetadataFilter, ScoredChunk};
use domain::ports::{EmbeddingProvider, VectorStore};
use std::sync::Arc;

/// Chunks retrieved for one comparison, grouped by company in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedContext {
    pub chunks: Vec<ScoredChunk>,
}

impl RetrievedContext {
    /// Chunk texts separated by a blank line.
    pub fn text(&self) -> String {
        self.chunks
            .iter()
            .map(|c| c.document.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn count_for(&self, company: &str) -> usize {
        self.chunks
            .iter()
            .filter(|c| c.metadata.company == company)
            .count()
    }
}

pub struct RetrievalService {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl RetrievalService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            top_k: top_k.max(1),
        }
    }

    /// Embed `query` once, then take the `top_k` nearest chunks of each company.
    /// Companies without indexed chunks contribute nothing.
    pub async fn retrieve(
        &self,
        query: &str,
        companies: &[String],
    ) -> Result<RetrievedContext, PipelineError> {
        if companies.is_empty() {
            return Err(PipelineError::Validation(
                "at least one company is required".to_string(),
            ));
        }
        if companies.iter().any(|c| c.trim().is_empty()) {
            return Err(PipelineError::Validation(
                "company names must not be empty".to_string(),
            ));
        }

        let query_embedding = self
            .embedder
            .embed_query(query)
            .await
            .map_err(PipelineError::embedding)?;

        let mut context = RetrievedContext::default();
        for company in companies {
            let hits = self
                .store
                .query(&query_embedding, &MetadataFilter::company(company), self.top_k)
                .await
                .map_err(PipelineError::store)?;
            if hits.is_empty() {
                tracing::debug!("no indexed chunks for company '{company}'");
            }
            context.chunks.extend(hits);
        }
        tracing::debug!(
            "retrieved {} chunks for {} companies",
            context.chunks.len(),
            companies.len()
        );
        Ok(context)
    }
}
