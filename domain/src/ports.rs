//! Seams to the external services: vector store, embedding model, generative model
//! and document text extraction. Infrastructure provides the production adapters.

use crate::models::{ChunkMetadata, CollectionEntry, MetadataFilter, ScoredChunk};
use async_trait::async_trait;
use shared::types::Result;
use std::path::Path;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert entries, replacing any existing entry with the same id.
    async fn upsert(&self, entries: &[CollectionEntry]) -> Result<()>;

    /// Nearest entries to `embedding` among those matching `filter`, best first, at most `top_k`.
    async fn query(
        &self,
        embedding: &[f32],
        filter: &MetadataFilter,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>>;

    async fn list_metadata(&self) -> Result<Vec<ChunkMetadata>>;

    async fn count(&self) -> Result<usize>;
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// One vector per input, in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run the prompt with JSON output forced and return the raw model text.
    async fn generate_json(&self, prompt: &str) -> Result<String>;
}

pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, path: &Path) -> Result<String>;
}
