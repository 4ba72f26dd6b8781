use super::gemini_client::GeminiClient;
use async_trait::async_trait;
use domain::models::TaskType;
use domain::ports::EmbeddingProvider;
use futures::stream::{self, StreamExt, TryStreamExt};
use shared::types::Result;

/// Upper bound on inputs per `batchEmbedContents` call.
const BATCH_SIZE: usize = 100;
const CONCURRENT_BATCHES: usize = 4;

pub struct GeminiEmbedder {
    client: GeminiClient,
}

impl GeminiEmbedder {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    /// Document-mode embeddings. Inputs beyond one API batch are split into several
    /// requests; the result keeps input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        tracing::debug!("Generating embeddings for {} chunks...", texts.len());
        let requests: Vec<_> = texts
            .chunks(BATCH_SIZE)
            .map(|batch| self.client.embed_batch(batch, TaskType::RetrievalDocument))
            .collect();
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(requests)
            .buffered(CONCURRENT_BATCHES)
            .try_collect()
            .await?;
        Ok(batches.into_iter().flatten().collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed_one(text, TaskType::RetrievalQuery).await
    }
}
