use serde::{Deserialize, Serialize};

/// Metadata stored alongside every collection entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub company: String,
    pub source: String,
}

/// A window of extracted report text, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    pub text: String,
    pub company: String,
    pub source: String,
    pub index: usize,
}

impl DocumentChunk {
    /// Stable identity `{company}_{source}_{index}`; re-ingesting a file yields the same ids.
    pub fn id(&self) -> String {
        format!("{}_{}_{}", self.company, self.source, self.index)
    }

    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            company: self.company.clone(),
            source: self.source.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub id: String,
    pub embedding: Vec<f32>,
    pub document: String,
    pub metadata: ChunkMetadata,
}

impl CollectionEntry {
    pub fn from_chunk(chunk: DocumentChunk, embedding: Vec<f32>) -> Self {
        Self {
            id: chunk.id(),
            metadata: chunk.metadata(),
            document: chunk.text,
            embedding,
        }
    }
}

/// A search hit, higher `score` is more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub id: String,
    pub document: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}

/// Equality constraints on entry metadata. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    pub company: Option<String>,
    pub source: Option<String>,
}

impl MetadataFilter {
    pub fn company(name: impl Into<String>) -> Self {
        Self {
            company: Some(name.into()),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        self.company.as_deref().map_or(true, |c| c == metadata.company)
            && self.source.as_deref().map_or(true, |s| s == metadata.source)
    }
}

/// Which side of retrieval an embedding is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

impl TaskType {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            TaskType::RetrievalDocument => "RETRIEVAL_DOCUMENT",
            TaskType::RetrievalQuery => "RETRIEVAL_QUERY",
        }
    }
}
