//! File-backed vector collection on SQLite with exact cosine search.

use crate::search::SearchEngine;
use anyhow::{bail, Context};
use async_trait::async_trait;
use domain::models::{ChunkMetadata, CollectionEntry, MetadataFilter, ScoredChunk};
use domain::ports::VectorStore;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use shared::types::Result;
use std::path::Path;
use std::sync::Arc;

/// Cheap to clone; clones share one connection. SQLite work runs on the blocking pool.
#[derive(Clone)]
pub struct SqliteVectorStore {
    conn: Arc<Mutex<Connection>>,
    collection: String,
}

impl SqliteVectorStore {
    /// Open (creating file, schema and collection as needed). Used by ingestion.
    pub fn open_or_create(db_path: impl AsRef<Path>, collection: &str) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open vector store at {}", db_path.display()))?;
        Self::setup_db(&conn)?;
        Self::ensure_collection(&conn, collection)?;
        Ok(Self::wrap(conn, collection))
    }

    /// Open a collection that ingestion has already created.
    pub fn open_existing(db_path: impl AsRef<Path>, collection: &str) -> Result<Self> {
        let db_path = db_path.as_ref();
        if !db_path.is_file() {
            bail!(
                "vector store {} does not exist; run the ingest command first",
                db_path.display()
            );
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open vector store at {}", db_path.display()))?;
        Self::setup_db(&conn)?;
        let exists: Option<String> = conn
            .query_row(
                "SELECT name FROM collections WHERE name = ?1",
                [collection],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            bail!("collection '{collection}' does not exist; run the ingest command first");
        }
        Ok(Self::wrap(conn, collection))
    }

    pub fn open_in_memory(collection: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::setup_db(&conn)?;
        Self::ensure_collection(&conn, collection)?;
        Ok(Self::wrap(conn, collection))
    }

    fn wrap(conn: Connection, collection: &str) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            collection: collection.to_string(),
        }
    }

    fn setup_db(conn: &Connection) -> SqlResult<()> {
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA cache_size=-64000;
            PRAGMA temp_store=MEMORY;
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY
            );
            CREATE TABLE IF NOT EXISTS entries (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                embedding BLOB NOT NULL,
                document TEXT NOT NULL,
                company TEXT NOT NULL,
                source TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );
            CREATE INDEX IF NOT EXISTS idx_entries_company ON entries(collection, company);
        ",
        )
    }

    fn ensure_collection(conn: &Connection, collection: &str) -> SqlResult<()> {
        conn.execute(
            "INSERT OR IGNORE INTO collections (name) VALUES (?1)",
            [collection],
        )?;
        Ok(())
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteVectorStore) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || work(&store)).await?
    }

    fn upsert_sync(&self, entries: &[CollectionEntry]) -> Result<()> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO entries (collection, id, embedding, document, company, source)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for entry in entries {
                let embedding_bytes = serde_json::to_vec(&entry.embedding)?;
                stmt.execute(params![
                    self.collection,
                    entry.id,
                    embedding_bytes,
                    entry.document,
                    entry.metadata.company,
                    entry.metadata.source
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn query_sync(
        &self,
        embedding: &[f32],
        filter: &MetadataFilter,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, embedding, document, company, source FROM entries
             WHERE collection = ?1
               AND (?2 IS NULL OR company = ?2)
               AND (?3 IS NULL OR source = ?3)",
        )?;
        let mut rows = stmt.query(params![
            self.collection,
            filter.company.as_deref(),
            filter.source.as_deref()
        ])?;
        let mut candidates = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            let vector_bytes: Vec<u8> = row.get(1)?;
            let vector: Vec<f32> = serde_json::from_slice(&vector_bytes)?;
            if vector.len() != embedding.len() {
                bail!(
                    "embedding dimension {} does not match stored entry '{}' of dimension {}",
                    embedding.len(),
                    id,
                    vector.len()
                );
            }
            candidates.push(ScoredChunk {
                score: SearchEngine::cosine_similarity(embedding, &vector),
                id,
                document: row.get(2)?,
                metadata: ChunkMetadata {
                    company: row.get(3)?,
                    source: row.get(4)?,
                },
            });
        }
        Ok(SearchEngine::top_k(candidates, top_k))
    }

    fn list_metadata_sync(&self) -> Result<Vec<ChunkMetadata>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT company, source FROM entries WHERE collection = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([&self.collection], |row| {
            Ok(ChunkMetadata {
                company: row.get(0)?,
                source: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<SqlResult<Vec<_>>>()?)
    }

    fn count_sync(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE collection = ?1",
            [&self.collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(&self, entries: &[CollectionEntry]) -> Result<()> {
        let entries = entries.to_vec();
        self.blocking(move |store| store.upsert_sync(&entries)).await
    }

    async fn query(
        &self,
        embedding: &[f32],
        filter: &MetadataFilter,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let embedding = embedding.to_vec();
        let filter = filter.clone();
        self.blocking(move |store| store.query_sync(&embedding, &filter, top_k))
            .await
    }

    async fn list_metadata(&self) -> Result<Vec<ChunkMetadata>> {
        self.blocking(|store| store.list_metadata_sync()).await
    }

    async fn count(&self) -> Result<usize> {
        self.blocking(|store| store.count_sync()).await
    }
}
