use domain::models::{CollectionEntry, DocumentChunk};
use domain::ports::{EmbeddingProvider, TextExtractor, VectorStore};
use infrastructure::chunker::Chunker;
use infrastructure::report_scanner::{ReportFile, ReportScanner};
use shared::telemetry::Telemetry;
use shared::types::Result;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionReport {
    pub files_found: usize,
    pub files_ingested: usize,
    pub files_skipped: usize,
    pub chunks_upserted: usize,
    /// Collection size after the run.
    pub total_entries: usize,
    pub elapsed: Duration,
}

/// Offline batch job: `reports/<Company>/*.pdf` -> chunks -> embeddings -> vector store.
pub struct IngestionService {
    scanner: ReportScanner,
    chunker: Chunker,
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl IngestionService {
    pub fn new(
        scanner: ReportScanner,
        chunker: Chunker,
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            scanner,
            chunker,
            extractor,
            embedder,
            store,
        }
    }

    /// Ingest every report. A failing file is logged and skipped; only failures to list
    /// the reports directory or to count the collection abort the run.
    pub async fn run(&self) -> Result<IngestionReport> {
        let telemetry = Telemetry::new();
        let reports = self.scanner.collect_reports()?;
        let mut report = IngestionReport {
            files_found: reports.len(),
            ..Default::default()
        };

        if reports.is_empty() {
            tracing::warn!(
                "No PDF files found in company subdirectories of '{}'. Expected layout: {}/<CompanyName>/<report>.pdf",
                self.scanner.root_path().display(),
                self.scanner.root_path().display()
            );
            report.total_entries = self.store.count().await?;
            report.elapsed = telemetry.elapsed();
            return Ok(report);
        }
        tracing::info!("Found {} PDF files to process.", reports.len());

        let extractor = self.extractor.clone();
        let scans = tokio::task::spawn_blocking(move || {
            ReportScanner::scan_reports(&reports, extractor.as_ref())
        })
        .await?;

        for (position, scan) in scans.into_iter().enumerate() {
            tracing::info!(
                "[{}/{}] {} / {}",
                position + 1,
                report.files_found,
                scan.report.company,
                scan.report.file_name
            );
            let text = match scan.text {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!("Error reading {}: {err:#}", scan.report.file_name);
                    report.files_skipped += 1;
                    continue;
                }
            };
            if text.trim().is_empty() {
                tracing::warn!("Could not extract text from {}.", scan.report.file_name);
                report.files_skipped += 1;
                continue;
            }

            match self.ingest_text(&scan.report, &text).await {
                Ok(upserted) => {
                    report.files_ingested += 1;
                    report.chunks_upserted += upserted;
                }
                Err(err) => {
                    tracing::error!(
                        "An error occurred during embedding for {}: {err:#}",
                        scan.report.file_name
                    );
                    report.files_skipped += 1;
                }
            }
        }

        report.total_entries = self.store.count().await?;
        report.elapsed = telemetry.elapsed();
        tracing::info!(
            "PDF processing and embedding complete: {} ingested, {} skipped, {} chunks upserted in {:.1}s. Total documents in collection: {}",
            report.files_ingested,
            report.files_skipped,
            report.chunks_upserted,
            report.elapsed.as_secs_f64(),
            report.total_entries
        );
        Ok(report)
    }

    /// Chunk, embed in one call and upsert a single report. Returns the number of entries written.
    async fn ingest_text(&self, file: &ReportFile, text: &str) -> Result<usize> {
        let chunks: Vec<DocumentChunk> = self
            .chunker
            .chunk(text)
            .into_iter()
            .enumerate()
            .map(|(index, text)| DocumentChunk {
                text,
                company: file.company.clone(),
                source: file.file_name.clone(),
                index,
            })
            .collect();
        tracing::info!("Embedding {} chunks for {}...", chunks.len(), file.file_name);

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_documents(&texts).await?;
        anyhow::ensure!(
            embeddings.len() == chunks.len(),
            "embedding service returned {} vectors for {} chunks",
            embeddings.len(),
            chunks.len()
        );

        let entries: Vec<CollectionEntry> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| CollectionEntry::from_chunk(chunk, embedding))
            .collect();
        self.store.upsert(&entries).await?;
        Ok(entries.len())
    }
}
