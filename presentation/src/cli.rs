use crate::server::Server;
use application::ingestion_service::IngestionService;
use clap::{Parser, Subcommand};
use colored::Colorize;
use infrastructure::chunker::Chunker;
use infrastructure::config::Config;
use infrastructure::embedder::GeminiEmbedder;
use infrastructure::gemini_client::GeminiClient;
use infrastructure::report_scanner::{PdfTextExtractor, ReportScanner};
use infrastructure::vector_store::SqliteVectorStore;
use shared::types::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Compare companies' annual reports with retrieval-augmented generation.
#[derive(Parser, Debug)]
#[command(name = "report_compare", version)]
#[command(about = "Ingest annual-report PDFs and serve company comparisons", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API and static front-end
    Serve {
        /// Address to bind (host:port); overrides BIND_ADDRESS
        #[arg(long)]
        bind: Option<String>,

        /// Directory holding index.html and static assets; overrides STATIC_DIR
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Embed every reports/<Company>/*.pdf into the vector store
    Ingest {
        /// Reports root; overrides REPORTS_DIR
        #[arg(long)]
        reports_dir: Option<PathBuf>,
    },
    /// List models available for generateContent
    Models,
}

pub struct CliApp;

impl CliApp {
    pub fn new() -> Self {
        Self
    }

    /// Configuration is loaded first, so a missing credential stops every subcommand.
    pub async fn run(&mut self, cli: Cli) -> Result<()> {
        let mut config = Config::load()?;
        match cli.command {
            Command::Serve { bind, static_dir } => {
                if let Some(bind) = bind {
                    config.bind_address = bind;
                }
                if let Some(static_dir) = static_dir {
                    config.static_dir = static_dir;
                }
                Server::new(config).run().await
            }
            Command::Ingest { reports_dir } => {
                if let Some(reports_dir) = reports_dir {
                    config.reports_dir = reports_dir;
                }
                self.handle_ingest(&config).await
            }
            Command::Models => self.handle_models(&config).await,
        }
    }

    async fn handle_ingest(&self, config: &Config) -> Result<()> {
        let client = GeminiClient::from_config(config)?;
        let store =
            SqliteVectorStore::open_or_create(config.store_file(), &config.collection_name)?;
        let service = IngestionService::new(
            ReportScanner::new(&config.reports_dir),
            Chunker::new(config.chunk_size, config.chunk_overlap)?,
            Arc::new(PdfTextExtractor),
            Arc::new(GeminiEmbedder::new(client)),
            Arc::new(store),
        );

        let report = service.run().await?;
        if report.files_found == 0 {
            println!(
                "{} Please follow the '{}/<CompanyName>/<file>.pdf' structure.",
                "No PDF files found.".yellow().bold(),
                config.reports_dir.display()
            );
            return Ok(());
        }
        println!("{}", "PDF processing and embedding complete.".green().bold());
        println!(
            "  files: {} ingested, {} skipped",
            report.files_ingested.to_string().green(),
            if report.files_skipped > 0 {
                report.files_skipped.to_string().red()
            } else {
                report.files_skipped.to_string().normal()
            }
        );
        println!("  chunks upserted: {}", report.chunks_upserted);
        println!(
            "  total documents in collection '{}': {}",
            config.collection_name,
            report.total_entries.to_string().cyan()
        );
        Ok(())
    }

    async fn handle_models(&self, config: &Config) -> Result<()> {
        let client = GeminiClient::from_config(config)?;
        let models = client.list_models().await?;
        println!(
            "{}",
            "--- Models available for 'generateContent' ---".cyan().bold()
        );
        for model in models.iter().filter(|m| m.supports("generateContent")) {
            if model.display_name.is_empty() {
                println!("{}", model.name);
            } else {
                println!("{}  {}", model.name, model.display_name.dimmed());
            }
        }
        Ok(())
    }
}

impl Default for CliApp {
    fn default() -> Self {
        Self::new()
    }
}
