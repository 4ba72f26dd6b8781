use crate::api::{self, AppState};
use anyhow::Context;
use axum::Router;
use domain::ports::{EmbeddingProvider, TextGenerator, VectorStore};
use infrastructure::config::Config;
use infrastructure::embedder::GeminiEmbedder;
use infrastructure::gemini_client::GeminiClient;
use infrastructure::vector_store::SqliteVectorStore;
use shared::types::Result;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct Server {
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Wire the Gemini client and the vector store. A store that cannot be opened is
    /// logged and reported per request rather than preventing startup.
    pub fn build_state(config: &Config) -> Result<AppState> {
        let client = GeminiClient::from_config(config)?;
        let store: Arc<dyn VectorStore> =
            match SqliteVectorStore::open_existing(config.store_file(), &config.collection_name) {
                Ok(store) => {
                    tracing::info!(
                        "Successfully connected to collection '{}' at {}",
                        config.collection_name,
                        config.store_file().display()
                    );
                    Arc::new(store)
                }
                Err(err) => {
                    tracing::error!("Error connecting to the vector store: {err:#}");
                    return Ok(AppState::without_store());
                }
            };
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(GeminiEmbedder::new(client.clone()));
        let generator: Arc<dyn TextGenerator> = Arc::new(client);
        Ok(AppState::new(store, embedder, generator, config.top_k))
    }

    pub fn app(&self) -> Result<Router> {
        let state = Self::build_state(&self.config)?;
        Ok(api::router(state, &self.config.static_dir))
    }

    pub async fn run(&self) -> Result<()> {
        let app = self.app()?;
        let address = self.config.bind_address.clone();
        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("failed to bind {address}"))?;
        tracing::info!("listening on http://{}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
