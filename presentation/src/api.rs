//! HTTP surface: company listing, comparison and the static front-end.

use crate::json_error::ApiError;
use application::company_service::CompanyService;
use application::comparison_service::ComparisonService;
use application::generation_service::GenerationService;
use application::retrieval_service::RetrievalService;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use domain::comparison::ComparisonRequest;
use domain::errors::PipelineError;
use domain::ports::{EmbeddingProvider, TextGenerator, VectorStore};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub struct Services {
    pub companies: CompanyService,
    pub comparison: ComparisonService,
}

/// Shared handler state. `services` is `None` when the vector store could not be opened
/// at startup; every endpoint then answers with a server error.
#[derive(Clone)]
pub struct AppState {
    services: Option<Arc<Services>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn TextGenerator>,
        top_k: usize,
    ) -> Self {
        let retrieval = RetrievalService::new(embedder, store.clone(), top_k);
        let generation = GenerationService::new(generator);
        Self {
            services: Some(Arc::new(Services {
                companies: CompanyService::new(store),
                comparison: ComparisonService::new(retrieval, generation),
            })),
        }
    }

    pub fn without_store() -> Self {
        Self { services: None }
    }

    fn services(&self) -> Result<&Services, ApiError> {
        self.services
            .as_deref()
            .ok_or_else(|| PipelineError::StoreUnavailable.into())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompaniesResponse {
    pub companies: Vec<String>,
}

pub fn router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/api/available-companies", get(available_companies))
        .route("/api/compare", post(compare))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn available_companies(
    State(state): State<AppState>,
) -> Result<Json<CompaniesResponse>, ApiError> {
    let services = state.services()?;
    let companies = services
        .companies
        .list_companies()
        .await
        .map_err(|e| ApiError::internal(format!("Could not fetch companies: {e}")))?;
    Ok(Json(CompaniesResponse { companies }))
}

/// Validation runs before the store check and before any embedding or generation call.
/// A successful body is the model's JSON exactly as generated.
pub async fn compare(
    State(state): State<AppState>,
    payload: Result<Json<ComparisonRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(ApiError::from_rejection)?;
    request.validate()?;
    let services = state.services()?;

    tracing::info!(
        "comparing {} against {} for {:?}",
        request.competitors.join(", "),
        request.base_company,
        request.query
    );
    let result = services.comparison.compare(&request).await.map_err(|e| {
        if e.is_client_error() {
            ApiError::from(e)
        } else {
            ApiError::internal(format!(
                "An error occurred while processing your request: {e}"
            ))
        }
    })?;
    Ok(([(header::CONTENT_TYPE, "application/json")], result.into_json()).into_response())
}
