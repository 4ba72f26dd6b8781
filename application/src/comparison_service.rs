use crate::generation_service::GenerationService;
use crate::retrieval_service::RetrievalService;
use domain::comparison::{ComparisonRequest, ComparisonResult};
use domain::errors::PipelineError;
use shared::telemetry::Telemetry;

/// Retrieval followed by generation for one comparison request.
pub struct ComparisonService {
    retrieval: RetrievalService,
    generation: GenerationService,
}

impl ComparisonService {
    pub fn new(retrieval: RetrievalService, generation: GenerationService) -> Self {
        Self {
            retrieval,
            generation,
        }
    }

    pub async fn compare(
        &self,
        request: &ComparisonRequest,
    ) -> Result<ComparisonResult, PipelineError> {
        request.validate()?;
        let telemetry = Telemetry::new();
        let companies = request.companies();

        let context = self.retrieval.retrieve(&request.query, &companies).await?;
        if context.is_empty() {
            tracing::warn!(
                "no indexed chunks for any of {}; generating from empty context",
                companies.join(", ")
            );
        }

        let result = self
            .generation
            .generate(
                &context.text(),
                &request.query,
                &request.base_company,
                &request.competitors,
            )
            .await?;
        tracing::info!(
            "compared {} companies ({} chunks, {} metrics) in {:.0}ms",
            companies.len(),
            context.chunks.len(),
            result.table_data.len(),
            telemetry.elapsed_ms()
        );
        Ok(result)
    }
}
