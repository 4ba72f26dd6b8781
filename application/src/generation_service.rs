use domain::comparison::ComparisonResult;
use domain::errors::PipelineError;
use domain::ports::TextGenerator;
use std::sync::Arc;

/// Instruction prompt for the comparison. Pure function of its inputs.
pub fn build_prompt(context: &str, query: &str, base_company: &str, competitors: &[String]) -> String {
    let competitor_list = competitors.join(", ");
    format!(
        r#"You are an expert financial data analyst. Extract and compare financial metrics using only the annual report excerpts in the context below.
Compare {competitor_list} against {base_company} for the query: "{query}".

Answer with a single JSON object that has exactly two keys, "table_data" and "graph_data".

1. "table_data": an array of objects, one per financial metric. Every object has a "Metric" key naming the metric and one key per company whose value is a string. Use "N/A" when a value is not present in the context.
   Example: [{{ "Metric": "Revenue (in Cr)", "Tata Steel": "240,000", "JSW Steel": "225,000" }}]

2. "graph_data": an object for a bar chart with a "labels" array of company names and a "datasets" array. Each dataset is an object with a "label" (the metric name) and a "data" array holding one number per label, in label order. The "data" array must contain numbers only: write 0 for missing or non-numeric values, and strip thousands separators and currency symbols.
   Example: {{ "labels": ["Tata Steel", "JSW Steel"], "datasets": [{{ "label": "Revenue (in Cr)", "data": [240000, 225000] }}] }}

Return only the JSON object, with no explanation or any other text before or after it.

CONTEXT:
---
{context}
---

JSON_OUTPUT:
"#
    )
}

pub struct GenerationService {
    generator: Arc<dyn TextGenerator>,
}

impl GenerationService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Prompt the model and validate its JSON. No repair and no retry on bad output.
    pub async fn generate(
        &self,
        context: &str,
        query: &str,
        base_company: &str,
        competitors: &[String],
    ) -> Result<ComparisonResult, PipelineError> {
        let prompt = build_prompt(context, query, base_company, competitors);
        let raw = self
            .generator
            .generate_json(&prompt)
            .await
            .map_err(PipelineError::generation)?;
        let result = ComparisonResult::from_model_output(&raw).inspect_err(|err| {
            tracing::error!("rejected model output ({err}): {}", truncate(&raw, 500));
        })?;

        let companies: Vec<String> = std::iter::once(base_company.to_string())
            .chain(competitors.iter().cloned())
            .collect();
        let missing = result.missing_companies(&companies);
        if !missing.is_empty() {
            tracing::warn!("table_data rows lack values for {}", missing.join(", "));
        }
        Ok(result)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((offset, _)) => format!("{}...", &text[..offset]),
        None => text.to_string(),
    }
}
