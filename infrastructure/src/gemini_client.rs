//! Client for the Gemini (Generative Language) REST API: embeddings, JSON generation
//! and model listing.

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use domain::models::TaskType;
use domain::ports::TextGenerator;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use shared::types::Result;
use std::sync::Arc;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports(&self, method: &str) -> bool {
        self.supported_generation_methods.iter().any(|m| m == method)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
    embedding_model: String,
    generation_model: String,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        embedding_model: impl Into<String>,
        generation_model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Gemini API key");
        let client = Client::builder()
            .build()
            .context("failed to build Gemini HTTP client")?;
        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            embedding_model: qualified_model(&embedding_model.into()),
            generation_model: qualified_model(&generation_model.into()),
        })
    }

    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        Self::new(
            &config.gemini_base_url,
            &config.api_key,
            &config.embedding_model,
            &config.generation_model,
        )
    }

    fn method_url(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{}", self.base_url, model, method)
    }

    pub async fn embed_batch(&self, texts: &[String], task: TaskType) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.method_url(&self.embedding_model, "batchEmbedContents");
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: &self.embedding_model,
                    content: Content {
                        role: None,
                        parts: vec![Part { text }],
                    },
                    task_type: task.as_api_str(),
                })
                .collect(),
        };
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Gemini batchEmbedContents request failed")?;
        let parsed: BatchEmbedResponse = read_json(response, "batchEmbedContents").await?;
        anyhow::ensure!(
            parsed.embeddings.len() == texts.len(),
            "Gemini returned {} embeddings for {} inputs",
            parsed.embeddings.len(),
            texts.len()
        );
        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }

    pub async fn embed_one(&self, text: &str, task: TaskType) -> Result<Vec<f32>> {
        let url = self.method_url(&self.embedding_model, "embedContent");
        let request = EmbedContentRequest {
            model: &self.embedding_model,
            content: Content {
                role: None,
                parts: vec![Part { text }],
            },
            task_type: task.as_api_str(),
        };
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Gemini embedContent request failed")?;
        let parsed: EmbedContentResponse = read_json(response, "embedContent").await?;
        Ok(parsed.embedding.values)
    }

    /// Generate with `application/json` forced as the response MIME type.
    pub async fn generate_json_text(&self, prompt: &str) -> Result<String> {
        let url = self.method_url(&self.generation_model, "generateContent");
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Gemini generateContent request failed")?;
        let parsed: GenerateResponse = read_json(response, "generateContent").await?;

        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            bail!("prompt was blocked by the model: {reason}");
        }
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("model returned no candidates"))?;
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            bail!(
                "model returned an empty response (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            );
        }
        Ok(text)
    }

    /// Every model visible to the credential, following pagination.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/models", self.base_url);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .client
                .get(&url)
                .header(API_KEY_HEADER, &self.api_key)
                .query(&[("pageSize", "100")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let response = request.send().await.context("Gemini models request failed")?;
            let page: ListModelsResponse = read_json(response, "models.list").await?;
            models.extend(page.models);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(models)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_json(&self, prompt: &str) -> Result<String> {
        self.generate_json_text(prompt).await
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(response: Response, call: &str) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        bail!("Gemini {call} failed ({status}): {body}");
    }
    serde_json::from_str(&body).with_context(|| format!("failed to parse Gemini {call} response"))
}

fn qualified_model(model: &str) -> String {
    let model = model.trim();
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}
