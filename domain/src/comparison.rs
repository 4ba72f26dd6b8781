//! Request and result shapes of a company comparison.

use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_BASE_COMPANY: &str = "Tata Steel";

fn default_base_company() -> String {
    DEFAULT_BASE_COMPANY.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub query: String,
    pub competitors: Vec<String>,
    #[serde(default = "default_base_company")]
    pub base_company: String,
}

impl ComparisonRequest {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.competitors.is_empty() {
            return Err(PipelineError::Validation(
                "competitors must contain at least one company".to_string(),
            ));
        }
        if self.base_company.trim().is_empty() {
            return Err(PipelineError::Validation(
                "base_company must not be empty".to_string(),
            ));
        }
        if self.competitors.iter().any(|c| c.trim().is_empty()) {
            return Err(PipelineError::Validation(
                "competitor names must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Base company first, then competitors in request order.
    pub fn companies(&self) -> Vec<String> {
        std::iter::once(self.base_company.clone())
            .chain(self.competitors.iter().cloned())
            .collect()
    }
}

/// One metric row: `{"Metric": "...", "<company>": "<value>", ...}`. Company keys keep the
/// order the model wrote them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(rename = "Metric")]
    pub metric: String,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<serde_json::Number>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Deserialize)]
struct ResultShape {
    table_data: Vec<TableRow>,
    graph_data: GraphData,
}

/// Model output that passed the shape check. The typed fields are a read-only view;
/// clients receive `as_json()`, the model's JSON text unchanged, including any keys the
/// typed view does not model.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    pub table_data: Vec<TableRow>,
    pub graph_data: GraphData,
    json: String,
}

impl ComparisonResult {
    /// Parse raw model text. Non-JSON and wrong-shape output are reported separately.
    pub fn from_model_output(raw: &str) -> Result<Self, PipelineError> {
        let raw = raw.trim();
        let value: Value =
            serde_json::from_str(raw).map_err(|e| PipelineError::InvalidJson(e.to_string()))?;
        Self::validate(value, raw.to_string())
    }

    pub fn from_value(value: Value) -> Result<Self, PipelineError> {
        let json = value.to_string();
        Self::validate(value, json)
    }

    fn validate(value: Value, json: String) -> Result<Self, PipelineError> {
        let shape: ResultShape = serde_json::from_value(value)
            .map_err(|e| PipelineError::MalformedOutput(e.to_string()))?;
        let result = Self {
            table_data: shape.table_data,
            graph_data: shape.graph_data,
            json,
        };
        result.check_table_values()?;
        Ok(result)
    }

    fn check_table_values(&self) -> Result<(), PipelineError> {
        for row in &self.table_data {
            if let Some((company, _)) = row
                .values
                .iter()
                .find(|(_, v)| v.is_array() || v.is_object())
            {
                return Err(PipelineError::MalformedOutput(format!(
                    "table_data value for '{}' in metric '{}' is not a scalar",
                    company, row.metric
                )));
            }
        }
        Ok(())
    }

    pub fn as_json(&self) -> &str {
        &self.json
    }

    pub fn into_json(self) -> String {
        self.json
    }

    /// Companies that some table row has no value for.
    pub fn missing_companies(&self, companies: &[String]) -> Vec<String> {
        companies
            .iter()
            .filter(|c| self.table_data.iter().any(|row| !row.values.contains_key(c.as_str())))
            .cloned()
            .collect()
    }
}
