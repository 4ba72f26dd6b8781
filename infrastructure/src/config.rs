use anyhow::{anyhow, Context};
use domain::errors::PipelineError;
use dotenvy::dotenv;
use shared::types::Result;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

/// Process-wide settings, loaded once and passed by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub gemini_base_url: String,
    pub embedding_model: String,
    pub generation_model: String,
    pub reports_dir: PathBuf,
    pub db_path: PathBuf,
    pub collection_name: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub bind_address: String,
    pub static_dir: PathBuf,
}

impl Config {
    /// Read `.env` (if any) and the process environment.
    pub fn load() -> Result<Self> {
        dotenv().ok();
        Self::from_vars(&env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str, default: &str| -> String {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let api_key = vars
            .get(API_KEY_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                PipelineError::Config(format!("{API_KEY_VAR} not found in environment or .env file"))
            })?;

        let config = Self {
            api_key,
            gemini_base_url: get(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            embedding_model: get("EMBEDDING_MODEL", "models/text-embedding-004"),
            generation_model: get("GENERATION_MODEL", "models/learnlm-2.0-flash-experimental"),
            reports_dir: PathBuf::from(get("REPORTS_DIR", "reports")),
            db_path: PathBuf::from(get("DB_PATH", "db")),
            collection_name: get("COLLECTION_NAME", "steel_reports_v2"),
            chunk_size: parse_var(vars, "CHUNK_SIZE", 2000)?,
            chunk_overlap: parse_var(vars, "CHUNK_OVERLAP", 300)?,
            top_k: parse_var(vars, "TOP_K", 5)?,
            bind_address: get("BIND_ADDRESS", "127.0.0.1:8000"),
            static_dir: PathBuf::from(get("STATIC_DIR", "static")),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(PipelineError::Config(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            ))
            .into());
        }
        if self.top_k == 0 {
            return Err(PipelineError::Config("TOP_K must be at least 1".to_string()).into());
        }
        Ok(())
    }

    /// SQLite file holding every collection.
    pub fn store_file(&self) -> PathBuf {
        self.db_path.join("vectors.sqlite3")
    }
}

fn parse_var<T>(vars: &HashMap<String, String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}"))
            .map_err(|e| anyhow!(PipelineError::Config(format!("{e:#}")))),
    }
}
