use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const ENV_CHAT_API_KEY: &str = "FQA_CHAT_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalSettings {
    pub topk_dense: usize,
    pub topk_lexical: usize,
    /// Per-list truncation depth applied before fusion.
    pub fusion_depth: usize,
    pub rrf_k: u32,
    pub final_k: usize,
    pub rerank_k: usize,
    /// Multiplier for lexical scores of ticker-matching documents. Hand-tuned.
    pub ticker_boost: f64,
    pub rerank: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            topk_dense: 30,
            topk_lexical: 30,
            fusion_depth: 60,
            rrf_k: 60,
            final_k: 10,
            rerank_k: 12,
            ticker_boost: 1.15,
            rerank: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnswerSettings {
    /// Faithfulness below this abstains. Hand-tuned.
    pub min_faithfulness: f64,
    pub abstain_phrase: String,
    pub snippet_chars: usize,
    pub sql_preview_chars: usize,
    pub judge_snippets: usize,
    pub judge_sql_previews: usize,
    pub judge_sql_chars: usize,
    pub max_plans: usize,
    pub preview_rows: usize,
    pub catalog_max_tables: usize,
    pub catalog_max_columns: usize,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            min_faithfulness: 0.58,
            abstain_phrase: "not enough evidence".to_string(),
            snippet_chars: 450,
            sql_preview_chars: 800,
            judge_snippets: 8,
            judge_sql_previews: 3,
            judge_sql_chars: 600,
            max_plans: 3,
            preview_rows: 50,
            catalog_max_tables: 80,
            catalog_max_columns: 16,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbedBackend {
    Hashing,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelSettings {
    pub chat_model: String,
    pub embed_model: String,
    pub embed_backend: EmbedBackend,
    pub embed_dims: usize,
    pub reranker_model: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            chat_model: "llama-3.3-70b-versatile".to_string(),
            embed_model: "local-hash-v1".to_string(),
            embed_backend: EmbedBackend::Hashing,
            embed_dims: 384,
            reranker_model: "BAAI/bge-reranker-base".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointSettings {
    pub chat_base_url: String,
    pub embed_base_url: String,
    pub rerank_base_url: Option<String>,
    pub chat_timeout_ms: u64,
    pub embed_timeout_ms: u64,
    pub rerank_timeout_ms: u64,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            chat_base_url: "https://api.groq.com/openai/v1".to_string(),
            embed_base_url: "http://127.0.0.1:11434".to_string(),
            rerank_base_url: None,
            chat_timeout_ms: 60_000,
            embed_timeout_ms: 10_000,
            rerank_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathSettings {
    pub corpus_path: PathBuf,
    pub index_dir: PathBuf,
    pub db_path: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            corpus_path: PathBuf::from("data/processed/corpus.jsonl"),
            index_dir: PathBuf::from("data/index"),
            db_path: PathBuf::from("data/sql/finance.sqlite"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub retrieval: RetrievalSettings,
    pub answer: AnswerSettings,
    pub models: ModelSettings,
    pub endpoints: EndpointSettings,
    pub paths: PathSettings,
    /// Only ever read from the environment.
    #[serde(skip)]
    pub chat_api_key: Option<String>,
}

impl Settings {
    /// Load settings: optional TOML file, then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut settings = match path {
            Some(p) => Self::from_toml_file(p)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            AppError::new("CONFIG_READ_FAILED", "Failed to read config file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, AppError> {
        toml::from_str(raw).map_err(|e| {
            AppError::new("CONFIG_PARSE_FAILED", "Failed to parse config file")
                .with_details(e.to_string())
        })
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty(ENV_CHAT_API_KEY) {
            self.chat_api_key = Some(v.trim().to_string());
        }
        if let Some(v) = non_empty("FQA_CHAT_MODEL") {
            self.models.chat_model = v;
        }
        if let Some(v) = non_empty("FQA_EMBED_MODEL") {
            self.models.embed_model = v;
        }
        if let Some(v) = non_empty("FQA_RERANKER_MODEL") {
            self.models.reranker_model = v;
        }
        if let Some(v) = non_empty("FQA_DB_PATH") {
            self.paths.db_path = PathBuf::from(v);
        }
        if let Some(v) = non_empty("FQA_CORPUS_PATH") {
            self.paths.corpus_path = PathBuf::from(v);
        }
        if let Some(v) = non_empty("FQA_INDEX_DIR") {
            self.paths.index_dir = PathBuf::from(v);
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let r = &self.retrieval;
        if !(r.ticker_boost > 1.0) {
            return Err(invalid("retrieval.ticker_boost must be greater than 1")
                .with_details(format!("ticker_boost={}", r.ticker_boost)));
        }
        for (name, value) in [
            ("retrieval.final_k", r.final_k),
            ("retrieval.rerank_k", r.rerank_k),
            ("retrieval.fusion_depth", r.fusion_depth),
            ("retrieval.topk_dense", r.topk_dense),
            ("retrieval.topk_lexical", r.topk_lexical),
        ] {
            if value == 0 {
                return Err(invalid(format!("{name} must be at least 1")));
            }
        }
        if r.rrf_k == 0 {
            return Err(invalid("retrieval.rrf_k must be at least 1"));
        }

        let a = &self.answer;
        if !(0.0..=1.0).contains(&a.min_faithfulness) {
            return Err(invalid("answer.min_faithfulness must be within [0, 1]")
                .with_details(format!("min_faithfulness={}", a.min_faithfulness)));
        }
        if a.abstain_phrase.trim().is_empty() {
            return Err(invalid("answer.abstain_phrase must not be empty"));
        }
        if a.max_plans == 0 || a.preview_rows == 0 {
            return Err(invalid("answer.max_plans and answer.preview_rows must be at least 1"));
        }
        if self.models.embed_backend == EmbedBackend::Hashing && self.models.embed_dims < 8 {
            return Err(invalid("models.embed_dims must be at least 8"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::new("CONFIG_INVALID", message)
}
