use std::time::Duration;

use fqa_ai::client::{LocalEndpoint, RemoteEndpoint};
use fqa_ai::embeddings::{Embedder, HashingEmbedder, OllamaEmbedder};
use fqa_ai::llm::chat_client::ChatCompletionsLlm;
use fqa_ai::rerank::{HttpReranker, Reranker};
use fqa_ai::retrieve::IndexStore;
use fqa_core::config::{EmbedBackend, Settings};
use fqa_core::corpus::Corpus;
use fqa_core::db::SqliteStore;
use fqa_core::error::AppError;
use serde::Serialize;

pub mod ask;
pub mod index;
pub mod retrieve;
pub mod tables;

pub(crate) fn load_corpus(settings: &Settings) -> Result<Corpus, AppError> {
    Corpus::load_jsonl(&settings.paths.corpus_path)
}

pub(crate) fn index_store(settings: &Settings) -> IndexStore {
    IndexStore::open(settings.paths.index_dir.clone())
}

pub(crate) fn open_store(settings: &Settings) -> Result<SqliteStore, AppError> {
    let path = &settings.paths.db_path;
    if !path.exists() {
        return Err(AppError::new("DB_MISSING", "Relational store not found; load tables first")
            .with_details(format!("path={}", path.display())));
    }
    SqliteStore::open_read_only(path)
}

pub(crate) fn build_embedder(settings: &Settings) -> Result<Box<dyn Embedder>, AppError> {
    match settings.models.embed_backend {
        EmbedBackend::Hashing => Ok(Box::new(HashingEmbedder::new(settings.models.embed_dims))),
        EmbedBackend::Ollama => {
            let endpoint = LocalEndpoint::new(
                &settings.endpoints.embed_base_url,
                Duration::from_millis(settings.endpoints.embed_timeout_ms),
            )?;
            Ok(Box::new(OllamaEmbedder::new(endpoint)))
        }
    }
}

/// `None` when no reranker endpoint is configured.
pub(crate) fn build_reranker(settings: &Settings) -> Result<Option<Box<dyn Reranker>>, AppError> {
    let Some(base_url) = settings.endpoints.rerank_base_url.as_deref() else {
        return Ok(None);
    };
    let endpoint = LocalEndpoint::new(
        base_url,
        Duration::from_millis(settings.endpoints.rerank_timeout_ms),
    )?;
    Ok(Some(Box::new(HttpReranker::new(
        endpoint,
        settings.models.reranker_model.clone(),
    ))))
}

pub(crate) fn build_llm(settings: &Settings) -> Result<ChatCompletionsLlm, AppError> {
    let endpoint = RemoteEndpoint::new(
        &settings.endpoints.chat_base_url,
        settings.chat_api_key.as_deref(),
        Duration::from_millis(settings.endpoints.chat_timeout_ms),
    )?;
    Ok(ChatCompletionsLlm::new(endpoint, settings.models.chat_model.clone()))
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        AppError::new("CLI_OUTPUT_FAILED", "Failed to encode output").with_details(e.to_string())
    })?;
    println!("{json}");
    Ok(())
}
