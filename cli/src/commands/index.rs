use std::time::Duration;

use fqa_ai::client::LocalEndpoint;
use fqa_core::config::{EmbedBackend, Settings};
use fqa_core::error::AppError;
use fqa_core::now_rfc3339_utc;
use tracing::info;

use super::{build_embedder, index_store, load_corpus, print_json};
use crate::cli::IndexArgs;

pub fn run(settings: &Settings, args: IndexArgs) -> Result<(), AppError> {
    let corpus = load_corpus(settings)?;
    if settings.models.embed_backend == EmbedBackend::Ollama {
        LocalEndpoint::new(
            &settings.endpoints.embed_base_url,
            Duration::from_millis(settings.endpoints.embed_timeout_ms),
        )?
        .health_check()?;
    }
    let embedder = build_embedder(settings)?;
    let store = index_store(settings);

    info!(
        documents = corpus.len(),
        model = %settings.models.embed_model,
        full = args.full,
        "building vector index"
    );
    let (_, status) = store.build(
        &corpus,
        embedder.as_ref(),
        &settings.models.embed_model,
        now_rfc3339_utc()?,
        !args.full,
    )?;
    print_json(&status)
}
