use fqa_ai::retrieve::HybridRetriever;
use fqa_core::config::Settings;
use fqa_core::error::AppError;

use super::{build_embedder, build_reranker, index_store, load_corpus, print_json};
use crate::cli::RetrieveArgs;

pub fn run(settings: &Settings, args: RetrieveArgs) -> Result<(), AppError> {
    let corpus = load_corpus(settings)?;
    let vector = index_store(settings).load(&corpus)?;
    let embedder = build_embedder(settings)?;
    let reranker = build_reranker(settings)?;

    let retriever = HybridRetriever::new(
        &corpus,
        &vector,
        embedder.as_ref(),
        reranker.as_deref(),
        settings.retrieval.clone(),
    )?;
    let k = args.k.unwrap_or(settings.retrieval.final_k);
    let rerank = settings.retrieval.rerank && !args.no_rerank;
    let retrieved = retriever.retrieve(&args.query, k, rerank, args.ticker.as_deref())?;
    print_json(&retrieved)
}
