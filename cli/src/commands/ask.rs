use fqa_ai::pipeline::AnswerPipeline;
use fqa_ai::prompts::truncate_chars;
use fqa_ai::retrieve::HybridRetriever;
use fqa_core::config::Settings;
use fqa_core::domain::AnswerResult;
use fqa_core::error::AppError;

use super::{build_embedder, build_llm, build_reranker, index_store, load_corpus, open_store, print_json};
use crate::cli::AskArgs;

pub fn run(settings: &Settings, args: AskArgs) -> Result<(), AppError> {
    // Preconditions first: credentials, corpus, index, store.
    let llm = build_llm(settings)?;
    let corpus = load_corpus(settings)?;
    let vector = index_store(settings).load(&corpus)?;
    let store = open_store(settings)?;
    let embedder = build_embedder(settings)?;
    let reranker = build_reranker(settings)?;

    let retriever = HybridRetriever::new(
        &corpus,
        &vector,
        embedder.as_ref(),
        reranker.as_deref(),
        settings.retrieval.clone(),
    )?;
    let pipeline = AnswerPipeline::new(&retriever, &store, &llm, settings.answer.clone());
    let result = pipeline.answer(&args.question, args.ticker.as_deref())?;

    if args.json {
        print_json(&result)
    } else {
        println!("{}", render_text(&result, settings.answer.min_faithfulness));
        Ok(())
    }
}

fn render_text(result: &AnswerResult, threshold: f64) -> String {
    let mut out = String::new();
    let verdict = if result.abstained() {
        "ABSTAINED"
    } else {
        "grounded"
    };
    out.push_str(&format!(
        "Faithfulness {:.2} (threshold {:.2}) | {verdict}\n\n",
        result.faithfulness(),
        threshold
    ));
    out.push_str(result.answer());
    out.push_str("\n\n");

    if !result.claims().is_empty() {
        out.push_str("Claims:\n");
        for c in result.claims() {
            let refs = c
                .doc_refs
                .iter()
                .chain(c.sql_refs.iter())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("- {} [{}]\n", c.text, refs));
        }
        out.push('\n');
    }

    out.push_str("Text evidence:\n");
    for d in result.evidence().docs() {
        out.push_str(&format!(
            "[{}] {} {} {}: {}\n",
            d.key,
            d.document.ticker,
            d.document.form,
            d.document.id,
            truncate_chars(&d.document.text, 200)
        ));
    }

    if !result.evidence().plans().is_empty() {
        out.push_str("\nSQL evidence:\n");
        for p in result.evidence().plans() {
            out.push_str(&format!("[{}] {}\n", p.id, p.rationale));
            out.push_str(&format!("{}\n", p.sql.trim()));
            if let Some(ev) = result.evidence().sql_result(&p.id) {
                out.push_str(&format!("{}\n", truncate_chars(&ev.preview(), 800)));
            }
        }
    }

    for d in result.degradations() {
        out.push_str(&format!("\n(fallback: {}: {})", d.fallback.as_str(), d.reason));
    }
    out
}
