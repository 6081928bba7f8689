use fqa_core::domain::Document;
use fqa_core::error::{AppError, Fallback, Outcome};
use tracing::debug;

pub mod http_rerank;

pub use http_rerank::HttpReranker;

/// Pairwise relevance model: one score per passage for the same query.
pub trait Reranker {
    fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>, AppError>;
}

/// Re-score the head of `candidates` and return at most `k` documents.
///
/// The first `rerank_k` candidates are reordered by reranker score (ties keep the incoming
/// order); the rest follow untouched. Any reranker problem returns the incoming order,
/// truncated to `k`, tagged `RerankSkipped`.
pub fn rerank_candidates(
    reranker: Option<&dyn Reranker>,
    query: &str,
    mut candidates: Vec<Document>,
    rerank_k: usize,
    k: usize,
) -> Outcome<Vec<Document>> {
    let Some(reranker) = reranker else {
        candidates.truncate(k);
        return Outcome::degraded(candidates, Fallback::RerankSkipped, "no reranker configured");
    };

    let head_len = rerank_k.min(candidates.len());
    let passages = candidates[..head_len]
        .iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>();

    let scores = match reranker.score(query, &passages) {
        Ok(s) if s.len() != head_len => {
            candidates.truncate(k);
            return Outcome::degraded(
                candidates,
                Fallback::RerankSkipped,
                format!("reranker returned {} scores for {} passages", s.len(), head_len),
            );
        }
        Ok(s) if s.iter().any(|x| !x.is_finite()) => {
            candidates.truncate(k);
            return Outcome::degraded(
                candidates,
                Fallback::RerankSkipped,
                "reranker returned a non-finite score",
            );
        }
        Ok(s) => s,
        Err(e) => {
            candidates.truncate(k);
            return Outcome::degraded(candidates, Fallback::RerankSkipped, e.to_string());
        }
    };

    let tail = candidates.split_off(head_len);
    let mut head = candidates.into_iter().zip(scores).collect::<Vec<_>>();
    // `sort_by` is stable, so equal scores keep the fused order.
    head.sort_by(|a, b| b.1.total_cmp(&a.1));
    debug!(reranked = head.len(), "rerank applied");

    let mut out = head.into_iter().map(|(d, _)| d).collect::<Vec<_>>();
    out.extend(tail);
    out.truncate(k);
    Outcome::ok(out)
}
