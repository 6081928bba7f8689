use fqa_core::config::RetrievalSettings;
use fqa_core::corpus::Corpus;
use fqa_core::domain::{Document, RankedHit};
use fqa_core::error::{AppError, Degradation, Fallback, Outcome};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::embeddings::Embedder;
use crate::rerank::{rerank_candidates, Reranker};

pub mod fusion;
pub mod index_store;
pub mod lexical;
pub mod similarity;
pub mod vector;

pub use fusion::rrf_fuse;
pub use index_store::{IndexStatus, IndexStore};
pub use lexical::LexicalIndex;
pub use vector::VectorIndex;

/// Documents for one query plus every fallback taken to produce them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Retrieved {
    pub documents: Vec<Document>,
    #[serde(default)]
    pub degradations: Vec<Degradation>,
}

/// Hybrid retrieval over one corpus: dense + BM25, fused by rank, optionally reranked.
///
/// The ticker hint biases every stage (query tags, lexical boost, ticker-first
/// partitions) but never filters: non-matching documents stay eligible.
pub struct HybridRetriever<'a> {
    corpus: &'a Corpus,
    lexical: LexicalIndex,
    vector: &'a VectorIndex,
    embedder: &'a dyn Embedder,
    reranker: Option<&'a dyn Reranker>,
    settings: RetrievalSettings,
}

impl<'a> HybridRetriever<'a> {
    pub fn new(
        corpus: &'a Corpus,
        vector: &'a VectorIndex,
        embedder: &'a dyn Embedder,
        reranker: Option<&'a dyn Reranker>,
        settings: RetrievalSettings,
    ) -> Result<Self, AppError> {
        if corpus.is_empty() {
            return Err(AppError::new("CORPUS_EMPTY", "Corpus has no documents"));
        }
        if vector.is_empty() {
            return Err(AppError::new(
                "INDEX_NOT_READY",
                "Vector index is empty; build the index first",
            ));
        }
        if vector.corpus_fingerprint() != corpus.fingerprint() {
            return Err(AppError::new(
                "INDEX_STALE",
                "Vector index was built for a different corpus; rebuild the index",
            ));
        }
        let lexical = LexicalIndex::build(corpus);
        info!(documents = corpus.len(), model = vector.model(), "retriever ready");
        Ok(Self {
            corpus,
            lexical,
            vector,
            embedder,
            reranker,
            settings,
        })
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    /// At most `k` documents for `query`.
    pub fn retrieve(
        &self,
        query: &str,
        k: usize,
        rerank: bool,
        ticker: Option<&str>,
    ) -> Result<Retrieved, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::new("AI_RETRIEVAL_FAILED", "Query must not be empty"));
        }
        let ticker = ticker
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_uppercase);
        let ticker = ticker.as_deref();
        let mut degradations = Vec::new();

        let dense = self.dense_hits(query, ticker);
        if let Some(d) = dense.degradation {
            degradations.push(d);
        }
        let lexical = self.lexical_hits(query, ticker);

        let fused = rrf_fuse(
            &[dense.value.as_slice(), lexical.as_slice()],
            self.settings.fusion_depth,
            self.settings.rrf_k,
        );
        let mut candidates = fused
            .iter()
            .filter_map(|id| self.corpus.get(id).cloned())
            .collect::<Vec<_>>();
        if let Some(t) = ticker {
            candidates = partition_by_ticker(candidates, t);
        }
        debug!(
            dense = dense.value.len(),
            lexical = lexical.len(),
            fused = candidates.len(),
            "candidates fused"
        );

        let documents = if rerank {
            let rerank_query = match ticker {
                Some(t) => format!("{query} [TICKER: {t}]"),
                None => query.to_string(),
            };
            let out = rerank_candidates(
                self.reranker,
                &rerank_query,
                candidates,
                self.settings.rerank_k,
                k,
            );
            if let Some(d) = out.degradation {
                degradations.push(d);
            }
            out.value
        } else {
            candidates.truncate(k);
            candidates
        };

        Ok(Retrieved {
            documents,
            degradations,
        })
    }

    /// Dense hits; an embedding failure degrades to an empty list.
    fn dense_hits(&self, query: &str, ticker: Option<&str>) -> Outcome<Vec<RankedHit>> {
        let text = vector::query_text(query, ticker);
        let qv = match self.vector.encode(self.embedder, &text) {
            Ok(v) => v,
            Err(e) => return Outcome::degraded(Vec::new(), Fallback::DenseSkipped, e.to_string()),
        };
        let hits = self.vector.search(&qv, self.settings.topk_dense);
        match ticker {
            Some(t) => Outcome::ok(stable_partition(hits, |h| self.hit_matches(h, t))),
            None => Outcome::ok(hits),
        }
    }

    fn lexical_hits(&self, query: &str, ticker: Option<&str>) -> Vec<RankedHit> {
        let mut tokens = lexical::tokenize(query);
        if let Some(t) = ticker {
            tokens.push(t.to_lowercase());
        }
        let mut scores = self.lexical.score(&tokens);
        if let Some(t) = ticker {
            for (i, doc) in self.corpus.documents().iter().enumerate() {
                if doc.matches_ticker(t) {
                    scores[i] = boost(scores[i], self.settings.ticker_boost);
                }
            }
        }
        // Ranking happens after the boost, so boosted documents can move up.
        self.lexical.rank(&scores, self.settings.topk_lexical)
    }

    fn hit_matches(&self, hit: &RankedHit, ticker: &str) -> bool {
        self.corpus
            .get(&hit.doc_id)
            .is_some_and(|d| d.matches_ticker(ticker))
    }
}

/// Scale `score` up by `factor` (>= 1) without ever lowering it, negative scores included.
fn boost(score: f64, factor: f64) -> f64 {
    score + score.abs() * (factor - 1.0)
}

/// Ticker-matching documents first; relative order inside each group is kept.
pub fn partition_by_ticker(docs: Vec<Document>, ticker: &str) -> Vec<Document> {
    stable_partition(docs, |d| d.matches_ticker(ticker))
}

fn stable_partition<T>(items: Vec<T>, is_first: impl Fn(&T) -> bool) -> Vec<T> {
    let (mut first, rest): (Vec<T>, Vec<T>) = items.into_iter().partition(|x| is_first(x));
    first.extend(rest);
    first
}
