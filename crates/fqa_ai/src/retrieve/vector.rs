use std::collections::BTreeMap;

use fqa_core::corpus::{sha256_hex, Corpus};
use fqa_core::domain::{Document, RankedHit};
use fqa_core::error::AppError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::similarity::{dot, normalize};
use crate::embeddings::Embedder;

/// Metadata-enriched passage text; the tags let the encoder see ticker and form.
pub fn passage_text(doc: &Document) -> String {
    format!("passage: [TICKER: {}] [FORM: {}] {}", doc.ticker, doc.form, doc.text)
}

pub fn query_text(query: &str, ticker: Option<&str>) -> String {
    match ticker.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => format!("query: {} [TICKER: {}]", query, t.to_uppercase()),
        None => format!("query: {query}"),
    }
}

/// Dense index over unit-length passage vectors; inner product is cosine similarity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorIndex {
    model: String,
    dims: usize,
    corpus_fingerprint: String,
    /// doc id -> vector
    vectors: BTreeMap<String, Vec<f32>>,
    /// doc id -> sha256 of the passage text the vector was computed from
    hashes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub embedded: usize,
    pub reused: usize,
    pub removed: usize,
}

impl VectorIndex {
    /// Embed every passage, reusing vectors from `previous` whose passage hash is unchanged
    /// and whose model matches.
    pub fn build(
        corpus: &Corpus,
        embedder: &dyn Embedder,
        model: &str,
        previous: Option<&VectorIndex>,
    ) -> Result<(Self, BuildStats), AppError> {
        let reusable = previous.filter(|p| p.model == model);
        let mut stats = BuildStats::default();
        let mut vectors = BTreeMap::new();
        let mut hashes = BTreeMap::new();
        let mut dims: Option<usize> = None;

        for doc in corpus.documents() {
            let passage = passage_text(doc);
            let hash = sha256_hex(&passage);

            let cached = reusable
                .filter(|p| p.hashes.get(&doc.id) == Some(&hash))
                .and_then(|p| p.vectors.get(&doc.id));
            let vector = match cached {
                Some(v) => {
                    stats.reused += 1;
                    v.clone()
                }
                None => {
                    let mut v = embedder.embed(model, &passage).map_err(|e| {
                        AppError::new("INDEX_BUILD_FAILED", "Failed to embed passage")
                            .with_details(format!("doc_id={}; err={}", doc.id, e))
                            .with_retryable(e.retryable)
                    })?;
                    normalize(&mut v);
                    stats.embedded += 1;
                    v
                }
            };

            match dims {
                None => dims = Some(vector.len()),
                Some(d) if d != vector.len() => {
                    return Err(AppError::new(
                        "INDEX_BUILD_FAILED",
                        "Passage embeddings have inconsistent dimensions",
                    )
                    .with_details(format!("doc_id={}; expected={}; got={}", doc.id, d, vector.len())));
                }
                Some(_) => {}
            }
            if vector.is_empty() {
                return Err(AppError::new("INDEX_BUILD_FAILED", "Passage embedding was empty")
                    .with_details(format!("doc_id={}", doc.id)));
            }

            vectors.insert(doc.id.clone(), vector);
            hashes.insert(doc.id.clone(), hash);
        }

        if let Some(p) = reusable {
            stats.removed = p.vectors.keys().filter(|id| corpus.get(id).is_none()).count();
        }
        info!(
            model,
            embedded = stats.embedded,
            reused = stats.reused,
            removed = stats.removed,
            "vector index built"
        );

        Ok((
            Self {
                model: model.to_string(),
                dims: dims.unwrap_or(0),
                corpus_fingerprint: corpus.fingerprint(),
                vectors,
                hashes,
            },
            stats,
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn corpus_fingerprint(&self) -> &str {
        &self.corpus_fingerprint
    }

    pub(crate) fn from_parts(
        model: String,
        dims: usize,
        corpus_fingerprint: String,
        vectors: BTreeMap<String, Vec<f32>>,
        hashes: BTreeMap<String, String>,
    ) -> Self {
        Self {
            model,
            dims,
            corpus_fingerprint,
            vectors,
            hashes,
        }
    }

    pub(crate) fn vectors(&self) -> &BTreeMap<String, Vec<f32>> {
        &self.vectors
    }

    pub(crate) fn hashes(&self) -> &BTreeMap<String, String> {
        &self.hashes
    }

    /// Encode `text` with the model the index was built with.
    pub fn encode(&self, embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>, AppError> {
        let mut v = embedder.embed(&self.model, text)?;
        if v.len() != self.dims {
            return Err(AppError::new(
                "AI_EMBEDDINGS_FAILED",
                "Query embedding dims do not match index dims",
            )
            .with_details(format!("index_dims={}; query_dims={}", self.dims, v.len())));
        }
        normalize(&mut v);
        Ok(v)
    }

    /// Top `top_n` by inner product. Equal scores order by doc id.
    pub fn search(&self, query_vector: &[f32], top_n: usize) -> Vec<RankedHit> {
        let mut hits = self
            .vectors
            .iter()
            .map(|(id, v)| (id.as_str(), dot(query_vector, v)))
            .collect::<Vec<_>>();
        hits.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(b.0)));
        hits.truncate(top_n);
        debug!(hits = hits.len(), "dense search");
        hits.into_iter()
            .map(|(id, score)| RankedHit::new(id, f64::from(score)))
            .collect()
    }
}
