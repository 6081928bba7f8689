use fqa_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::Reranker;
use crate::client::{map_transport_error, LocalEndpoint};

/// Cross-encoder served locally behind a `/rerank` endpoint
/// (text-embeddings-inference shape: `{query, texts}` -> `[{index, score}]`).
#[derive(Debug, Clone)]
pub struct HttpReranker {
    endpoint: LocalEndpoint,
    model: String,
}

impl HttpReranker {
    pub fn new(endpoint: LocalEndpoint, model: impl Into<String>) -> Self {
        Self {
            endpoint,
            model: model.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    texts: &'a [&'a str],
    raw_scores: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct RerankItem {
    index: usize,
    score: f32,
}

impl Reranker for HttpReranker {
    fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>, AppError> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }
        let req = RerankRequest {
            model: &self.model,
            query,
            texts: passages,
            raw_scores: false,
        };
        let body = serde_json::to_value(req).map_err(|e| {
            AppError::new("AI_RERANK_FAILED", "Failed to encode rerank request")
                .with_details(e.to_string())
        })?;
        let resp = ureq::post(&self.endpoint.url("rerank"))
            .timeout(self.endpoint.timeout())
            .send_json(body)
            .map_err(|e| map_transport_error("AI_RERANK_FAILED", "rerank", e))?;
        let items: Vec<RerankItem> = resp.into_json().map_err(|e| {
            AppError::new("AI_RERANK_FAILED", "Failed to decode rerank response")
                .with_details(e.to_string())
        })?;

        // The server returns items sorted by score; put them back in passage order.
        let mut scores = vec![f32::NAN; passages.len()];
        for item in items {
            let slot = scores.get_mut(item.index).ok_or_else(|| {
                AppError::new("AI_RERANK_FAILED", "Rerank response index out of range")
                    .with_details(format!("index={}; passages={}", item.index, passages.len()))
            })?;
            *slot = item.score;
        }
        if scores.iter().any(|s| s.is_nan()) {
            return Err(AppError::new(
                "AI_RERANK_FAILED",
                "Rerank response did not score every passage",
            ));
        }
        Ok(scores)
    }
}
