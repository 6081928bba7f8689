use fqa_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::client::{map_transport_error, LocalEndpoint};

const MAX_INPUT_CHARS: usize = 12_000;

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    endpoint: LocalEndpoint,
}

impl OllamaEmbedder {
    pub fn new(endpoint: LocalEndpoint) -> Self {
        Self { endpoint }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedReply {
    #[serde(default)]
    embedding: Vec<f32>,
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        // Oversized passages are cut on a char boundary.
        let prompt = match input.char_indices().nth(MAX_INPUT_CHARS) {
            Some((cut, _)) => &input[..cut],
            None => input,
        };

        let reply: EmbedReply = ureq::post(&self.endpoint.url("api/embeddings"))
            .timeout(self.endpoint.timeout())
            .send_json(EmbedRequest { model, prompt })
            .map_err(|e| map_transport_error("AI_EMBEDDINGS_FAILED", "embeddings", e))?
            .into_json()
            .map_err(|e| {
                AppError::new("AI_EMBEDDINGS_FAILED", "Embedding server returned malformed JSON")
                    .with_details(format!("model={model}; err={e}"))
            })?;

        match reply.embedding {
            v if v.is_empty() => Err(AppError::new(
                "AI_EMBEDDINGS_FAILED",
                "Embedding server returned no vector",
            )
            .with_details(format!("model={model}"))),
            v if v.iter().any(|x| !x.is_finite()) => Err(AppError::new(
                "AI_EMBEDDINGS_FAILED",
                "Embedding contained non-finite values",
            )
            .with_details(format!("model={model}"))),
            v => Ok(v),
        }
    }
}
