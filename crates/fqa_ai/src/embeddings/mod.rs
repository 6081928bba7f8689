use fqa_core::error::AppError;

pub mod hashing;
pub mod ollama_embed;

/// Text -> dense vector. Queries and passages must go through the same model, so the
/// vector index passes the model id it was built with on every call.
pub trait Embedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError>;
}

pub use hashing::HashingEmbedder;
pub use ollama_embed::OllamaEmbedder;
