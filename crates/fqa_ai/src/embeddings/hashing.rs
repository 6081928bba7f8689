use fqa_core::error::AppError;
use sha2::{Digest, Sha256};

use super::Embedder;
use crate::retrieve::similarity::normalize;

/// Offline embedder: signed feature hashing of unigrams and bigrams into a fixed width.
///
/// Deterministic across processes and platforms, so a persisted index stays queryable.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(8) }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let mut vector = vec![0_f32; self.dims];
        for feature in features(input) {
            let hash = stable_hash(&feature);
            let index = (hash % self.dims as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            let weight = 1.0 + ((hash >> 48) & 0xFF) as f32 / 255.0;
            vector[index] += sign * weight;
        }
        normalize(&mut vector);
        Ok(vector)
    }
}

fn stable_hash(value: &str) -> u64 {
    let digest = Sha256::digest(value.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

fn features(payload: &str) -> Vec<String> {
    let words = payload
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>();

    let mut out = Vec::with_capacity(words.len() * 2);
    for (i, word) in words.iter().enumerate() {
        out.push(format!("w:{word}"));
        if let Some(next) = words.get(i + 1) {
            out.push(format!("b:{word}_{next}"));
        }
    }
    out
}
