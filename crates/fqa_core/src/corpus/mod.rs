use std::collections::HashMap;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::info;

use crate::domain::Document;
use crate::error::AppError;

/// Read-only document collection shared by both indexes for the life of the process.
#[derive(Debug, Clone)]
pub struct Corpus {
    docs: Vec<Document>,
    by_id: HashMap<String, usize>,
}

impl Corpus {
    pub fn from_documents(docs: Vec<Document>) -> Result<Self, AppError> {
        if docs.is_empty() {
            return Err(AppError::new(
                "CORPUS_EMPTY",
                "Corpus has no documents; run ingestion first",
            ));
        }
        let mut by_id = HashMap::with_capacity(docs.len());
        for (i, d) in docs.iter().enumerate() {
            if d.id.trim().is_empty() {
                return Err(AppError::new("CORPUS_INVALID", "Document id must not be empty")
                    .with_details(format!("position={i}")));
            }
            if by_id.insert(d.id.clone(), i).is_some() {
                return Err(AppError::new("CORPUS_INVALID", "Duplicate document id")
                    .with_details(format!("id={}", d.id)));
            }
        }
        Ok(Self { docs, by_id })
    }

    /// One JSON document per line; blank lines are skipped.
    pub fn load_jsonl(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Err(AppError::new(
                "CORPUS_MISSING",
                "No corpus found; run ingestion first",
            )
            .with_details(format!("path={}", path.display())));
        }
        let raw = fs::read_to_string(path).map_err(|e| {
            AppError::new("CORPUS_MISSING", "Failed to read corpus file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;

        let mut docs = Vec::new();
        for (line_no, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let doc: Document = serde_json::from_str(line).map_err(|e| {
                AppError::new("CORPUS_INVALID", "Failed to parse corpus line")
                    .with_details(format!("line={}; err={}", line_no + 1, e))
            })?;
            docs.push(doc);
        }
        let corpus = Self::from_documents(docs)?;
        info!(documents = corpus.len(), path = %path.display(), "corpus loaded");
        Ok(corpus)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.by_id.get(id).map(|&i| &self.docs[i])
    }

    /// Covers everything that reaches an indexed passage: id, ticker, form and text, in
    /// corpus order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for d in &self.docs {
            for field in [&d.id, &d.ticker, &d.form] {
                hasher.update(field.as_bytes());
                hasher.update([0u8]);
            }
            hasher.update(sha256_hex(&d.text).as_bytes());
            hasher.update([b'\n']);
        }
        hex::encode(hasher.finalize())
    }
}

pub fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, text: &str) -> Document {
        Document {
            id: id.to_string(),
            ticker: "MSFT".to_string(),
            form: "10-Q".to_string(),
            accession: "acc".to_string(),
            text: text.to_string(),
            tables: vec![],
        }
    }

    #[test]
    fn rejects_empty_and_duplicate_ids() {
        assert_eq!(Corpus::from_documents(vec![]).unwrap_err().code, "CORPUS_EMPTY");
        let err = Corpus::from_documents(vec![doc("a", "x"), doc("a", "y")]).unwrap_err();
        assert_eq!(err.code, "CORPUS_INVALID");
    }

    #[test]
    fn fingerprint_tracks_text_edits() {
        let a = Corpus::from_documents(vec![doc("a", "x"), doc("b", "y")]).unwrap();
        let b = Corpus::from_documents(vec![doc("a", "x"), doc("b", "y")]).unwrap();
        let c = Corpus::from_documents(vec![doc("a", "x"), doc("b", "z")]).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.get("b").map(|d| d.text.as_str()), Some("y"));
    }

    #[test]
    fn fingerprint_tracks_ticker_and_form_edits() {
        let base = Corpus::from_documents(vec![doc("a", "x")]).unwrap();
        let mut moved = doc("a", "x");
        moved.ticker = "NVDA".to_string();
        let mut refiled = doc("a", "x");
        refiled.form = "10-K".to_string();

        let moved = Corpus::from_documents(vec![moved]).unwrap();
        let refiled = Corpus::from_documents(vec![refiled]).unwrap();
        assert_ne!(base.fingerprint(), moved.fingerprint());
        assert_ne!(base.fingerprint(), refiled.fingerprint());
        assert_ne!(moved.fingerprint(), refiled.fingerprint());
    }
}
