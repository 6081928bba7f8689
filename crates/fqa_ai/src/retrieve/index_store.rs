use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use fqa_core::corpus::Corpus;
use fqa_core::error::AppError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::vector::{BuildStats, VectorIndex};
use crate::embeddings::Embedder;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexStatus {
    pub ready: bool,
    pub model: Option<String>,
    pub dims: Option<usize>,
    pub doc_count: usize,
    #[serde(default)]
    pub corpus_fingerprint: Option<String>,
    pub updated_at: Option<String>,
    #[serde(default)]
    pub last_build: Option<LastBuild>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LastBuild {
    pub embedded: usize,
    pub reused: usize,
    pub removed: usize,
}

impl IndexStatus {
    fn not_ready() -> Self {
        Self {
            ready: false,
            model: None,
            dims: None,
            doc_count: 0,
            corpus_fingerprint: None,
            updated_at: None,
            last_build: None,
        }
    }
}

/// On-disk vector index: `status.json`, `vectors.json`, `hashes.json` under one directory.
///
/// Writes go through a temp file and a rename so a crashed build never leaves a
/// half-written file behind. Only one writer at a time; readers may be many.
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn status_path(&self) -> PathBuf {
        self.root.join("status.json")
    }

    fn vectors_path(&self) -> PathBuf {
        self.root.join("vectors.json")
    }

    fn hashes_path(&self) -> PathBuf {
        self.root.join("hashes.json")
    }

    fn ensure_dir(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.root).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to create index directory")
                .with_details(format!("path={}; err={}", self.root.display(), e))
        })
    }

    pub fn status(&self) -> Result<IndexStatus, AppError> {
        let path = self.status_path();
        if !path.exists() {
            return Ok(IndexStatus::not_ready());
        }
        read_json(&path, "index status")
    }

    /// Load the index for `corpus`. Fails with `INDEX_NOT_READY` when nothing was built and
    /// `INDEX_STALE` when the corpus changed since the last build.
    pub fn load(&self, corpus: &Corpus) -> Result<VectorIndex, AppError> {
        let st = self.status()?;
        if !st.ready {
            return Err(AppError::new(
                "INDEX_NOT_READY",
                "Index not ready; build the index before querying",
            )
            .with_details(format!("dir={}", self.root.display())));
        }
        let model = st
            .model
            .clone()
            .ok_or_else(|| AppError::new("INDEX_NOT_READY", "Index status missing model"))?;
        let dims = st
            .dims
            .ok_or_else(|| AppError::new("INDEX_NOT_READY", "Index status missing dims"))?;
        let fingerprint = corpus.fingerprint();
        if st.corpus_fingerprint.as_deref() != Some(fingerprint.as_str()) {
            return Err(AppError::new(
                "INDEX_STALE",
                "Index was built for a different corpus; rebuild the index",
            )
            .with_details(format!(
                "index={}; corpus={}",
                st.corpus_fingerprint.as_deref().unwrap_or("none"),
                fingerprint
            )));
        }

        let vectors: BTreeMap<String, Vec<f32>> = read_json(&self.vectors_path(), "index vectors")?;
        let hashes: BTreeMap<String, String> = read_json(&self.hashes_path(), "index hashes")?;
        if vectors.len() != corpus.len() {
            return Err(AppError::new("INDEX_STALE", "Index vector count does not match corpus")
                .with_details(format!("vectors={}; documents={}", vectors.len(), corpus.len())));
        }
        if let Some((id, v)) = vectors.iter().find(|(_, v)| v.len() != dims) {
            return Err(AppError::new("INDEX_STALE", "Index vector dims mismatch")
                .with_details(format!("doc_id={id}; expected={dims}; got={}", v.len())));
        }

        Ok(VectorIndex::from_parts(model, dims, fingerprint, vectors, hashes))
    }

    /// With `incremental`, vectors from a previous build with the same model are reused
    /// for passages whose text is unchanged.
    pub fn build(
        &self,
        corpus: &Corpus,
        embedder: &dyn Embedder,
        model: &str,
        updated_at: String,
        incremental: bool,
    ) -> Result<(VectorIndex, IndexStatus), AppError> {
        self.ensure_dir()?;
        let previous = if incremental {
            self.load_previous(model)?
        } else {
            None
        };
        let (index, stats) = VectorIndex::build(corpus, embedder, model, previous.as_ref())?;

        write_json(&self.vectors_path(), index.vectors(), "index vectors")?;
        write_json(&self.hashes_path(), index.hashes(), "index hashes")?;
        let BuildStats {
            embedded,
            reused,
            removed,
        } = stats;
        let st = IndexStatus {
            ready: true,
            model: Some(index.model().to_string()),
            dims: Some(index.dims()),
            doc_count: index.len(),
            corpus_fingerprint: Some(index.corpus_fingerprint().to_string()),
            updated_at: Some(updated_at),
            last_build: Some(LastBuild {
                embedded,
                reused,
                removed,
            }),
        };
        // Status last: a reader never sees `ready` before the vectors are in place.
        write_json(&self.status_path(), &st, "index status")?;
        info!(dir = %self.root.display(), docs = st.doc_count, "index persisted");
        Ok((index, st))
    }

    /// Vectors from the last build, ignoring staleness, when built with `model`.
    fn load_previous(&self, model: &str) -> Result<Option<VectorIndex>, AppError> {
        let st = self.status()?;
        if !st.ready || st.model.as_deref() != Some(model) {
            return Ok(None);
        }
        if !self.vectors_path().exists() || !self.hashes_path().exists() {
            return Ok(None);
        }
        let vectors: BTreeMap<String, Vec<f32>> = read_json(&self.vectors_path(), "index vectors")?;
        let hashes: BTreeMap<String, String> = read_json(&self.hashes_path(), "index hashes")?;
        Ok(Some(VectorIndex::from_parts(
            model.to_string(),
            st.dims.unwrap_or(0),
            st.corpus_fingerprint.unwrap_or_default(),
            vectors,
            hashes,
        )))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T, AppError> {
    let bytes = fs::read(path).map_err(|e| {
        AppError::new("INDEX_NOT_READY", format!("Failed to read {what}"))
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        AppError::new("INDEX_CORRUPT", format!("Failed to decode {what}"))
            .with_details(format!("path={}; err={}", path.display(), e))
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, what: &str) -> Result<(), AppError> {
    let tmp = path.with_extension("tmp");
    let json = serde_json::to_vec_pretty(value).map_err(|e| {
        AppError::new("INDEX_BUILD_FAILED", format!("Failed to encode {what}"))
            .with_details(e.to_string())
    })?;
    fs::write(&tmp, json).map_err(|e| {
        AppError::new("INDEX_BUILD_FAILED", format!("Failed to write {what}"))
            .with_details(format!("path={}; err={}", tmp.display(), e))
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        AppError::new("INDEX_BUILD_FAILED", format!("Failed to finalize {what} write"))
            .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
    })
}
