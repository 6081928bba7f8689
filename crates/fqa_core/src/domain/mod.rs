use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

mod catalog;
mod evidence;
mod tabular;

pub use catalog::{QueryPlan, TableCatalog};
pub use evidence::{AnswerResult, EvidenceBundle, KeyedDocument, PlanResult};
pub use tabular::{Cell, SqlEvidence, TabularResult, SQL_ERROR_PREFIX};

/// Immutable unit of retrievable filing text.
///
/// Notes:
/// - `id` is globally unique within a corpus and stable across index rebuilds.
/// - `tables` names the relational tables extracted from the same filing, if any.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub ticker: String,
    pub form: String,
    pub accession: String,
    pub text: String,
    #[serde(default)]
    pub tables: Vec<String>,
}

impl Document {
    /// Case-insensitive ticker equality; surrounding whitespace is ignored.
    pub fn matches_ticker(&self, ticker: &str) -> bool {
        let wanted = ticker.trim();
        !wanted.is_empty() && self.ticker.trim().eq_ignore_ascii_case(wanted)
    }
}

/// One method's score for one document. Scores from different methods are not comparable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedHit {
    pub doc_id: String,
    pub score: f64,
}

impl RankedHit {
    pub fn new(doc_id: impl Into<String>, score: f64) -> Self {
        Self {
            doc_id: doc_id.into(),
            score,
        }
    }
}

/// An atomic statement of the answer and the evidence keys it relies on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claim {
    pub text: String,
    #[serde(default)]
    pub doc_refs: BTreeSet<String>,
    #[serde(default)]
    pub sql_refs: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Retrieving,
    Planning,
    ExecutingSql,
    Binding,
    Judging,
    Done,
    Failed,
}

impl PipelineState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Retrieving => "RETRIEVING",
            Self::Planning => "PLANNING",
            Self::ExecutingSql => "EXECUTING_SQL",
            Self::Binding => "BINDING",
            Self::Judging => "JUDGING",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }

    /// The single forward successor; terminal states have none.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Retrieving => Some(Self::Planning),
            Self::Planning => Some(Self::ExecutingSql),
            Self::ExecutingSql => Some(Self::Binding),
            Self::Binding => Some(Self::Judging),
            Self::Judging => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }
}
