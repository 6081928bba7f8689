use serde::{Deserialize, Serialize};
use std::fmt;

/// Single structured error shape shared by the core, the AI layer and the CLI.
///
/// `code` is a stable SCREAMING_SNAKE identifier; callers branch on it, never on
/// `message`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

/// Codes that abort a question before any pipeline state is entered.
const PRECONDITION_CODES: &[&str] = &[
    "CORPUS_MISSING",
    "CORPUS_EMPTY",
    "CORPUS_INVALID",
    "INDEX_NOT_READY",
    "INDEX_STALE",
    "AI_CREDENTIALS_MISSING",
    "PIPELINE_QUESTION_EMPTY",
];

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn is_precondition(&self) -> bool {
        PRECONDITION_CODES.contains(&self.code.as_str())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

/// The documented fallback a component took instead of failing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// Query embedding failed; retrieval ran on the lexical index alone.
    DenseSkipped,
    /// Reranker unavailable or misbehaving; pre-rerank order kept.
    RerankSkipped,
    /// Query generation produced no acceptable plan.
    PlannerEmpty,
    /// The deterministic period-over-period query replaced the planned set.
    SqlSynthesized,
    /// Binder output was not the structured object; raw text kept, no claims.
    BinderUnstructured,
    /// Binder capability unreachable; a fixed insufficient-evidence answer was used.
    BinderUnavailable,
    /// Judge unreachable or malformed; faithfulness forced to 0.0.
    JudgeFailed,
    /// Claim references pointing outside the evidence bundle were removed.
    ClaimRefsDropped,
}

impl Fallback {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DenseSkipped => "dense_skipped",
            Self::RerankSkipped => "rerank_skipped",
            Self::PlannerEmpty => "planner_empty",
            Self::SqlSynthesized => "sql_synthesized",
            Self::BinderUnstructured => "binder_unstructured",
            Self::BinderUnavailable => "binder_unavailable",
            Self::JudgeFailed => "judge_failed",
            Self::ClaimRefsDropped => "claim_refs_dropped",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Degradation {
    pub fallback: Fallback,
    pub reason: String,
}

impl Degradation {
    pub fn new(fallback: Fallback, reason: impl Into<String>) -> Self {
        Self {
            fallback,
            reason: reason.into(),
        }
    }
}

/// A component result that may have been produced by a fallback path.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub degradation: Option<Degradation>,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            degradation: None,
        }
    }

    pub fn degraded(value: T, fallback: Fallback, reason: impl Into<String>) -> Self {
        let degradation = Degradation::new(fallback, reason);
        tracing::warn!(
            fallback = degradation.fallback.as_str(),
            reason = %degradation.reason,
            "capability degraded"
        );
        Self {
            value,
            degradation: Some(degradation),
        }
    }

    pub fn fallback(&self) -> Option<Fallback> {
        self.degradation.as_ref().map(|d| d.fallback)
    }
}
