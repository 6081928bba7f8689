use serde::{Deserialize, Serialize};

use crate::error::{AppError, Degradation};
use crate::validate::validate_claim_refs;

use super::{Claim, Document, QueryPlan, SqlEvidence};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyedDocument {
    pub key: String,
    pub document: Document,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanResult {
    pub plan_id: String,
    pub evidence: SqlEvidence,
}

/// Everything an answer may cite. Built once per question and frozen before judging.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EvidenceBundle {
    docs: Vec<KeyedDocument>,
    sql: Vec<PlanResult>,
    plans: Vec<QueryPlan>,
}

impl EvidenceBundle {
    /// Text evidence is keyed `1a`, `2a`, ... in retrieval order.
    pub fn new(docs: Vec<Document>, sql: Vec<PlanResult>, plans: Vec<QueryPlan>) -> Self {
        let docs = docs
            .into_iter()
            .enumerate()
            .map(|(i, document)| KeyedDocument {
                key: doc_key(i),
                document,
            })
            .collect();
        Self { docs, sql, plans }
    }

    pub fn docs(&self) -> &[KeyedDocument] {
        &self.docs
    }

    pub fn sql(&self) -> &[PlanResult] {
        &self.sql
    }

    pub fn plans(&self) -> &[QueryPlan] {
        &self.plans
    }

    pub fn doc(&self, key: &str) -> Option<&Document> {
        self.docs
            .iter()
            .find(|d| d.key == key)
            .map(|d| &d.document)
    }

    pub fn sql_result(&self, plan_id: &str) -> Option<&SqlEvidence> {
        self.sql
            .iter()
            .find(|r| r.plan_id == plan_id)
            .map(|r| &r.evidence)
    }

    /// The plan behind a SQL evidence id, for callers that want to re-execute it.
    pub fn plan(&self, plan_id: &str) -> Option<&QueryPlan> {
        self.plans.iter().find(|p| p.id == plan_id)
    }

    pub fn has_doc_key(&self, key: &str) -> bool {
        self.docs.iter().any(|d| d.key == key)
    }

    pub fn has_sql_id(&self, plan_id: &str) -> bool {
        self.sql.iter().any(|r| r.plan_id == plan_id)
    }
}

pub fn doc_key(index: usize) -> String {
    format!("{}a", index + 1)
}

/// The per-question answer. Only `assemble` constructs one, which enforces claim soundness;
/// deserialization goes through it as well.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "UncheckedAnswerResult")]
pub struct AnswerResult {
    answer: String,
    claims: Vec<Claim>,
    evidence: EvidenceBundle,
    faithfulness: f64,
    abstained: bool,
    #[serde(default)]
    degradations: Vec<Degradation>,
}

impl AnswerResult {
    /// Fails with `CLAIM_REF_UNKNOWN` if any claim cites evidence absent from `evidence`.
    pub fn assemble(
        answer: String,
        claims: Vec<Claim>,
        evidence: EvidenceBundle,
        faithfulness: f64,
        abstained: bool,
        degradations: Vec<Degradation>,
    ) -> Result<Self, AppError> {
        validate_claim_refs(&claims, &evidence)?;
        if !(0.0..=1.0).contains(&faithfulness) {
            return Err(AppError::new(
                "PIPELINE_SCORE_OUT_OF_RANGE",
                "Faithfulness must be within [0, 1]",
            )
            .with_details(format!("faithfulness={faithfulness}")));
        }
        Ok(Self {
            answer,
            claims,
            evidence,
            faithfulness,
            abstained,
            degradations,
        })
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    pub fn evidence(&self) -> &EvidenceBundle {
        &self.evidence
    }

    pub fn faithfulness(&self) -> f64 {
        self.faithfulness
    }

    pub fn abstained(&self) -> bool {
        self.abstained
    }

    pub fn degradations(&self) -> &[Degradation] {
        &self.degradations
    }
}

#[derive(Deserialize)]
struct UncheckedAnswerResult {
    answer: String,
    claims: Vec<Claim>,
    evidence: EvidenceBundle,
    faithfulness: f64,
    abstained: bool,
    #[serde(default)]
    degradations: Vec<Degradation>,
}

impl TryFrom<UncheckedAnswerResult> for AnswerResult {
    type Error = AppError;

    fn try_from(raw: UncheckedAnswerResult) -> Result<Self, AppError> {
        AnswerResult::assemble(
            raw.answer,
            raw.claims,
            raw.evidence,
            raw.faithfulness,
            raw.abstained,
            raw.degradations,
        )
    }
}
