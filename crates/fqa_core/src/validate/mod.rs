use serde::{Deserialize, Serialize};

use crate::domain::{Claim, EvidenceBundle};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Doc,
    Sql,
}

/// A claim reference with no matching entry in the evidence bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnknownRef {
    pub claim_index: usize,
    pub kind: RefKind,
    pub key: String,
}

pub fn find_unknown_refs(claims: &[Claim], evidence: &EvidenceBundle) -> Vec<UnknownRef> {
    let mut out = Vec::new();
    for (claim_index, claim) in claims.iter().enumerate() {
        for key in claim.doc_refs.iter().filter(|k| !evidence.has_doc_key(k)) {
            out.push(UnknownRef {
                claim_index,
                kind: RefKind::Doc,
                key: key.clone(),
            });
        }
        for key in claim.sql_refs.iter().filter(|k| !evidence.has_sql_id(k)) {
            out.push(UnknownRef {
                claim_index,
                kind: RefKind::Sql,
                key: key.clone(),
            });
        }
    }
    out
}

/// Hard contract check: every `doc_refs` / `sql_refs` entry must exist in `evidence`.
pub fn validate_claim_refs(claims: &[Claim], evidence: &EvidenceBundle) -> Result<(), AppError> {
    let unknown = find_unknown_refs(claims, evidence);
    if unknown.is_empty() {
        return Ok(());
    }
    let listed = unknown
        .iter()
        .map(|u| format!("claim[{}] {:?}:{}", u.claim_index, u.kind, u.key))
        .collect::<Vec<_>>()
        .join("; ");
    Err(AppError::new(
        "CLAIM_REF_UNKNOWN",
        "Claim cites evidence that is not in the evidence bundle",
    )
    .with_details(listed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Document, PlanResult, QueryPlan, SqlEvidence};

    fn bundle() -> EvidenceBundle {
        let doc = Document {
            id: "aapl-10k-0001".to_string(),
            ticker: "AAPL".to_string(),
            form: "10-K".to_string(),
            accession: "acc".to_string(),
            text: "Net sales increased".to_string(),
            tables: vec![],
        };
        EvidenceBundle::new(
            vec![doc],
            vec![PlanResult {
                plan_id: "S1".to_string(),
                evidence: SqlEvidence::error("boom"),
            }],
            vec![QueryPlan::new("S1", "SELECT 1", "")],
        )
    }

    #[test]
    fn known_refs_pass() {
        let claim = Claim {
            text: "ok".to_string(),
            doc_refs: ["1a".to_string()].into_iter().collect(),
            sql_refs: ["S1".to_string()].into_iter().collect(),
        };
        assert!(validate_claim_refs(&[claim], &bundle()).is_ok());
    }

    #[test]
    fn unknown_refs_are_reported_per_kind() {
        let claim = Claim {
            text: "bad".to_string(),
            doc_refs: ["1a".to_string(), "7a".to_string()].into_iter().collect(),
            sql_refs: ["S9".to_string()].into_iter().collect(),
        };
        let unknown = find_unknown_refs(&[claim.clone()], &bundle());
        assert_eq!(unknown.len(), 2);
        assert_eq!(unknown[0].kind, RefKind::Doc);
        assert_eq!(unknown[0].key, "7a");
        assert_eq!(unknown[1].kind, RefKind::Sql);

        let err = validate_claim_refs(&[claim], &bundle()).unwrap_err();
        assert_eq!(err.code, "CLAIM_REF_UNKNOWN");
    }
}
