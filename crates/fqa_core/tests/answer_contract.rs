use fqa_core::domain::{AnswerResult, Claim, Document, EvidenceBundle, PlanResult, QueryPlan, SqlEvidence};
use fqa_core::error::{Degradation, Fallback};
use pretty_assertions::assert_eq;

fn bundle() -> EvidenceBundle {
    let docs = vec![
        Document {
            id: "aapl-1".to_string(),
            ticker: "AAPL".to_string(),
            form: "10-K".to_string(),
            accession: "0000320193-24-000123".to_string(),
            text: "Services net sales increased.".to_string(),
            tables: vec![],
        },
        Document {
            id: "aapl-2".to_string(),
            ticker: "AAPL".to_string(),
            form: "10-Q".to_string(),
            accession: "0000320193-24-000456".to_string(),
            text: "iPhone net sales declined.".to_string(),
            tables: vec![],
        },
    ];
    let sql = vec![PlanResult {
        plan_id: "S1".to_string(),
        evidence: SqlEvidence::error("no such column: rev"),
    }];
    let plans = vec![QueryPlan::new("S1", "SELECT rev FROM AAPL_10K_tbl0", "revenue")];
    EvidenceBundle::new(docs, sql, plans)
}

fn claim(doc_refs: &[&str], sql_refs: &[&str]) -> Claim {
    Claim {
        text: "Services grew".to_string(),
        doc_refs: doc_refs.iter().map(|s| s.to_string()).collect(),
        sql_refs: sql_refs.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn documents_are_keyed_in_retrieval_order() {
    let b = bundle();
    let keys = b.docs().iter().map(|d| d.key.as_str()).collect::<Vec<_>>();
    assert_eq!(keys, vec!["1a", "2a"]);
    assert_eq!(b.doc("2a").map(|d| d.id.as_str()), Some("aapl-2"));
    assert!(b.doc("3a").is_none());
    assert!(b.has_sql_id("S1"));
    assert!(b.sql_result("S1").is_some_and(SqlEvidence::is_error));
}

#[test]
fn results_citing_only_bundle_keys_assemble() {
    let result = AnswerResult::assemble(
        "Services grew [1a].".to_string(),
        vec![claim(&["1a", "2a"], &["S1"])],
        bundle(),
        0.75,
        false,
        vec![Degradation::new(Fallback::RerankSkipped, "no reranker configured")],
    )
    .expect("assemble");
    assert_eq!(result.claims().len(), 1);
    assert_eq!(result.degradations()[0].fallback, Fallback::RerankSkipped);
}

#[test]
fn a_fabricated_key_rejects_the_whole_result() {
    let err = AnswerResult::assemble(
        "Services grew [3a].".to_string(),
        vec![claim(&["1a"], &[]), claim(&["3a"], &["S2"])],
        bundle(),
        0.9,
        false,
        vec![],
    )
    .unwrap_err();
    assert_eq!(err.code, "CLAIM_REF_UNKNOWN");
    let details = err.details.unwrap_or_default();
    assert!(details.contains("3a"));
    assert!(details.contains("S2"));
}

#[test]
fn scores_outside_the_unit_interval_are_rejected() {
    for score in [-0.01, 1.01, f64::NAN] {
        let err = AnswerResult::assemble(
            "x".to_string(),
            vec![],
            bundle(),
            score,
            true,
            vec![],
        )
        .unwrap_err();
        assert_eq!(err.code, "PIPELINE_SCORE_OUT_OF_RANGE");
    }
}

#[test]
fn results_serialize_with_evidence_and_fallbacks() {
    let result = AnswerResult::assemble(
        "Not enough evidence.".to_string(),
        vec![],
        bundle(),
        0.0,
        true,
        vec![Degradation::new(Fallback::JudgeFailed, "timeout")],
    )
    .expect("assemble");
    let v = serde_json::to_value(&result).expect("json");
    assert_eq!(v["abstained"], true);
    assert_eq!(v["evidence"]["docs"][0]["key"], "1a");
    assert_eq!(v["evidence"]["sql"][0]["evidence"]["status"], "error");
    assert!(v["degradations"][0]["fallback"].is_string());
}

#[test]
fn deserialization_enforces_the_same_contract() {
    let result = AnswerResult::assemble(
        "Services grew [1a].".to_string(),
        vec![claim(&["1a"], &["S1"])],
        bundle(),
        0.8,
        false,
        vec![],
    )
    .expect("assemble");
    let mut v = serde_json::to_value(&result).expect("json");
    let back: AnswerResult = serde_json::from_value(v.clone()).expect("round trip");
    assert_eq!(back, result);

    v["claims"][0]["doc_refs"] = serde_json::json!(["9z"]);
    let err = serde_json::from_value::<AnswerResult>(v.clone()).unwrap_err();
    assert!(err.to_string().contains("CLAIM_REF_UNKNOWN"));

    v["claims"] = serde_json::json!([]);
    v["faithfulness"] = serde_json::json!(1.5);
    let err = serde_json::from_value::<AnswerResult>(v).unwrap_err();
    assert!(err.to_string().contains("PIPELINE_SCORE_OUT_OF_RANGE"));
}
