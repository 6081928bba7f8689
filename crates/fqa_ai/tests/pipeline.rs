use std::cell::RefCell;

use fqa_ai::embeddings::HashingEmbedder;
use fqa_ai::llm::{ChatPrompt, Llm};
use fqa_ai::pipeline::{reexecute_plan, AnswerPipeline};
use fqa_ai::planner::FALLBACK_PLAN_ID;
use fqa_ai::prompts::{CLAIM_BINDER_SYSTEM, SQL_PLANNER_SYSTEM};
use fqa_ai::retrieve::{HybridRetriever, VectorIndex};
use fqa_core::config::{AnswerSettings, RetrievalSettings};
use fqa_core::corpus::Corpus;
use fqa_core::db::{open_in_memory, SqliteStore};
use fqa_core::domain::{AnswerResult, Document};
use fqa_core::error::{AppError, Fallback};
use fqa_core::validate::find_unknown_refs;
use pretty_assertions::assert_eq;

const MODEL: &str = "local-hash-v1";

/// Answers by prompt kind; records the judge's user prompt.
struct ScriptedLlm {
    planner: Result<String, AppError>,
    binder: Result<String, AppError>,
    judge: Result<String, AppError>,
    judge_prompts: RefCell<Vec<String>>,
}

impl ScriptedLlm {
    fn new(planner: &str, binder: &str, judge: &str) -> Self {
        Self {
            planner: Ok(planner.to_string()),
            binder: Ok(binder.to_string()),
            judge: Ok(judge.to_string()),
            judge_prompts: RefCell::new(Vec::new()),
        }
    }
}

impl Llm for ScriptedLlm {
    fn chat(&self, prompt: &ChatPrompt<'_>) -> Result<String, AppError> {
        if prompt.system == SQL_PLANNER_SYSTEM {
            self.planner.clone()
        } else if prompt.system == CLAIM_BINDER_SYSTEM {
            self.binder.clone()
        } else {
            self.judge_prompts.borrow_mut().push(prompt.user.to_string());
            self.judge.clone()
        }
    }
}

fn down() -> AppError {
    AppError::new("AI_CHAT_FAILED", "Failed to call chat endpoint").with_retryable(true)
}

const GOOD_PLAN: &str = r#"[{"id":"S1","sql":"SELECT Year, Segment, Revenue_USD_M FROM AAPL_10K_tbl0 WHERE Segment = 'Services' ORDER BY Year","rationale":"Services by year"}]"#;
const BAD_PLAN: &str = r#"[{"id":"S1","sql":"SELECT * FROM made_up_table"}]"#;
const BOUND: &str = r#"{"answer_markdown":"Services revenue rose to 96.2 [S1][1a].","claims":[{"text":"Services revenue rose","doc_refs":["1a","9z"],"sql_refs":["S1","S7"]}]}"#;
const HIGH: &str = r#"{"faithfulness": 0.91, "notes": "supported"}"#;

struct Fixture {
    corpus: Corpus,
    index: VectorIndex,
    embedder: HashingEmbedder,
    store: SqliteStore,
}

impl Fixture {
    fn new() -> Self {
        let corpus = Corpus::from_documents(vec![
            doc("aapl-1", "AAPL", "Services revenue reached a record driven by the App Store"),
            doc("aapl-2", "AAPL", "iPhone revenue declined in Greater China"),
            doc("nvda-1", "NVDA", "Data Center revenue grew on GPU demand"),
        ])
        .expect("corpus");
        let embedder = HashingEmbedder::new(128);
        let (index, _) = VectorIndex::build(&corpus, &embedder, MODEL, None).expect("index");

        let conn = open_in_memory().expect("open");
        conn.execute_batch(
            r#"
            CREATE TABLE AAPL_10K_tbl0 (Year INTEGER, Segment TEXT, Revenue_USD_M REAL);
            INSERT INTO AAPL_10K_tbl0 VALUES
                (2023, 'Services', 85.2), (2024, 'Services', 96.2),
                (2023, 'iPhone', 200.6),  (2024, 'iPhone', 201.2);
            "#,
        )
        .expect("seed");

        Self {
            corpus,
            index,
            embedder,
            store: SqliteStore::new(conn),
        }
    }

    fn ask(&self, llm: &dyn Llm, question: &str) -> Result<AnswerResult, AppError> {
        let settings = RetrievalSettings {
            rerank: false,
            ..RetrievalSettings::default()
        };
        let retriever = HybridRetriever::new(&self.corpus, &self.index, &self.embedder, None, settings)?;
        let pipeline = AnswerPipeline::new(&retriever, &self.store, llm, AnswerSettings::default());
        pipeline.answer(question, Some("AAPL"))
    }
}

fn doc(id: &str, ticker: &str, text: &str) -> Document {
    Document {
        id: id.to_string(),
        ticker: ticker.to_string(),
        form: "10-K".to_string(),
        accession: format!("acc-{id}"),
        text: text.to_string(),
        tables: vec![],
    }
}

#[test]
fn grounded_answer_keeps_only_citable_refs() {
    let fx = Fixture::new();
    let llm = ScriptedLlm::new(GOOD_PLAN, BOUND, HIGH);
    let result = fx.ask(&llm, "How did Services revenue change?").expect("answer");

    assert!(!result.abstained());
    assert_eq!(result.faithfulness(), 0.91);
    assert_eq!(result.evidence().docs()[0].key, "1a");
    assert_eq!(result.evidence().docs()[0].document.ticker, "AAPL");

    let claim = &result.claims()[0];
    assert_eq!(claim.doc_refs.iter().collect::<Vec<_>>(), vec!["1a"]);
    assert_eq!(claim.sql_refs.iter().collect::<Vec<_>>(), vec!["S1"]);
    assert!(find_unknown_refs(result.claims(), result.evidence()).is_empty());

    let fallbacks = result.degradations().iter().map(|d| d.fallback).collect::<Vec<_>>();
    assert_eq!(fallbacks, vec![Fallback::ClaimRefsDropped]);
}

#[test]
fn stored_preview_is_reproduced_by_re_execution() {
    let fx = Fixture::new();
    let llm = ScriptedLlm::new(GOOD_PLAN, BOUND, HIGH);
    let result = fx.ask(&llm, "How did Services revenue change?").expect("answer");

    let stored = result.evidence().sql_result("S1").expect("S1 evidence");
    let again = reexecute_plan(&fx.store, result.evidence(), "S1", AnswerSettings::default().preview_rows)
        .expect("re-execute");
    assert_eq!(&again, stored);
    assert_eq!(again.preview(), "Year,Segment,Revenue_USD_M\n2023,Services,85.2\n2024,Services,96.2\n");

    let err = reexecute_plan(&fx.store, result.evidence(), "S9", 50).unwrap_err();
    assert_eq!(err.code, "PIPELINE_PLAN_UNKNOWN");
}

#[test]
fn rejected_plans_fall_back_to_the_synthesized_query() {
    let fx = Fixture::new();
    let binder = r#"{"answer_markdown":"Services grew [S_auto1].","claims":[{"text":"Services grew","doc_refs":[],"sql_refs":["S_auto1"]}]}"#;
    let llm = ScriptedLlm::new(BAD_PLAN, binder, HIGH);
    let result = fx.ask(&llm, "Revenue change by segment?").expect("answer");

    let plans = result.evidence().plans();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].id, FALLBACK_PLAN_ID);
    assert_eq!(result.claims()[0].sql_refs.len(), 1);

    let fallbacks = result.degradations().iter().map(|d| d.fallback).collect::<Vec<_>>();
    assert_eq!(fallbacks, vec![Fallback::PlannerEmpty, Fallback::SqlSynthesized]);

    let stored = result.evidence().sql_result(FALLBACK_PLAN_ID).expect("fallback evidence");
    let again = reexecute_plan(&fx.store, result.evidence(), FALLBACK_PLAN_ID, 50).expect("re-execute");
    assert_eq!(&again, stored);
}

#[test]
fn judge_outage_scores_zero_and_abstains() {
    let fx = Fixture::new();
    let mut llm = ScriptedLlm::new(GOOD_PLAN, BOUND, HIGH);
    llm.judge = Err(down());
    let result = fx.ask(&llm, "How did Services revenue change?").expect("answer");

    assert_eq!(result.faithfulness(), 0.0);
    assert!(result.abstained());
    assert!(result.degradations().iter().any(|d| d.fallback == Fallback::JudgeFailed));
    // Abstention still returns citable evidence.
    assert!(!result.evidence().docs().is_empty());
}

#[test]
fn unstructured_binder_output_keeps_text_and_drops_claims() {
    let fx = Fixture::new();
    let llm = ScriptedLlm::new(GOOD_PLAN, "Services revenue rose to 96.2.", HIGH);
    let result = fx.ask(&llm, "How did Services revenue change?").expect("answer");

    assert_eq!(result.answer(), "Services revenue rose to 96.2.");
    assert!(result.claims().is_empty());
    assert!(result
        .degradations()
        .iter()
        .any(|d| d.fallback == Fallback::BinderUnstructured));
}

#[test]
fn binder_outage_abstains_even_when_judged_well() {
    let fx = Fixture::new();
    let mut llm = ScriptedLlm::new(GOOD_PLAN, BOUND, HIGH);
    llm.binder = Err(down());
    let result = fx.ask(&llm, "How did Services revenue change?").expect("answer");

    assert!(result.answer().to_lowercase().contains("not enough evidence"));
    assert!(result.claims().is_empty());
    assert!(result.abstained());
    assert!(result
        .degradations()
        .iter()
        .any(|d| d.fallback == Fallback::BinderUnavailable));
}

#[test]
fn judge_sees_exactly_the_returned_bundle() {
    let fx = Fixture::new();
    let llm = ScriptedLlm::new(GOOD_PLAN, BOUND, HIGH);
    let result = fx.ask(&llm, "How did Services revenue change?").expect("answer");

    let prompts = llm.judge_prompts.borrow();
    assert_eq!(prompts.len(), 1);
    for d in result.evidence().docs() {
        assert!(prompts[0].contains(&format!("[{}]", d.key)));
    }
    assert!(prompts[0].contains("[S1]\nYear,Segment,Revenue_USD_M"));
}

#[test]
fn blank_question_fails_before_any_capability_call() {
    let fx = Fixture::new();
    let llm = ScriptedLlm::new(GOOD_PLAN, BOUND, HIGH);
    let err = fx.ask(&llm, "   ").unwrap_err();
    assert_eq!(err.code, "PIPELINE_QUESTION_EMPTY");
    assert!(err.is_precondition());
    assert!(llm.judge_prompts.borrow().is_empty());
}

#[test]
fn a_broken_view_does_not_block_answers() {
    let fx = Fixture::new();
    fx.store
        .connection()
        .execute_batch(
            r#"
            CREATE TABLE AAPL_scratch (x INTEGER);
            CREATE VIEW AAPL_broken_view AS SELECT x FROM AAPL_scratch;
            DROP TABLE AAPL_scratch;
            "#,
        )
        .expect("seed");

    let llm = ScriptedLlm::new(GOOD_PLAN, BOUND, HIGH);
    let result = fx.ask(&llm, "How did Services revenue change?").expect("answer");
    assert!(!result.abstained());
    assert!(result.evidence().sql_result("S1").is_some_and(|e| !e.is_error()));
}
