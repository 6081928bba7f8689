use fqa_core::config::AnswerSettings;
use fqa_core::db::RelationalStore;
use fqa_core::domain::{AnswerResult, EvidenceBundle, PipelineState, SqlEvidence};
use fqa_core::error::{AppError, Degradation, Outcome};
use tracing::{error, info};

use crate::binder::bind;
use crate::guardrails::retain_known_refs;
use crate::judge::{score_faithfulness, should_abstain};
use crate::llm::Llm;
use crate::planner::{apply_fallback, execute_plans, plan};
use crate::retrieve::HybridRetriever;

/// Question -> grounded, judged answer.
///
/// Holds only shared read-only handles; each call to [`AnswerPipeline::answer`] builds its
/// own evidence bundle. The relational store is used by one question at a time.
pub struct AnswerPipeline<'a> {
    retriever: &'a HybridRetriever<'a>,
    store: &'a dyn RelationalStore,
    llm: &'a dyn Llm,
    settings: AnswerSettings,
}

/// Current state plus the fallbacks taken so far.
struct Run {
    state: PipelineState,
    degradations: Vec<Degradation>,
}

impl Run {
    fn start() -> Self {
        info!(state = PipelineState::Retrieving.as_str(), "pipeline state");
        Self {
            state: PipelineState::Retrieving,
            degradations: Vec::new(),
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.state.next() {
            self.state = next;
            info!(state = next.as_str(), "pipeline state");
        }
    }

    fn take<T>(&mut self, outcome: Outcome<T>) -> T {
        if let Some(d) = outcome.degradation {
            self.degradations.push(d);
        }
        outcome.value
    }
}

impl<'a> AnswerPipeline<'a> {
    pub fn new(
        retriever: &'a HybridRetriever<'a>,
        store: &'a dyn RelationalStore,
        llm: &'a dyn Llm,
        settings: AnswerSettings,
    ) -> Self {
        Self {
            retriever,
            store,
            llm,
            settings,
        }
    }

    /// Run every state to completion. Abstention is a field of the result, not an error:
    /// only precondition and store failures return `Err`.
    pub fn answer(&self, question: &str, ticker_hint: Option<&str>) -> Result<AnswerResult, AppError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::new(
                "PIPELINE_QUESTION_EMPTY",
                "Question must not be empty",
            ));
        }
        let ticker_hint = ticker_hint.map(str::trim).filter(|t| !t.is_empty());

        let mut run = Run::start();
        match self.run(&mut run, question, ticker_hint) {
            Ok(result) => {
                run.advance();
                info!(
                    faithfulness = result.faithfulness(),
                    abstained = result.abstained(),
                    degradations = result.degradations().len(),
                    "answer ready"
                );
                Ok(result)
            }
            Err(e) => {
                error!(
                    state = PipelineState::Failed.as_str(),
                    from = run.state.as_str(),
                    code = %e.code,
                    "pipeline failed"
                );
                Err(e)
            }
        }
    }

    fn run(
        &self,
        run: &mut Run,
        question: &str,
        ticker_hint: Option<&str>,
    ) -> Result<AnswerResult, AppError> {
        let retrieval = self.retriever.settings();
        let retrieved = self.retriever.retrieve(
            question,
            retrieval.final_k,
            retrieval.rerank,
            ticker_hint,
        )?;
        run.degradations.extend(retrieved.degradations);
        let docs = retrieved.documents;

        run.advance();
        let catalog = self.store.catalog()?;
        let plans = run.take(plan(question, &catalog, ticker_hint, self.llm, &self.settings));

        run.advance();
        let results = execute_plans(self.store, &plans, self.settings.preview_rows);
        let (plans, results) = run.take(apply_fallback(
            self.store,
            &catalog,
            ticker_hint,
            plans,
            results,
            self.settings.preview_rows,
        ));

        // Frozen here: binding and judging read this bundle and nothing else.
        let evidence = EvidenceBundle::new(docs, results, plans);

        run.advance();
        let bound = run.take(bind(question, &evidence, self.llm, &self.settings));
        let claims = run.take(retain_known_refs(bound.claims, &evidence));

        run.advance();
        let faithfulness = run.take(score_faithfulness(
            question,
            &bound.answer,
            &evidence,
            self.llm,
            &self.settings,
        ));
        let abstained = should_abstain(
            faithfulness,
            &bound.answer,
            self.settings.min_faithfulness,
            &self.settings.abstain_phrase,
        );

        AnswerResult::assemble(
            bound.answer,
            claims,
            evidence,
            faithfulness,
            abstained,
            std::mem::take(&mut run.degradations),
        )
    }
}

/// Execute the plan behind `plan_id` again, as a caller verifying a returned answer would.
pub fn reexecute_plan(
    store: &dyn RelationalStore,
    evidence: &EvidenceBundle,
    plan_id: &str,
    preview_rows: usize,
) -> Result<SqlEvidence, AppError> {
    let plan = evidence.plan(plan_id).ok_or_else(|| {
        AppError::new("PIPELINE_PLAN_UNKNOWN", "No plan with that id in the evidence bundle")
            .with_details(format!("plan_id={plan_id}"))
    })?;
    let result = store.execute(&plan.sql)?;
    Ok(SqlEvidence::from_result(result, preview_rows))
}
