use fqa_core::db::RelationalStore;
use fqa_core::domain::{PlanResult, QueryPlan, SqlEvidence};
use fqa_core::error::AppError;
use tracing::{debug, warn};

/// Run every plan in order. A failing plan becomes an error value next to the others.
pub fn execute_plans(
    store: &dyn RelationalStore,
    plans: &[QueryPlan],
    preview_rows: usize,
) -> Vec<PlanResult> {
    plans
        .iter()
        .map(|p| {
            let evidence = match store.execute(&p.sql) {
                Ok(result) => {
                    debug!(plan_id = %p.id, rows = result.rows.len(), "plan executed");
                    SqlEvidence::from_result(result, preview_rows)
                }
                Err(e) => {
                    warn!(plan_id = %p.id, code = %e.code, "plan execution failed");
                    SqlEvidence::error(plan_failure_message(&e))
                }
            };
            PlanResult {
                plan_id: p.id.clone(),
                evidence,
            }
        })
        .collect()
}

/// Message stored behind the `ERROR:` marker; the store's own diagnostic wins when present.
pub fn plan_failure_message(e: &AppError) -> String {
    match &e.details {
        Some(d) => format!("{} ({})", e.message, d),
        None => e.message.clone(),
    }
}
