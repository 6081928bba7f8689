use std::collections::BTreeSet;

use fqa_core::config::AnswerSettings;
use fqa_core::domain::{QueryPlan, TableCatalog};
use fqa_core::error::{Fallback, Outcome};
use serde_json::Value;
use tracing::{debug, info};

use crate::llm::payload::{parse_array, str_field};
use crate::llm::{ChatPrompt, Llm};
use crate::prompts::{planner_user_prompt, SQL_PLANNER_SYSTEM};

mod execute;
mod fallback;

pub use execute::{execute_plans, plan_failure_message};
pub use fallback::{apply_fallback, synthesize_period_over_period, FALLBACK_PLAN_ID};

/// Tables whose name contains the hint; the whole catalog when none do.
pub fn scope_catalog(catalog: &TableCatalog, ticker_hint: Option<&str>) -> TableCatalog {
    match ticker_hint.map(str::trim).filter(|h| !h.is_empty()) {
        Some(hint) => {
            let scoped = catalog.filter_like(hint);
            if scoped.is_empty() {
                catalog.clone()
            } else {
                scoped
            }
        }
        None => catalog.clone(),
    }
}

/// Ask the generator for candidate queries and keep at most `max_plans` that reference a
/// table of the scoped catalog.
///
/// Never fails: an unreachable generator or an unusable payload yields an empty list,
/// reported as `PlannerEmpty`.
pub fn plan(
    question: &str,
    catalog: &TableCatalog,
    ticker_hint: Option<&str>,
    llm: &dyn Llm,
    settings: &AnswerSettings,
) -> Outcome<Vec<QueryPlan>> {
    let scoped = scope_catalog(catalog, ticker_hint);
    if scoped.is_empty() {
        return Outcome::degraded(Vec::new(), Fallback::PlannerEmpty, "catalog has no tables");
    }

    let catalog_text = scoped.render_for_prompt(settings.catalog_max_tables, settings.catalog_max_columns);
    let user = planner_user_prompt(question, &catalog_text);
    let raw = match llm.chat(&ChatPrompt {
        system: SQL_PLANNER_SYSTEM,
        user: &user,
        temperature: 0.1,
    }) {
        Ok(raw) => raw,
        Err(e) => return Outcome::degraded(Vec::new(), Fallback::PlannerEmpty, e.to_string()),
    };

    let plans = parse_plans(&raw, &scoped, settings.max_plans);
    if plans.is_empty() {
        return Outcome::degraded(
            plans,
            Fallback::PlannerEmpty,
            "no candidate plan referenced a catalog table",
        );
    }
    info!(plans = plans.len(), tables = scoped.len(), "query plans accepted");
    Outcome::ok(plans)
}

/// Promote the raw payload to validated plans, in presentation order.
///
/// A payload that is not a JSON array yields nothing. Items without SQL text or without a
/// catalog table reference are dropped. Missing or repeated ids are replaced by `S<n>`.
pub fn parse_plans(raw: &str, catalog: &TableCatalog, max_plans: usize) -> Vec<QueryPlan> {
    let Some(items) = parse_array(raw) else {
        debug!("planner payload was not a JSON array");
        return Vec::new();
    };

    let mut used = BTreeSet::new();
    let mut out: Vec<QueryPlan> = Vec::new();
    for item in items {
        if out.len() >= max_plans {
            break;
        }
        let Value::Object(map) = item else {
            continue;
        };
        let sql = str_field(&map, "sql").map(str::trim).unwrap_or_default();
        if sql.is_empty() {
            continue;
        }
        if catalog.referenced_table(sql).is_none() {
            debug!(sql_len = sql.len(), "plan dropped: no catalog table referenced");
            continue;
        }

        let id = match str_field(&map, "id").map(str::trim) {
            Some(id) if !id.is_empty() && !used.contains(id) => id.to_string(),
            _ => next_free_id(&used, out.len() + 1),
        };
        used.insert(id.clone());
        let rationale = str_field(&map, "rationale").unwrap_or_default();
        out.push(QueryPlan::new(id, sql, rationale));
    }
    out
}

fn next_free_id(used: &BTreeSet<String>, start: usize) -> String {
    let mut n = start;
    loop {
        let id = format!("S{n}");
        if !used.contains(&id) {
            return id;
        }
        n += 1;
    }
}
