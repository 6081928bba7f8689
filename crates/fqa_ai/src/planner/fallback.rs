use std::collections::BTreeSet;

use fqa_core::db::RelationalStore;
use fqa_core::domain::{Cell, PlanResult, QueryPlan, TableCatalog};
use fqa_core::error::{Fallback, Outcome};
use tracing::{debug, info};

use super::execute::execute_plans;
use super::scope_catalog;

pub const FALLBACK_PLAN_ID: &str = "S_auto1";

const PERIOD_COLUMNS: &[&str] = &["year", "fiscal_year", "fy", "period"];
const GROUP_COLUMNS: &[&str] = &["segment", "business_segment", "category", "region", "product"];
const REVENUE_COLUMNS: &[&str] = &[
    "revenue_usd_m",
    "revenue",
    "revenues",
    "net_revenue",
    "net_sales",
    "sales",
];

/// Columns of one table that fit the period-over-period shape.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Shape<'a> {
    table: &'a str,
    period: &'a str,
    group: &'a str,
    revenue: &'a str,
}

fn pick<'a>(columns: &'a [String], wanted: &[&str]) -> Option<&'a str> {
    wanted.iter().find_map(|w| {
        columns
            .iter()
            .find(|c| c.trim().eq_ignore_ascii_case(w))
            .map(String::as_str)
    })
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Latest `(prev, curr)` with `curr = prev + 1` among the integer periods in the table.
fn latest_adjacent_pair(store: &dyn RelationalStore, shape: &Shape<'_>) -> Option<(i64, i64)> {
    let period = quote_ident(shape.period);
    let sql = format!(
        "SELECT DISTINCT CAST({period} AS INTEGER) FROM {} WHERE {period} IS NOT NULL",
        quote_ident(shape.table)
    );
    let result = match store.execute(&sql) {
        Ok(r) => r,
        Err(e) => {
            debug!(table = shape.table, code = %e.code, "period scan failed");
            return None;
        }
    };
    let periods = result
        .rows
        .iter()
        .filter_map(|row| match row.first() {
            Some(Cell::Integer(p)) => Some(*p),
            _ => None,
        })
        .collect::<BTreeSet<_>>();
    adjacent_pair(&periods)
}

/// Latest `(p - 1, p)` with both present.
fn adjacent_pair(periods: &BTreeSet<i64>) -> Option<(i64, i64)> {
    periods.iter().rev().find_map(|&p| {
        let prev = p.checked_sub(1)?;
        periods.contains(&prev).then_some((prev, p))
    })
}

fn period_over_period_sql(shape: &Shape<'_>, prev: i64, curr: i64) -> String {
    let period = quote_ident(shape.period);
    let group = quote_ident(shape.group);
    format!(
        r#"WITH base AS (
  SELECT CAST({period} AS INTEGER) AS period, {group} AS grp, {revenue} AS revenue
  FROM {table}
  WHERE CAST({period} AS INTEGER) IN ({prev}, {curr})
),
wide AS (
  SELECT
    grp,
    SUM(CASE WHEN period = {prev} THEN revenue ELSE 0 END) AS rev_{prev},
    SUM(CASE WHEN period = {curr} THEN revenue ELSE 0 END) AS rev_{curr}
  FROM base
  GROUP BY grp
)
SELECT
  grp AS {group},
  rev_{prev},
  rev_{curr},
  rev_{curr} - rev_{prev} AS yoy_delta,
  CASE WHEN rev_{prev} = 0 THEN NULL ELSE (rev_{curr} - rev_{prev}) * 100.0 / rev_{prev} END AS yoy_pct
FROM wide
ORDER BY grp"#,
        revenue = quote_ident(shape.revenue),
        table = quote_ident(shape.table),
    )
}

/// Deterministic revenue-change-by-category query over the first table with a period
/// column, a grouping column and a revenue column.
///
/// Only tables matching the hint are scanned (all tables when none match). Returns `None`
/// when no table fits or no two adjacent periods exist.
pub fn synthesize_period_over_period(
    store: &dyn RelationalStore,
    catalog: &TableCatalog,
    ticker_hint: Option<&str>,
) -> Option<QueryPlan> {
    let scoped = scope_catalog(catalog, ticker_hint);
    for (table, columns) in scoped.iter() {
        let (Some(period), Some(group), Some(revenue)) = (
            pick(columns, PERIOD_COLUMNS),
            pick(columns, GROUP_COLUMNS),
            pick(columns, REVENUE_COLUMNS),
        ) else {
            continue;
        };
        let shape = Shape {
            table,
            period,
            group,
            revenue,
        };
        let Some((prev, curr)) = latest_adjacent_pair(store, &shape) else {
            continue;
        };
        return Some(QueryPlan::new(
            FALLBACK_PLAN_ID,
            period_over_period_sql(&shape, prev, curr),
            format!("Revenue change by {group} on {table}, {prev} vs {curr}"),
        ));
    }
    None
}

/// Replace the planned set with the synthesized query when nothing usable came back.
///
/// Runs at most once. The synthesized plan is adopted only if it executes cleanly;
/// otherwise the original plans and their error values are kept.
pub fn apply_fallback(
    store: &dyn RelationalStore,
    catalog: &TableCatalog,
    ticker_hint: Option<&str>,
    plans: Vec<QueryPlan>,
    results: Vec<PlanResult>,
    preview_rows: usize,
) -> Outcome<(Vec<QueryPlan>, Vec<PlanResult>)> {
    let usable = results.iter().any(|r| !r.evidence.is_error());
    if usable {
        return Outcome::ok((plans, results));
    }

    let Some(auto) = synthesize_period_over_period(store, catalog, ticker_hint) else {
        debug!("no table fits the period-over-period shape");
        return Outcome::ok((plans, results));
    };
    let auto_results = execute_plans(store, std::slice::from_ref(&auto), preview_rows);
    if auto_results.iter().any(|r| r.evidence.is_error()) {
        debug!(plan_id = %auto.id, "synthesized plan failed; keeping planned results");
        return Outcome::ok((plans, results));
    }

    info!(plan_id = %auto.id, rationale = %auto.rationale, "synthesized plan adopted");
    let reason = if plans.is_empty() {
        "no plan was accepted".to_string()
    } else {
        format!("all {} planned queries failed", plans.len())
    };
    Outcome::degraded((vec![auto], auto_results), Fallback::SqlSynthesized, reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_pick_follows_priority_and_ignores_case() {
        let cols = vec!["Sales".to_string(), "Revenue_USD_M".to_string()];
        assert_eq!(pick(&cols, REVENUE_COLUMNS), Some("Revenue_USD_M"));
        assert_eq!(pick(&cols, PERIOD_COLUMNS), None);
    }

    #[test]
    fn adjacent_pair_prefers_the_latest_and_survives_extremes() {
        let set = |v: &[i64]| v.iter().copied().collect::<BTreeSet<_>>();
        assert_eq!(adjacent_pair(&set(&[2019, 2020, 2022, 2023, 2025])), Some((2022, 2023)));
        assert_eq!(adjacent_pair(&set(&[2020, 2022])), None);
        assert_eq!(adjacent_pair(&set(&[i64::MIN])), None);
        assert_eq!(adjacent_pair(&set(&[i64::MIN, i64::MIN + 1])), Some((i64::MIN, i64::MIN + 1)));
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
