use fqa_core::domain::{KeyedDocument, PlanResult};

pub const SQL_PLANNER_SYSTEM: &str = r#"You plan SQL queries that answer financial questions from extracted filing tables.

Rules (non-negotiable):
1) Reference ONLY tables listed under "Valid tables". Never invent a table.
2) Use column names exactly as listed.
3) Keep each query short; aggregate when the question asks for totals or changes.
4) If no listed table fits the question, return [].

Output strictly a JSON array with no prose and no code fences, for example:
[{"id":"S1","sql":"SELECT ...","rationale":"..."}]
"#;

pub const CLAIM_BINDER_SYSTEM: &str = r#"You are a precise financial analyst.

Rules (non-negotiable):
1) Ground every claim in the text snippets or SQL results provided. Never invent numbers or text.
2) Cite evidence inline with its id, e.g. [1a] for text and [S1] for SQL. Only cite ids that appear below.
3) If the evidence is weak or missing, say "Not enough evidence" and make no claims.
4) Keep the answer short.

Return ONLY a JSON object with no prose and no code fences:
{"answer_markdown":"...","claims":[{"text":"...","doc_refs":["1a"],"sql_refs":["S1"]}]}
"#;

pub const JUDGE_SYSTEM: &str = r#"You judge whether an answer is supported by the evidence provided.

Penalize every number or statement that the evidence does not clearly support.
Return a single JSON object: {"faithfulness": <number between 0 and 1>, "notes": "..."}
A higher score means stronger support.
"#;

/// Answer text used when the binder capability cannot be reached at all.
pub const UNAVAILABLE_ANSWER: &str =
    "Not enough evidence: the answer generator was unavailable, so no grounded answer could be produced.";

/// First `max_chars` characters, with `...` appended when something was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// `[1a] <snippet>` lines for the first `limit` documents.
pub fn text_evidence_blocks(docs: &[KeyedDocument], max_chars: usize, limit: usize) -> Vec<String> {
    docs.iter()
        .take(limit)
        .map(|d| format!("[{}] {}", d.key, truncate_chars(&d.document.text, max_chars)))
        .collect()
}

/// `[S1]` followed by the bounded CSV preview (or `ERROR: ...`) on the next line.
pub fn sql_evidence_blocks(sql: &[PlanResult], max_chars: usize, limit: usize) -> Vec<String> {
    sql.iter()
        .take(limit)
        .map(|r| {
            let preview = r.evidence.preview();
            let bounded = match preview.char_indices().nth(max_chars) {
                Some((cut, _)) => &preview[..cut],
                None => preview.as_str(),
            };
            format!("[{}]\n{}", r.plan_id, bounded)
        })
        .collect()
}

pub fn planner_user_prompt(question: &str, catalog_text: &str) -> String {
    format!(
        r#"Question: {question}

Valid tables:
{catalog_text}
"#
    )
}

pub fn binder_user_prompt(
    question: &str,
    text_blocks: &[String],
    sql_ids: &[&str],
    sql_blocks: &[String],
) -> String {
    let ids = if sql_ids.is_empty() {
        "(none)".to_string()
    } else {
        sql_ids.join(", ")
    };
    format!(
        r#"Question: {question}

Text evidence:
{}

SQL results (CSV preview). IDs available: {ids}
{}
"#,
        text_blocks.join("\n"),
        sql_blocks.join("\n"),
    )
}

pub fn judge_user_prompt(
    question: &str,
    answer: &str,
    text_blocks: &[String],
    sql_blocks: &[String],
) -> String {
    format!(
        r#"Question: {question}

Answer:
{answer}

Evidence (text):
{}

Evidence (SQL previews):
{}
"#,
        text_blocks.join("\n"),
        sql_blocks.join("\n"),
    )
}
