use fqa_core::config::AnswerSettings;
use fqa_core::domain::{Claim, EvidenceBundle};
use fqa_core::error::{Fallback, Outcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::llm::payload::{parse_object, str_field, str_list};
use crate::llm::{ChatPrompt, Llm};
use crate::prompts::{
    binder_user_prompt, sql_evidence_blocks, text_evidence_blocks, CLAIM_BINDER_SYSTEM,
    UNAVAILABLE_ANSWER,
};

/// Draft answer and the atomic claims behind it. Refs are not yet checked against evidence.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundAnswer {
    pub answer: String,
    pub claims: Vec<Claim>,
}

/// Ask the generator for an answer whose claims cite evidence keys of `evidence`.
///
/// Never fails. An unreachable generator yields a fixed insufficient-evidence answer
/// (`BinderUnavailable`); output that is not the expected object is kept as the answer
/// text with zero claims (`BinderUnstructured`).
pub fn bind(
    question: &str,
    evidence: &EvidenceBundle,
    llm: &dyn Llm,
    settings: &AnswerSettings,
) -> Outcome<BoundAnswer> {
    let text_blocks = text_evidence_blocks(evidence.docs(), settings.snippet_chars, usize::MAX);
    let sql_blocks = sql_evidence_blocks(evidence.sql(), settings.sql_preview_chars, usize::MAX);
    let sql_ids = evidence
        .sql()
        .iter()
        .map(|r| r.plan_id.as_str())
        .collect::<Vec<_>>();
    let user = binder_user_prompt(question, &text_blocks, &sql_ids, &sql_blocks);

    let raw = match llm.chat(&ChatPrompt {
        system: CLAIM_BINDER_SYSTEM,
        user: &user,
        temperature: 0.1,
    }) {
        Ok(raw) => raw,
        Err(e) => {
            return Outcome::degraded(
                BoundAnswer {
                    answer: UNAVAILABLE_ANSWER.to_string(),
                    claims: Vec::new(),
                },
                Fallback::BinderUnavailable,
                e.to_string(),
            );
        }
    };

    match parse_bound_answer(&raw) {
        Some(bound) => {
            info!(claims = bound.claims.len(), "answer bound");
            Outcome::ok(bound)
        }
        None => Outcome::degraded(
            BoundAnswer {
                answer: raw.trim().to_string(),
                claims: Vec::new(),
            },
            Fallback::BinderUnstructured,
            "binder output was not an answer object",
        ),
    }
}

/// `{answer_markdown|answer, claims:[{text, doc_refs, sql_refs}]}`; claims without text are
/// skipped.
pub fn parse_bound_answer(raw: &str) -> Option<BoundAnswer> {
    let map = parse_object(raw)?;
    let answer = str_field(&map, "answer_markdown")
        .or_else(|| str_field(&map, "answer"))?
        .trim()
        .to_string();

    let claims = map
        .get("claims")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|c| {
                    let text = str_field(c, "text")?.trim();
                    if text.is_empty() {
                        return None;
                    }
                    Some(Claim {
                        text: text.to_string(),
                        doc_refs: str_list(c, "doc_refs").into_iter().collect(),
                        sql_refs: str_list(c, "sql_refs").into_iter().collect(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Some(BoundAnswer { answer, claims })
}
