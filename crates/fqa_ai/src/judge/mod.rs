use fqa_core::config::AnswerSettings;
use fqa_core::domain::EvidenceBundle;
use fqa_core::error::{Fallback, Outcome};
use serde_json::Value;
use tracing::info;

use crate::llm::payload::parse_object;
use crate::llm::{ChatPrompt, Llm};
use crate::prompts::{judge_user_prompt, sql_evidence_blocks, text_evidence_blocks, JUDGE_SYSTEM};

/// Faithfulness of `answer` to the frozen `evidence`, in `[0, 1]`.
///
/// Any failure scores 0.0 (`JudgeFailed`); judging is never skipped.
pub fn score_faithfulness(
    question: &str,
    answer: &str,
    evidence: &EvidenceBundle,
    llm: &dyn Llm,
    settings: &AnswerSettings,
) -> Outcome<f64> {
    let text_blocks =
        text_evidence_blocks(evidence.docs(), settings.snippet_chars, settings.judge_snippets);
    let sql_blocks = sql_evidence_blocks(
        evidence.sql(),
        settings.judge_sql_chars,
        settings.judge_sql_previews,
    );
    let user = judge_user_prompt(question, answer, &text_blocks, &sql_blocks);

    let raw = match llm.chat(&ChatPrompt {
        system: JUDGE_SYSTEM,
        user: &user,
        temperature: 0.0,
    }) {
        Ok(raw) => raw,
        Err(e) => return Outcome::degraded(0.0, Fallback::JudgeFailed, e.to_string()),
    };

    match parse_score(&raw) {
        Some(score) => {
            info!(faithfulness = score, "answer judged");
            Outcome::ok(score)
        }
        None => Outcome::degraded(0.0, Fallback::JudgeFailed, "judge output had no numeric score"),
    }
}

/// `{"faithfulness": x}` with `x` a finite number (or numeric string), clamped to `[0, 1]`.
pub fn parse_score(raw: &str) -> Option<f64> {
    let map = parse_object(raw)?;
    let score = match map.get("faithfulness")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    score.is_finite().then(|| score.clamp(0.0, 1.0))
}

/// Either signal alone abstains: a low score, or the answer admitting insufficiency.
pub fn should_abstain(score: f64, answer: &str, threshold: f64, phrase: &str) -> bool {
    score < threshold || answer.to_lowercase().contains(&phrase.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_are_clamped_and_validated() {
        assert_eq!(parse_score(r#"{"faithfulness": 0.8, "notes": "ok"}"#), Some(0.8));
        assert_eq!(parse_score(r#"{"faithfulness": 1.7}"#), Some(1.0));
        assert_eq!(parse_score(r#"{"faithfulness": -2}"#), Some(0.0));
        assert_eq!(parse_score(r#"{"faithfulness": "0.5"}"#), Some(0.5));
        assert_eq!(parse_score(r#"{"faithfulness": "NaN"}"#), None);
        assert_eq!(parse_score(r#"{"score": 0.9}"#), None);
        assert_eq!(parse_score("0.9"), None);
    }

    #[test]
    fn abstention_is_an_or_of_both_signals() {
        assert!(should_abstain(0.40, "Revenue rose 10%.", 0.58, "not enough evidence"));
        assert!(should_abstain(0.90, "Not Enough Evidence to say.", 0.58, "not enough evidence"));
        assert!(!should_abstain(0.90, "Revenue rose 10%.", 0.58, "not enough evidence"));
        assert!(!should_abstain(0.58, "Revenue rose 10%.", 0.58, "not enough evidence"));
    }
}
