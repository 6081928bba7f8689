pub mod config;
pub mod corpus;
pub mod db;
pub mod domain;
pub mod error;
pub mod validate;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::AppError;

pub fn now_rfc3339_utc() -> Result<String, AppError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|e| AppError::new("TIME_FORMAT_FAILED", "Failed to format time").with_details(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::error::{AppError, Fallback, Outcome};

    #[test]
    fn app_error_is_structured() {
        let err = AppError::new("DB_TEST", "db failed").with_retryable(false);
        assert_eq!(err.code, "DB_TEST");
        assert_eq!(err.message, "db failed");
        assert_eq!(err.retryable, false);
        assert_eq!(err.to_string(), "[DB_TEST] db failed");
    }

    #[test]
    fn precondition_codes_are_classified() {
        assert!(AppError::new("CORPUS_MISSING", "x").is_precondition());
        assert!(AppError::new("AI_CREDENTIALS_MISSING", "x").is_precondition());
        assert!(!AppError::new("AI_RERANK_FAILED", "x").is_precondition());
    }

    #[test]
    fn outcome_records_which_fallback_fired() {
        let ok: Outcome<u8> = Outcome::ok(1);
        assert_eq!(ok.fallback(), None);
        let degraded = Outcome::degraded(0.0_f64, Fallback::JudgeFailed, "timeout");
        assert_eq!(degraded.fallback(), Some(Fallback::JudgeFailed));
        assert_eq!(degraded.degradation.unwrap().reason, "timeout");
    }

    #[test]
    fn now_is_rfc3339() {
        let ts = super::now_rfc3339_utc().expect("time");
        assert!(ts.ends_with('Z'));
    }
}
