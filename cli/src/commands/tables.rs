use fqa_core::config::Settings;
use fqa_core::db::RelationalStore;
use fqa_core::domain::SqlEvidence;
use fqa_core::error::AppError;

use super::{open_store, print_json};
use crate::cli::{SqlArgs, TablesArgs};

pub fn run_tables(settings: &Settings, args: TablesArgs) -> Result<(), AppError> {
    let store = open_store(settings)?;
    let catalog = store.catalog()?;
    let catalog = match args.like.as_deref() {
        Some(like) => catalog.filter_like(like),
        None => catalog,
    };
    print_json(&catalog)
}

/// Prints the same preview an answer's evidence bundle stores for a plan.
pub fn run_sql(settings: &Settings, args: SqlArgs) -> Result<(), AppError> {
    let store = open_store(settings)?;
    let result = store.execute(&args.query)?;
    let rows = args.max_rows.unwrap_or(settings.answer.preview_rows);
    match SqlEvidence::from_result(result, rows) {
        SqlEvidence::Table { preview, .. } => {
            print!("{preview}");
            Ok(())
        }
        SqlEvidence::Error { message } => Err(AppError::new("DB_PREVIEW_FAILED", message)),
    }
}
