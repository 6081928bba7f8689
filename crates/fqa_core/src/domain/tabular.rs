use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Marker that prefixes every rendered execution failure.
pub const SQL_ERROR_PREFIX: &str = "ERROR:";

/// One value of a result row, mirroring SQLite's storage classes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(v) => Some(*v as f64),
            Cell::Real(v) => Some(*v),
            Cell::Text(s) => s.trim().parse().ok(),
            Cell::Null | Cell::Blob(_) => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Integer(v) => v.to_string(),
            Cell::Real(v) => v.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Blob(b) => hex::encode(b),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl TabularResult {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Cell at `row` for the named column (case-insensitive).
    pub fn value(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// CSV with a header row and at most `max_rows` data rows.
    pub fn preview_csv(&self, max_rows: usize) -> Result<String, AppError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns).map_err(csv_error)?;
        for row in self.rows.iter().take(max_rows) {
            writer
                .write_record(row.iter().map(Cell::render))
                .map_err(csv_error)?;
        }
        let bytes = writer.into_inner().map_err(|e| {
            AppError::new("DB_PREVIEW_FAILED", "Failed to finalize CSV preview")
                .with_details(e.to_string())
        })?;
        String::from_utf8(bytes).map_err(|e| {
            AppError::new("DB_PREVIEW_FAILED", "CSV preview was not valid UTF-8")
                .with_details(e.to_string())
        })
    }
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::new("DB_PREVIEW_FAILED", "Failed to render CSV preview").with_details(e.to_string())
}

/// What one executed plan produced. Failures are values, not errors, so one failing plan
/// never voids the others.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SqlEvidence {
    Table {
        result: TabularResult,
        preview: String,
    },
    Error {
        message: String,
    },
}

impl SqlEvidence {
    pub fn from_result(result: TabularResult, preview_rows: usize) -> Self {
        match result.preview_csv(preview_rows) {
            Ok(preview) => SqlEvidence::Table { result, preview },
            Err(e) => SqlEvidence::Error {
                message: e.to_string(),
            },
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        SqlEvidence::Error {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SqlEvidence::Error { .. })
    }

    pub fn table(&self) -> Option<&TabularResult> {
        match self {
            SqlEvidence::Table { result, .. } => Some(result),
            SqlEvidence::Error { .. } => None,
        }
    }

    /// CSV preview, or the message behind the `ERROR:` marker.
    pub fn preview(&self) -> String {
        match self {
            SqlEvidence::Table { preview, .. } => preview.clone(),
            SqlEvidence::Error { message } => format!("{SQL_ERROR_PREFIX} {message}"),
        }
    }
}
