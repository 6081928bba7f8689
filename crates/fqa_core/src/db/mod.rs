use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, warn};

use crate::domain::{Cell, TableCatalog, TabularResult};
use crate::error::AppError;

/// Relational store seen by the planner: catalog discovery plus ad-hoc query execution.
///
/// One connection serves one question at a time; implementations are not required to be
/// `Sync`, so concurrent callers must provision their own store.
pub trait RelationalStore {
    fn list_tables(&self) -> Result<Vec<String>, AppError>;
    fn describe(&self, table: &str) -> Result<Vec<String>, AppError>;
    fn execute(&self, sql: &str) -> Result<TabularResult, AppError>;

    /// Tables that cannot be described (a view over a dropped table, say) are left out
    /// with a warning; only a failed listing is an error.
    fn catalog(&self) -> Result<TableCatalog, AppError> {
        let mut catalog = TableCatalog::new();
        for table in self.list_tables()? {
            match self.describe(&table) {
                Ok(columns) => catalog.insert(table, columns),
                Err(e) => warn!(table = %table, code = %e.code, "table skipped in catalog"),
            }
        }
        Ok(catalog)
    }
}

pub fn open_read_only(path: &Path) -> Result<Connection, AppError> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| {
        AppError::new("DB_OPEN_FAILED", "Failed to open SQLite database read-only")
            .with_details(format!("path={}; err={}", path.display(), e))
    })
}

pub fn open_in_memory() -> Result<Connection, AppError> {
    Connection::open_in_memory().map_err(|e| {
        AppError::new("DB_OPEN_FAILED", "Failed to open in-memory SQLite database")
            .with_details(e.to_string())
    })
}

/// SQLite-backed store. Only read-only statements are executed.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open_read_only(path: &Path) -> Result<Self, AppError> {
        open_read_only(path).map(Self::new)
    }

    /// Direct access for loaders and test fixtures that need to create tables.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl RelationalStore for SqliteStore {
    fn list_tables(&self) -> Result<Vec<String>, AppError> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT name FROM sqlite_master
                WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'
                ORDER BY name
                "#,
            )
            .map_err(|e| {
                AppError::new("DB_QUERY_FAILED", "Failed to prepare table listing")
                    .with_details(e.to_string())
            })?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| {
                AppError::new("DB_QUERY_FAILED", "Failed to list tables").with_details(e.to_string())
            })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r.map_err(|e| {
                AppError::new("DB_QUERY_FAILED", "Failed to read table name")
                    .with_details(e.to_string())
            })?);
        }
        Ok(out)
    }

    fn describe(&self, table: &str) -> Result<Vec<String>, AppError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
            .map_err(|e| {
                AppError::new("DB_QUERY_FAILED", "Failed to prepare table description")
                    .with_details(e.to_string())
            })?;
        let rows = stmt
            .query_map([table], |row| row.get::<_, String>(0))
            .map_err(|e| {
                AppError::new("DB_QUERY_FAILED", "Failed to describe table")
                    .with_details(format!("table={table}; err={e}"))
            })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r.map_err(|e| {
                AppError::new("DB_QUERY_FAILED", "Failed to read column name")
                    .with_details(e.to_string())
            })?);
        }
        if out.is_empty() {
            return Err(AppError::new("DB_TABLE_UNKNOWN", "Table does not exist")
                .with_details(format!("table={table}")));
        }
        Ok(out)
    }

    fn execute(&self, sql: &str) -> Result<TabularResult, AppError> {
        let sql = sql.trim().trim_end_matches(';').trim_end();
        if sql.is_empty() {
            return Err(AppError::new("DB_QUERY_INVALID", "Query text is empty"));
        }
        debug!(sql_len = sql.len(), "executing ad-hoc query");

        let mut stmt = self.conn.prepare(sql).map_err(|e| {
            AppError::new("DB_QUERY_INVALID", "Failed to prepare query").with_details(e.to_string())
        })?;
        if !stmt.readonly() {
            return Err(AppError::new(
                "DB_QUERY_NOT_READONLY",
                "Only read-only queries may be executed",
            ));
        }

        let columns = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let width = columns.len();

        let mut rows = stmt.query([]).map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to execute query").with_details(e.to_string())
        })?;
        let mut out_rows = Vec::new();
        while let Some(row) = rows.next().map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to read query row").with_details(e.to_string())
        })? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                let value = row.get_ref(i).map_err(|e| {
                    AppError::new("DB_QUERY_FAILED", "Failed to read query cell")
                        .with_details(e.to_string())
                })?;
                cells.push(cell_from_ref(value));
            }
            out_rows.push(cells);
        }

        Ok(TabularResult {
            columns,
            rows: out_rows,
        })
    }
}

fn cell_from_ref(value: ValueRef<'_>) -> Cell {
    match value {
        ValueRef::Null => Cell::Null,
        ValueRef::Integer(v) => Cell::Integer(v),
        ValueRef::Real(v) => Cell::Real(v),
        ValueRef::Text(bytes) => Cell::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Cell::Blob(bytes.to_vec()),
    }
}
