use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A candidate relational query. Untrusted until the planner validates it against a catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryPlan {
    pub id: String,
    pub sql: String,
    #[serde(default)]
    pub rationale: String,
}

impl QueryPlan {
    pub fn new(id: impl Into<String>, sql: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sql: sql.into(),
            rationale: rationale.into(),
        }
    }
}

/// Table name -> ordered column names. The planner prompt and the plan validator both
/// read from the same instance, so they cannot disagree about what exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableCatalog {
    tables: BTreeMap<String, Vec<String>>,
}

impl TableCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: impl Into<String>, columns: Vec<String>) {
        self.tables.insert(table.into(), columns);
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn columns(&self, table: &str) -> Option<&[String]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.tables
            .iter()
            .map(|(t, cols)| (t.as_str(), cols.as_slice()))
    }

    /// Tables whose name contains `like` (case-insensitive). An empty pattern keeps everything.
    pub fn filter_like(&self, like: &str) -> TableCatalog {
        let needle = like.trim().to_lowercase();
        if needle.is_empty() {
            return self.clone();
        }
        let tables = self
            .tables
            .iter()
            .filter(|(t, _)| t.to_lowercase().contains(&needle))
            .map(|(t, cols)| (t.clone(), cols.clone()))
            .collect();
        TableCatalog { tables }
    }

    /// First catalog table whose name occurs in `sql` (case-insensitive substring).
    pub fn referenced_table(&self, sql: &str) -> Option<&str> {
        let lowered = sql.to_lowercase();
        self.tables
            .keys()
            .find(|t| !t.is_empty() && lowered.contains(&t.to_lowercase()))
            .map(String::as_str)
    }

    /// `- table: col, col, ...` lines, bounded so large stores do not blow up the prompt.
    pub fn render_for_prompt(&self, max_tables: usize, max_columns: usize) -> String {
        self.tables
            .iter()
            .take(max_tables)
            .map(|(t, cols)| {
                let shown = cols
                    .iter()
                    .take(max_columns)
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("- {t}: {shown}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromIterator<(String, Vec<String>)> for TableCatalog {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        TableCatalog {
            tables: iter.into_iter().collect(),
        }
    }
}
