use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "filingqa",
    version,
    about = "Evidence-grounded answers to financial filing questions"
)]
pub struct Cli {
    /// TOML settings file; environment variables override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build or refresh the vector index for the corpus.
    Index(IndexArgs),
    /// Rank documents for a query.
    Retrieve(RetrieveArgs),
    /// List tables and columns of the relational store.
    Tables(TablesArgs),
    /// Run a read-only query against the relational store.
    Sql(SqlArgs),
    /// Answer a question with cited, judged evidence.
    Ask(AskArgs),
}

#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    /// Re-embed every passage instead of reusing unchanged ones.
    #[arg(long, default_value_t = false)]
    pub full: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RetrieveArgs {
    #[arg(long)]
    pub query: String,

    #[arg(long)]
    pub ticker: Option<String>,

    #[arg(long)]
    pub k: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub no_rerank: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TablesArgs {
    /// Only tables whose name contains this text (case-insensitive).
    #[arg(long)]
    pub like: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SqlArgs {
    #[arg(long)]
    pub query: String,

    #[arg(long)]
    pub max_rows: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct AskArgs {
    #[arg(long)]
    pub question: String,

    #[arg(long)]
    pub ticker: Option<String>,

    /// Print the full answer result as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
