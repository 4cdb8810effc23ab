use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "sqlite-agent")]
pub struct Args {
    /// Path to the SQLite database the agent tools operate on.
    #[arg(long)]
    pub db: PathBuf,

    /// Logging level (stderr). Also supports RUST_LOG.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Maximum rows returned per SELECT statement (unless a smaller limit is provided).
    #[arg(long, default_value_t = 1000)]
    pub max_rows: usize,

    /// Busy/connect timeout for a single database connection.
    #[arg(long, default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// Allow INSERT/UPDATE/DELETE/DDL statements. Off by default.
    #[arg(long)]
    pub enable_write: bool,

    /// Table names to skip during metadata extraction (repeatable).
    #[arg(long)]
    pub excluded_table: Vec<String>,

    /// Rows sampled per table when estimating average row size.
    #[arg(long, default_value_t = 5)]
    pub sample_rows: usize,
}
