use std::path::PathBuf;

use crate::cli::Args;

/// Execution policy for a query batch.
#[derive(Debug, Clone)]
pub struct QueryPolicy {
    pub timeout_ms: u64,
    pub max_rows: usize,
    pub enable_write: bool,
}

/// Knobs for metadata extraction.
#[derive(Debug, Clone)]
pub struct MetadataOptions {
    pub excluded_tables: Vec<String>,
    pub sample_rows: usize,
}

/// Process-wide configuration, built once at startup and passed by reference
/// into the tool handlers. No global state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub query: QueryPolicy,
    pub metadata: MetadataOptions,
}

impl AppConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            db_path: args.db.clone(),
            query: QueryPolicy {
                timeout_ms: args.timeout_ms,
                max_rows: args.max_rows,
                enable_write: args.enable_write,
            },
            metadata: MetadataOptions {
                excluded_tables: args.excluded_table.clone(),
                sample_rows: args.sample_rows,
            },
        }
    }
}
