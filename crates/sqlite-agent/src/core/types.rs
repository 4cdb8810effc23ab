use serde::{Deserialize, Serialize};

/// Outcome of one executed statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names, empty for non-SELECT statements.
    pub columns: Vec<String>,
    /// Row tuples as JSON scalars, capped at the configured row limit.
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<i64>,
    pub execution_time_ms: u64,
    pub is_select: bool,
    pub sql_executed: String,
}

/// Outcome of a whole batch. `error` set means execution stopped early;
/// `results` then holds only the statements that succeeded before the failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryBatchResult {
    pub results: Vec<QueryResult>,
    #[serde(default)]
    pub error: Option<String>,
    pub is_write_operation: bool,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FkReference {
    pub table: String,
    pub column: String,
}

/// One column of a table or view. `references` is set iff `foreign_key` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub primary_key: bool,
    pub foreign_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<FkReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

/// Structural model of one database file, rebuilt on every extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<TableInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaResponse {
    pub schema: DatabaseSchema,
    #[serde(default)]
    pub table_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableStats {
    pub name: String,
    pub row_count: i64,
    pub column_count: usize,
    pub index_count: usize,
    pub avg_row_size_bytes: f64,
    pub estimated_size_bytes: i64,
    pub estimated_size_human: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStats {
    pub database_count: usize,
    pub table_count: usize,
    pub row_count: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub name: String,
    pub path: String,
    pub size_bytes: u64,
    pub size_human: String,
    pub page_size: i64,
    pub page_count: i64,
    pub encoding: String,
    pub journal_mode: String,
    pub auto_vacuum: i64,
    pub creation_time: String,
    pub modification_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataResponse {
    pub database_info: DatabaseInfo,
    #[serde(default)]
    pub table_stats: Vec<TableStats>,
    pub stats: DatabaseStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
