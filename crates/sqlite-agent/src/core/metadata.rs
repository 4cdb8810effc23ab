//! Per-table statistics and file-level facts for a database.
//!
//! Row sizes are estimated by sampling a handful of rows and summing the
//! text-rendered length of each non-null cell. That is an approximation of
//! payload size, not on-disk storage accounting.

use std::{path::Path, time::SystemTime};

use chrono::{DateTime, Local};
use rusqlite::{types::ValueRef, Connection};

use crate::{
    config::MetadataOptions,
    core::{
        connect,
        types::{DatabaseInfo, DatabaseStats, MetadataResponse, TableStats},
    },
    error::AppResult,
};

/// Extract database metadata. `table_count` of 0 means all tables; a positive
/// value truncates the (exclusion-filtered) table list in catalog order.
/// Always returns a response; fatal errors populate `error` with zeroed stats.
pub fn extract_metadata(
    db_path: &Path,
    table_count: usize,
    opts: &MetadataOptions,
    busy_timeout_ms: u64,
) -> MetadataResponse {
    tracing::info!(path = %db_path.display(), "extracting metadata");

    if let Err(e) = connect::ensure_exists(db_path) {
        tracing::error!(error = %e, "metadata extraction failed");
        return error_response(db_path, e.to_string());
    }

    match build_metadata(db_path, table_count, opts, busy_timeout_ms) {
        Ok(resp) => {
            tracing::info!(
                tables = resp.table_stats.len(),
                total_rows = resp.stats.row_count,
                "metadata extraction finished"
            );
            resp
        }
        Err(e) => {
            tracing::error!(path = %db_path.display(), error = %e, "metadata extraction failed");
            error_response(db_path, e.to_string())
        }
    }
}

fn build_metadata(
    db_path: &Path,
    table_count: usize,
    opts: &MetadataOptions,
    busy_timeout_ms: u64,
) -> AppResult<MetadataResponse> {
    let file_meta = std::fs::metadata(db_path)?;
    let size_bytes = file_meta.len();

    let conn = connect::open_ro(db_path, busy_timeout_ms)?;

    let page_size: i64 = conn.pragma_query_value(None, "page_size", |r| r.get(0))?;
    let page_count: i64 = conn.pragma_query_value(None, "page_count", |r| r.get(0))?;
    let encoding: String = conn.pragma_query_value(None, "encoding", |r| r.get(0))?;
    let journal_mode: String = conn.pragma_query_value(None, "journal_mode", |r| r.get(0))?;
    let auto_vacuum: i64 = conn.pragma_query_value(None, "auto_vacuum", |r| r.get(0))?;

    let mut database_info = DatabaseInfo {
        name: base_name(db_path),
        path: db_path.display().to_string(),
        size_bytes,
        size_human: human_size(size_bytes as f64),
        page_size,
        page_count,
        encoding,
        journal_mode,
        auto_vacuum,
        creation_time: file_time_iso(file_meta.created().ok()),
        modification_time: file_time_iso(file_meta.modified().ok()),
        message: None,
    };

    let all_tables = list_tables(&conn)?;
    let available: Vec<String> = all_tables
        .into_iter()
        .filter(|name| !opts.excluded_tables.contains(name))
        .collect();
    let available_count = available.len();

    let retained: Vec<String> = if table_count > 0 && table_count < available_count {
        available[..table_count].to_vec()
    } else {
        available
    };

    let mut table_stats = Vec::with_capacity(retained.len());
    let mut total_rows: i64 = 0;
    for name in &retained {
        match analyze_table(&conn, name, opts.sample_rows) {
            Ok(stats) => {
                total_rows += stats.row_count;
                table_stats.push(stats);
            }
            Err(e) => {
                tracing::error!(table = %name, error = %e, "error analyzing table");
                table_stats.push(TableStats {
                    name: name.clone(),
                    estimated_size_human: "0 KB".to_string(),
                    error: Some(e.to_string()),
                    ..Default::default()
                });
            }
        }
    }

    database_info.message = Some(format!(
        "Returning response for {}/{} tables",
        retained.len(),
        available_count
    ));

    let stats = DatabaseStats {
        database_count: 1,
        table_count: retained.len(),
        row_count: total_rows,
    };

    Ok(MetadataResponse {
        database_info,
        table_stats,
        stats,
        error: None,
    })
}

fn analyze_table(conn: &Connection, table: &str, sample_rows: usize) -> AppResult<TableStats> {
    let count_sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
    let row_count: i64 = match conn.query_row(&count_sql, [], |r| r.get(0)) {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(table = %table, error = %e, "error counting rows, assuming 0");
            0
        }
    };

    let mut column_count = 0usize;
    conn.pragma(None, "table_info", table, |_| {
        column_count += 1;
        Ok(())
    })?;

    let mut index_count = 0usize;
    conn.pragma(None, "index_list", table, |_| {
        index_count += 1;
        Ok(())
    })?;

    let mut avg_row_size_bytes = 0.0;
    if row_count > 0 {
        let limit = sample_rows.min(row_count as usize);
        match sample_avg_row_size(conn, table, limit) {
            Ok(avg) => avg_row_size_bytes = avg,
            Err(e) => tracing::warn!(table = %table, error = %e, "error sampling rows"),
        }
    }

    let estimated = avg_row_size_bytes * row_count as f64;
    Ok(TableStats {
        name: table.to_string(),
        row_count,
        column_count,
        index_count,
        avg_row_size_bytes,
        estimated_size_bytes: estimated as i64,
        estimated_size_human: human_size(estimated),
        error: None,
    })
}

fn sample_avg_row_size(conn: &Connection, table: &str, limit: usize) -> AppResult<f64> {
    let sql = format!("SELECT * FROM {} LIMIT {limit}", quote_ident(table));
    let mut stmt = conn.prepare(&sql)?;
    let column_count = stmt.column_count();

    let mut total = 0usize;
    let mut sampled = 0usize;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        for i in 0..column_count {
            total += cell_size(row.get_ref(i)?);
        }
        sampled += 1;
    }

    if sampled == 0 {
        return Ok(0.0);
    }
    Ok(total as f64 / sampled as f64)
}

/// Length of a cell's text rendering; null cells count as zero.
fn cell_size(value: ValueRef<'_>) -> usize {
    match value {
        ValueRef::Null => 0,
        ValueRef::Integer(i) => i.to_string().len(),
        ValueRef::Real(f) => f.to_string().len(),
        ValueRef::Text(t) => t.len(),
        ValueRef::Blob(b) => b.len(),
    }
}

fn list_tables(conn: &Connection) -> AppResult<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")?;
    let names = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

fn error_response(db_path: &Path, error: String) -> MetadataResponse {
    MetadataResponse {
        database_info: DatabaseInfo {
            name: base_name(db_path),
            path: db_path.display().to_string(),
            ..Default::default()
        },
        table_stats: Vec::new(),
        stats: DatabaseStats::default(),
        error: Some(error),
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// MB above 1 MiB, KB otherwise, two decimals.
pub(crate) fn human_size(bytes: f64) -> String {
    const MIB: f64 = 1024.0 * 1024.0;
    if bytes > MIB {
        format!("{:.2} MB", bytes / MIB)
    } else {
        format!("{:.2} KB", bytes / 1024.0)
    }
}

fn file_time_iso(time: Option<SystemTime>) -> String {
    time.map(|t| DateTime::<Local>::from(t).to_rfc3339())
        .unwrap_or_default()
}

/// Double-quote an identifier so arbitrary table names survive interpolation.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use tempfile::TempDir;

    fn opts() -> MetadataOptions {
        MetadataOptions {
            excluded_tables: Vec::new(),
            sample_rows: 5,
        }
    }

    fn fixture_db(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("stats.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE a (id INTEGER PRIMARY KEY, v TEXT);
             CREATE TABLE b (id INTEGER PRIMARY KEY, v TEXT);
             CREATE TABLE c (id INTEGER PRIMARY KEY, v TEXT);
             CREATE INDEX idx_a_v ON a (v);",
        )
        .unwrap();
        for i in 0..50 {
            conn.execute("INSERT INTO a (v) VALUES (?1)", [format!("row-{i}")])
                .unwrap();
        }
        for i in 0..200 {
            conn.execute("INSERT INTO b (v) VALUES (?1)", [format!("row-{i}")])
                .unwrap();
        }
        for i in 0..30 {
            conn.execute("INSERT INTO c (v) VALUES (?1)", [format!("row-{i}")])
                .unwrap();
        }
        path
    }

    #[test]
    fn aggregates_row_and_table_counts() {
        let dir = TempDir::new().unwrap();
        let resp = extract_metadata(&fixture_db(&dir), 0, &opts(), 2_000);
        assert!(resp.error.is_none());

        assert_eq!(resp.stats.database_count, 1);
        assert_eq!(resp.stats.table_count, 3);
        assert_eq!(resp.stats.row_count, 280);

        let a = resp.table_stats.iter().find(|t| t.name == "a").unwrap();
        assert_eq!(a.row_count, 50);
        assert_eq!(a.column_count, 2);
        assert_eq!(a.index_count, 1);
        assert!(a.avg_row_size_bytes > 0.0);
        assert!(a.estimated_size_bytes > 0);
    }

    #[test]
    fn table_limit_truncates_and_reports_counts() {
        let dir = TempDir::new().unwrap();
        let resp = extract_metadata(&fixture_db(&dir), 1, &opts(), 2_000);

        assert_eq!(resp.table_stats.len(), 1);
        assert_eq!(resp.stats.table_count, 1);
        let message = resp.database_info.message.unwrap();
        assert!(message.contains("1/3"), "message was: {message}");
    }

    #[test]
    fn excluded_tables_are_skipped() {
        let dir = TempDir::new().unwrap();
        let opts = MetadataOptions {
            excluded_tables: vec!["b".to_string()],
            sample_rows: 5,
        };
        let resp = extract_metadata(&fixture_db(&dir), 0, &opts, 2_000);

        assert_eq!(resp.stats.table_count, 2);
        assert_eq!(resp.stats.row_count, 80);
        assert!(!resp.table_stats.iter().any(|t| t.name == "b"));
    }

    #[test]
    fn reports_file_level_facts() {
        let dir = TempDir::new().unwrap();
        let resp = extract_metadata(&fixture_db(&dir), 0, &opts(), 2_000);

        let info = resp.database_info;
        assert_eq!(info.name, "stats.db");
        assert!(info.size_bytes > 0);
        assert!(info.page_size > 0);
        assert!(info.page_count > 0);
        assert!(!info.encoding.is_empty());
        assert!(!info.journal_mode.is_empty());
        assert!(!info.modification_time.is_empty());
    }

    #[test]
    fn missing_file_reports_not_found_with_zeroed_stats() {
        let resp = extract_metadata(Path::new("/nonexistent/nowhere.db"), 0, &opts(), 2_000);
        assert!(resp.table_stats.is_empty());
        assert_eq!(resp.stats.table_count, 0);
        assert_eq!(resp.stats.row_count, 0);
        let err = resp.error.unwrap().to_lowercase();
        assert!(err.contains("not found"), "error was: {err}");
    }

    #[test]
    fn human_size_switches_units_at_one_mib() {
        assert_eq!(human_size(512.0), "0.50 KB");
        assert_eq!(human_size(2.0 * 1024.0 * 1024.0), "2.00 MB");
    }
}
