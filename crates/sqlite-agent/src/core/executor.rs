//! Executes one or more SQL statements against a database file under a
//! write policy and row cap.
//!
//! One connection serves the whole batch; statements run strictly in order
//! because later ones may depend on earlier side effects. Granularity is
//! incremental: each statement auto-commits unless the batch itself opens an
//! explicit transaction, and on the first failing statement any open
//! transaction is rolled back and execution stops.

use std::{collections::HashMap, path::Path, time::Instant};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rusqlite::{types::ValueRef, Connection, Statement};
use serde_json::Value;

use crate::{
    config::QueryPolicy,
    core::{
        classify, connect, splitter,
        types::{QueryBatchResult, QueryResult},
    },
    error::AppError,
};

/// Named parameters bound as `:name` in statements that reference them.
pub type QueryParams = HashMap<String, Value>;

/// Execute a raw SQL blob as an ordered batch. Never returns a raw error:
/// every failure mode ends up in the batch's `error` field.
pub fn execute_query(
    db_path: &Path,
    sql: &str,
    params: Option<&QueryParams>,
    max_rows: Option<usize>,
    policy: &QueryPolicy,
) -> QueryBatchResult {
    let started = Instant::now();

    // One classification for the whole blob; the flag applies batch-wide.
    let is_write = classify::is_write_operation(sql);
    tracing::info!(path = %db_path.display(), is_write, "executing query batch");
    tracing::debug!(sql, "raw query text");

    if is_write && !policy.enable_write {
        tracing::warn!("blocked write operation: writes are disabled");
        return QueryBatchResult {
            results: Vec::new(),
            error: Some(AppError::WriteDisabled.to_string()),
            is_write_operation: true,
            execution_time_ms: elapsed_ms(&started),
        };
    }

    if let Err(e) = connect::ensure_exists(db_path) {
        return QueryBatchResult {
            results: Vec::new(),
            error: Some(e.to_string()),
            is_write_operation: is_write,
            execution_time_ms: elapsed_ms(&started),
        };
    }

    // A caller-supplied limit may shrink the cap, never raise it.
    let max_rows = max_rows
        .unwrap_or(policy.max_rows)
        .min(policy.max_rows)
        .max(1);
    let (results, error) = run_batch(db_path, sql, params, max_rows, policy);

    let execution_time_ms = elapsed_ms(&started);
    match &error {
        None => tracing::info!(
            statements = results.len(),
            execution_time_ms,
            "query batch finished"
        ),
        Some(e) => tracing::error!(error = %e, "query batch failed"),
    }

    QueryBatchResult {
        results,
        error,
        is_write_operation: is_write,
        execution_time_ms,
    }
}

fn run_batch(
    db_path: &Path,
    sql: &str,
    params: Option<&QueryParams>,
    max_rows: usize,
    policy: &QueryPolicy,
) -> (Vec<QueryResult>, Option<String>) {
    let conn = match open_batch_connection(db_path, policy) {
        Ok(c) => c,
        Err(e) => return (Vec::new(), Some(e.to_string())),
    };

    let statements = splitter::split_statements(sql);
    let total = statements.len();
    let mut results = Vec::with_capacity(total);

    for (i, stmt_sql) in statements.iter().enumerate() {
        tracing::debug!(statement = i + 1, total, sql = %stmt_sql, "executing statement");
        match run_statement(&conn, stmt_sql, params, max_rows) {
            Ok(result) => results.push(result),
            Err(e) => {
                // Keep earlier auto-committed statements; undo an open
                // explicit transaction only.
                if !conn.is_autocommit() {
                    let _ = conn.execute_batch("ROLLBACK");
                }
                let msg = format!("SQLite error (statement {}): {e}", i + 1);
                return (results, Some(msg));
            }
        }
    }

    // An explicit BEGIN in the batch without a matching COMMIT is finished
    // here so no transaction leaks past the connection.
    if !conn.is_autocommit() {
        if let Err(e) = conn.execute_batch("COMMIT") {
            return (results, Some(format!("SQLite error (commit): {e}")));
        }
    }

    (results, None)
}

fn open_batch_connection(db_path: &Path, policy: &QueryPolicy) -> Result<Connection, AppError> {
    let conn = connect::open_rw(db_path, policy.timeout_ms)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}

fn run_statement(
    conn: &Connection,
    stmt_sql: &str,
    params: Option<&QueryParams>,
    max_rows: usize,
) -> rusqlite::Result<QueryResult> {
    let started = Instant::now();
    let mut stmt = conn.prepare(stmt_sql)?;
    bind_params(&mut stmt, params)?;

    // Row-returning statements are those SQLite itself says produce columns;
    // this covers SELECT as well as PRAGMA and EXPLAIN, and correctly treats
    // `CREATE VIEW ... AS SELECT ...` as a non-query.
    if stmt.column_count() > 0 {
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let mut rows: Vec<Vec<Value>> = Vec::new();

        let mut raw = stmt.raw_query();
        while let Some(row) = raw.next()? {
            if rows.len() >= max_rows {
                // The row we just fetched is the truncation peek: more data
                // existed than the cap allows. Cap, don't fail.
                tracing::info!(max_rows, "query returned more rows than the limit");
                break;
            }
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                values.push(value_to_json(row.get_ref(i)?));
            }
            rows.push(values);
        }

        let row_count = rows.len();
        Ok(QueryResult {
            columns,
            rows,
            row_count,
            affected_rows: None,
            execution_time_ms: elapsed_ms(&started),
            is_select: true,
            sql_executed: stmt_sql.to_string(),
        })
    } else {
        let affected = stmt.raw_execute()?;
        Ok(QueryResult {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            affected_rows: Some(affected as i64),
            execution_time_ms: elapsed_ms(&started),
            is_select: false,
            sql_executed: stmt_sql.to_string(),
        })
    }
}

/// Bind only the parameters the statement actually references, so one map can
/// serve every statement in a batch.
fn bind_params(stmt: &mut Statement<'_>, params: Option<&QueryParams>) -> rusqlite::Result<()> {
    let Some(params) = params else {
        return Ok(());
    };
    for (name, value) in params {
        let key = format!(":{name}");
        if let Some(index) = stmt.parameter_index(&key)? {
            stmt.raw_bind_parameter(index, json_to_sql(value))?;
        }
    }
    Ok(())
}

fn json_to_sql(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(*b as i64),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Sql::Integer(i),
            None => Sql::Real(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => Sql::Text(s.clone()),
        // Arrays and objects bind as their JSON text.
        other => Sql::Text(other.to_string()),
    }
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::from(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::from(BASE64.encode(b)),
    }
}

fn elapsed_ms(started: &Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn policy(enable_write: bool) -> QueryPolicy {
        QueryPolicy {
            timeout_ms: 2_000,
            max_rows: 1000,
            enable_write,
        }
    }

    fn fixture_db(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("test.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE users (user_id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE posts (
                 post_id INTEGER PRIMARY KEY,
                 user_id INTEGER REFERENCES users(user_id),
                 title TEXT
             );
             INSERT INTO users (user_id, name) VALUES
                 (1, 'alice'), (2, 'bob'), (3, 'carol'), (4, 'dave'), (5, 'erin'),
                 (6, 'frank'), (7, 'grace'), (8, 'heidi'), (9, 'ivan'), (10, 'judy');",
        )
        .unwrap();
        path
    }

    fn count_users(path: &Path) -> i64 {
        let conn = Connection::open(path).unwrap();
        conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn select_returns_rows_and_columns() {
        let dir = TempDir::new().unwrap();
        let db = fixture_db(&dir);

        let batch = execute_query(&db, "SELECT user_id, name FROM users ORDER BY user_id", None, None, &policy(false));
        assert!(batch.error.is_none());
        assert!(!batch.is_write_operation);
        assert_eq!(batch.results.len(), 1);

        let r = &batch.results[0];
        assert!(r.is_select);
        assert_eq!(r.columns, vec!["user_id", "name"]);
        assert_eq!(r.row_count, 10);
        assert_eq!(r.rows[0], vec![Value::from(1), Value::from("alice")]);
    }

    #[test]
    fn row_cap_limits_fetched_rows() {
        let dir = TempDir::new().unwrap();
        let db = fixture_db(&dir);

        let batch = execute_query(&db, "SELECT * FROM users", None, Some(3), &policy(false));
        assert!(batch.error.is_none());
        assert_eq!(batch.results[0].row_count, 3);
        assert_eq!(batch.results[0].rows.len(), 3);
    }

    #[test]
    fn write_is_blocked_when_disabled() {
        let dir = TempDir::new().unwrap();
        let db = fixture_db(&dir);

        let batch = execute_query(&db, "DELETE FROM users", None, None, &policy(false));
        assert!(batch.is_write_operation);
        assert!(batch.results.is_empty());
        assert!(batch.error.as_deref().unwrap().contains("disabled"));
        assert_eq!(count_users(&db), 10);
    }

    #[test]
    fn commented_out_write_prefix_still_reads() {
        let dir = TempDir::new().unwrap();
        let db = fixture_db(&dir);

        let batch = execute_query(
            &db,
            "-- DROP TABLE users\nSELECT name FROM users LIMIT 1",
            None,
            None,
            &policy(false),
        );
        assert!(!batch.is_write_operation);
        assert!(batch.error.is_none());
        assert_eq!(batch.results.len(), 1);
    }

    #[test]
    fn write_succeeds_when_enabled() {
        let dir = TempDir::new().unwrap();
        let db = fixture_db(&dir);

        let batch = execute_query(
            &db,
            "INSERT INTO users (user_id, name) VALUES (11, 'kim')",
            None,
            None,
            &policy(true),
        );
        assert!(batch.error.is_none());
        assert!(batch.is_write_operation);
        let r = &batch.results[0];
        assert!(!r.is_select);
        assert_eq!(r.affected_rows, Some(1));
        assert!(r.rows.is_empty());
        assert_eq!(count_users(&db), 11);
    }

    #[test]
    fn multi_statement_batch_runs_in_order() {
        let dir = TempDir::new().unwrap();
        let db = fixture_db(&dir);

        let batch = execute_query(
            &db,
            "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT);
             INSERT INTO notes (body) VALUES ('first');
             SELECT body FROM notes;",
            None,
            None,
            &policy(true),
        );
        assert!(batch.error.is_none());
        assert_eq!(batch.results.len(), 3);
        assert!(!batch.results[0].is_select);
        assert_eq!(batch.results[1].affected_rows, Some(1));
        assert_eq!(batch.results[2].rows, vec![vec![Value::from("first")]]);
    }

    #[test]
    fn failing_statement_stops_batch_and_keeps_prior_commits() {
        let dir = TempDir::new().unwrap();
        let db = fixture_db(&dir);

        let batch = execute_query(
            &db,
            "INSERT INTO users (user_id, name) VALUES (11, 'kim');
             INSERT INTO users VALUES ('bad', 'too', 'many');",
            None,
            None,
            &policy(true),
        );
        assert_eq!(batch.results.len(), 1);
        let err = batch.error.unwrap();
        assert!(err.contains("statement 2"), "error was: {err}");
        // Pinned granularity: the first statement auto-committed before the
        // second one failed.
        assert_eq!(count_users(&db), 11);
    }

    #[test]
    fn explicit_transaction_rolls_back_on_failure() {
        let dir = TempDir::new().unwrap();
        let db = fixture_db(&dir);

        let batch = execute_query(
            &db,
            "BEGIN;
             INSERT INTO users (user_id, name) VALUES (11, 'kim');
             INSERT INTO users VALUES ('bad', 'too', 'many');",
            None,
            None,
            &policy(true),
        );
        assert!(batch.error.is_some());
        assert_eq!(count_users(&db), 10);
    }

    #[test]
    fn named_params_bind_per_statement() {
        let dir = TempDir::new().unwrap();
        let db = fixture_db(&dir);

        let params: QueryParams = [
            ("id".to_string(), Value::from(2)),
            ("unused".to_string(), Value::from("ignored")),
        ]
        .into_iter()
        .collect();

        let batch = execute_query(
            &db,
            "SELECT name FROM users WHERE user_id = :id",
            Some(&params),
            None,
            &policy(false),
        );
        assert!(batch.error.is_none());
        assert_eq!(batch.results[0].rows, vec![vec![Value::from("bob")]]);
    }

    #[test]
    fn create_view_is_not_treated_as_select() {
        let dir = TempDir::new().unwrap();
        let db = fixture_db(&dir);

        let batch = execute_query(
            &db,
            "CREATE VIEW user_names AS SELECT name FROM users",
            None,
            None,
            &policy(true),
        );
        assert!(batch.error.is_none());
        let r = &batch.results[0];
        assert!(!r.is_select);
        assert!(r.columns.is_empty());
        assert_eq!(r.affected_rows, Some(0));
    }

    #[test]
    fn missing_file_reports_not_found_without_results() {
        let batch = execute_query(
            Path::new("/nonexistent/nowhere.db"),
            "SELECT 1",
            None,
            None,
            &policy(false),
        );
        assert!(batch.results.is_empty());
        let err = batch.error.unwrap().to_lowercase();
        assert!(err.contains("not found"), "error was: {err}");
    }

    #[test]
    fn comment_only_input_yields_empty_batch() {
        let dir = TempDir::new().unwrap();
        let db = fixture_db(&dir);

        let batch = execute_query(&db, "-- nothing to do", None, None, &policy(false));
        assert!(batch.error.is_none());
        assert!(batch.results.is_empty());
    }
}
