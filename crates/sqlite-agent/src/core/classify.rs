//! Classifies SQL text as read-only or mutating.

use crate::core::splitter::strip_comments;

/// Keywords that mark a statement as mutating schema or data.
const WRITE_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "REPLACE",
];

/// True when `sql` starts with a write keyword once comments are stripped.
///
/// Prefix test only: a write buried mid-statement (e.g. behind a CTE) is not
/// detected here; the execution policy relies on SQLite itself rejecting such
/// statements on read-only handles where that matters.
pub fn is_write_operation(sql: &str) -> bool {
    let cleaned = strip_comments(sql).trim().to_uppercase();
    WRITE_KEYWORDS.iter().any(|kw| cleaned.starts_with(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_is_read() {
        assert!(!is_write_operation("SELECT * FROM t"));
        assert!(!is_write_operation("select * from t"));
    }

    #[test]
    fn insert_is_write() {
        assert!(is_write_operation("INSERT INTO t VALUES (1)"));
        assert!(is_write_operation("  insert into t values (1)"));
    }

    #[test]
    fn ddl_is_write() {
        assert!(is_write_operation("CREATE TABLE t (id INTEGER)"));
        assert!(is_write_operation("DROP TABLE t"));
        assert!(is_write_operation("ALTER TABLE t ADD COLUMN x"));
        assert!(is_write_operation("REPLACE INTO t VALUES (1)"));
    }

    #[test]
    fn commented_out_write_is_read() {
        assert!(!is_write_operation("  -- DROP TABLE x\nSELECT 1"));
        assert!(!is_write_operation("/* DELETE FROM t */ SELECT 1"));
    }

    #[test]
    fn write_keyword_inside_string_is_read() {
        assert!(!is_write_operation("SELECT 'DROP TABLE t' FROM t"));
    }

    #[test]
    fn pragma_is_read() {
        assert!(!is_write_operation("PRAGMA table_info(t)"));
    }
}
