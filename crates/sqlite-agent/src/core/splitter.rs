//! Splits a raw SQL blob into individual statements.
//!
//! Single left-to-right scan. Semicolons inside string literals, quoted
//! identifiers, or comments never split; comment text is copied verbatim
//! into the statement that contains it.

/// Split `input` into trimmed statements. A statement keeps its terminating
/// semicolon; a trailing statement without one is still returned. Fragments
/// that are empty once comments are stripped are dropped, so an input of only
/// whitespace and comments yields an empty sequence.
pub fn split_statements(input: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            // Quotes cannot nest across the two kinds.
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                current.push(c);
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                current.push(c);
            }
            '-' if !in_single_quote && !in_double_quote && chars.peek() == Some(&'-') => {
                // Line comment: copy through end of line.
                current.push(c);
                for c in chars.by_ref() {
                    current.push(c);
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if !in_single_quote && !in_double_quote && chars.peek() == Some(&'*') => {
                // Block comment: copy through the closing `*/` (or end of input).
                current.push(c);
                current.push(chars.next().unwrap_or_default());
                let mut prev = '*';
                while let Some(c) = chars.next() {
                    current.push(c);
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            ';' if !in_single_quote && !in_double_quote => {
                current.push(c);
                push_statement(&mut statements, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }

    push_statement(&mut statements, &current);
    statements
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    // Keep comments attached to real statements, but never emit a fragment
    // that has no executable content at all.
    let executable = strip_comments(trimmed);
    if executable
        .trim_matches(|c: char| c.is_whitespace() || c == ';')
        .is_empty()
    {
        return;
    }
    statements.push(trimmed.to_string());
}

/// Remove `--` line comments and `/* */` block comments, replacing each with a
/// single space. Quote-aware with the same grammar as [`split_statements`], so
/// comment markers inside string literals or quoted identifiers are untouched.
pub fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                out.push(c);
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                out.push(c);
            }
            '-' if !in_single_quote && !in_double_quote && chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
                out.push(' ');
            }
            '/' if !in_single_quote && !in_double_quote && chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '*';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_statement_without_semicolon() {
        let out = split_statements("  SELECT 1  ");
        assert_eq!(out, vec!["SELECT 1"]);
    }

    #[test]
    fn two_statements() {
        let out = split_statements("SELECT 1; SELECT 2;");
        assert_eq!(out, vec!["SELECT 1;", "SELECT 2;"]);
    }

    #[test]
    fn semicolon_inside_string_literal_does_not_split() {
        let out = split_statements("SELECT ';' FROM t; SELECT 2;");
        assert_eq!(out, vec!["SELECT ';' FROM t;", "SELECT 2;"]);
    }

    #[test]
    fn semicolon_inside_quoted_identifier_does_not_split() {
        let out = split_statements("SELECT \"a;b\" FROM t; SELECT 2;");
        assert_eq!(out, vec!["SELECT \"a;b\" FROM t;", "SELECT 2;"]);
    }

    #[test]
    fn semicolon_inside_line_comment_does_not_split() {
        let out = split_statements("-- comment with ; inside\nSELECT 1;");
        assert_eq!(out.len(), 1);
        assert!(out[0].ends_with("SELECT 1;"));
    }

    #[test]
    fn semicolon_inside_block_comment_does_not_split() {
        let out = split_statements("/* a ; b */ SELECT 1;");
        assert_eq!(out, vec!["/* a ; b */ SELECT 1;"]);
    }

    #[test]
    fn whitespace_or_comment_only_input_yields_nothing() {
        assert!(split_statements("   \n\t ").is_empty());
        assert!(split_statements("-- just a comment").is_empty());
        assert!(split_statements("/* nothing here */;").is_empty());
        assert!(split_statements("").is_empty());
    }

    #[test]
    fn unterminated_block_comment_swallows_the_rest() {
        let out = split_statements("SELECT 1 /* trailing; SELECT 2;");
        assert_eq!(out, vec!["SELECT 1 /* trailing; SELECT 2;"]);
    }

    #[test]
    fn strip_comments_preserves_quoted_markers() {
        let out = strip_comments("SELECT '--not a comment' /* gone */ FROM t");
        assert!(out.contains("'--not a comment'"));
        assert!(!out.contains("gone"));
    }
}
