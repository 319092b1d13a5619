//! Flags statements whose success or behavior depends on the data already
//! sitting in the table, not just its structure — a backfill that didn't run first, a `NOT NULL`
//! that existing rows can't satisfy, a `UNIQUE` constraint duplicate rows
//! would violate.

use regex::Regex;
use schema_connector::{Diagnostic, DiagnosticCategory};
use sql_schema_connector::column_filled_before;

pub fn analyze(statements: &[String]) -> Vec<Diagnostic> {
    let set_not_null = Regex::new(r#"(?is)^ALTER\s+TABLE\s+"?([\w.]+?)"?\s+ALTER\s+COLUMN\s+"?(\w+)"?\s+SET\s+NOT\s+NULL"#)
        .expect("valid regex");
    let modify_not_null =
        Regex::new(r#"(?is)^ALTER\s+TABLE\s+`?([\w.]+?)`?\s+MODIFY(?:\s+COLUMN)?\s+`?(\w+)`?\s+[\w()]+\s+NOT\s+NULL"#)
            .expect("valid regex");
    let add_column_not_null =
        Regex::new(r#"(?is)^ALTER\s+TABLE\s+\S+\s+ADD\s+COLUMN\s+"?`?(\w+)`?"?\s+[\w()]+.*\bNOT\s+NULL\b"#)
            .expect("valid regex");
    let add_unique = Regex::new(r#"(?is)^CREATE\s+UNIQUE\s+INDEX\b"#).expect("valid regex");

    let mut diagnostics = Vec::new();

    for (i, stmt) in statements.iter().enumerate() {
        let trimmed = stmt.trim();

        let not_null_capture = set_not_null
            .captures(trimmed)
            .or_else(|| modify_not_null.captures(trimmed));
        if let Some(caps) = not_null_capture {
            let table = caps[1].to_string();
            let column = caps[2].to_string();
            if !column_filled_before(statements, &table, &column, i) {
                diagnostics.push(Diagnostic::new(
                    "SL201",
                    DiagnosticCategory::DataDependent,
                    format!("sets `{column}` NOT NULL without a backfill update beforehand; rows with NULL will fail"),
                    i,
                ));
            }
        } else if let Some(caps) = add_column_not_null.captures(trimmed) {
            if !trimmed.to_ascii_uppercase().contains("DEFAULT") {
                diagnostics.push(Diagnostic::new(
                    "SL202",
                    DiagnosticCategory::DataDependent,
                    format!("adds column `{}` as NOT NULL with no DEFAULT; fails on a non-empty table", &caps[1]),
                    i,
                ));
            }
        } else if add_unique.is_match(trimmed) {
            diagnostics.push(Diagnostic::new(
                "SL203",
                DiagnosticCategory::DataDependent,
                "creates a unique index; fails if existing rows already duplicate the indexed columns",
                i,
            ));
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_set_not_null_without_backfill() {
        let stmts = vec!["ALTER TABLE t1 ALTER COLUMN a SET NOT NULL".to_string()];
        let diags = analyze(&stmts);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "SL201");
    }

    #[test]
    fn does_not_flag_set_not_null_after_backfill() {
        let stmts = vec![
            "UPDATE t1 SET a = 0 WHERE a IS NULL".to_string(),
            "ALTER TABLE t1 ALTER COLUMN a SET NOT NULL".to_string(),
        ];
        let diags = analyze(&stmts);
        assert!(diags.is_empty());
    }

    #[test]
    fn flags_not_null_column_add_without_default() {
        let stmts = vec!["ALTER TABLE t1 ADD COLUMN a int NOT NULL".to_string()];
        let diags = analyze(&stmts);
        assert_eq!(diags[0].code, "SL202");
    }

    #[test]
    fn does_not_flag_not_null_column_add_with_default() {
        let stmts = vec!["ALTER TABLE t1 ADD COLUMN a int NOT NULL DEFAULT 0".to_string()];
        assert!(analyze(&stmts).is_empty());
    }

    #[test]
    fn flags_unique_index_creation() {
        let stmts = vec!["CREATE UNIQUE INDEX idx_a ON t1 (a)".to_string()];
        let diags = analyze(&stmts);
        assert_eq!(diags[0].code, "SL203");
    }
}
