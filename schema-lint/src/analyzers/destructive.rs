//! Flags statements that discard data or schema structure outright — the
//! kind no backfill or view shim can make safe.

use regex::Regex;
use schema_connector::{Diagnostic, DiagnosticCategory};

pub fn analyze(statements: &[String]) -> Vec<Diagnostic> {
    let drop_table = Regex::new(r#"(?is)^DROP\s+TABLE\b"#).expect("valid regex");
    let drop_column = Regex::new(r#"(?is)^ALTER\s+TABLE\s+\S+\s+DROP\s+COLUMN\b"#).expect("valid regex");
    let drop_schema = Regex::new(r#"(?is)^DROP\s+SCHEMA\b"#).expect("valid regex");

    statements
        .iter()
        .enumerate()
        .filter_map(|(i, stmt)| {
            let stmt = stmt.trim();
            if drop_table.is_match(stmt) {
                Some(Diagnostic::new("SL101", DiagnosticCategory::Destructive, "drops a table and its data", i))
            } else if drop_column.is_match(stmt) {
                Some(Diagnostic::new("SL102", DiagnosticCategory::Destructive, "drops a column and its data", i))
            } else if drop_schema.is_match(stmt) {
                Some(Diagnostic::new(
                    "SL103",
                    DiagnosticCategory::Destructive,
                    "drops a schema and everything in it",
                    i,
                ))
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_drop_table() {
        let stmts = vec!["DROP TABLE users".to_string()];
        let diags = analyze(&stmts);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "SL101");
    }

    #[test]
    fn flags_drop_column() {
        let stmts = vec!["ALTER TABLE users DROP COLUMN age".to_string()];
        let diags = analyze(&stmts);
        assert_eq!(diags[0].code, "SL102");
    }

    #[test]
    fn ignores_unrelated_statements() {
        let stmts = vec!["CREATE TABLE users (id int)".to_string()];
        assert!(analyze(&stmts).is_empty());
    }
}
