//! Flags statements that change a name or shape a client compiled against
//! the old schema would break on
//! — a rename with no compatibility view left behind, or a column type
//! narrowing that can silently truncate data older clients still write.

use regex::Regex;
use schema_connector::{Diagnostic, DiagnosticCategory};
use sql_schema_connector::create_view_after;

pub fn analyze(statements: &[String]) -> Vec<Diagnostic> {
    let rename_table = Regex::new(r#"(?is)^ALTER\s+TABLE\s+"?`?(\w+)`?"?\s+RENAME\s+TO\s+"?`?(\w+)`?"?"#)
        .expect("valid regex");
    let rename_column =
        Regex::new(r#"(?is)^ALTER\s+TABLE\s+"?`?(\w+)`?"?\s+RENAME\s+COLUMN\s+"?`?\w+`?"?\s+TO\s+"?`?\w+`?"?"#)
            .expect("valid regex");
    let narrow_type = Regex::new(r#"(?is)^ALTER\s+TABLE\s+\S+\s+ALTER\s+COLUMN\s+"?`?\w+`?"?\s+TYPE\s+(VARCHAR|CHAR|NUMERIC|DECIMAL)\s*\("#)
        .expect("valid regex");

    let mut diagnostics = Vec::new();

    for (i, stmt) in statements.iter().enumerate() {
        let trimmed = stmt.trim();

        if let Some(caps) = rename_table.captures(trimmed) {
            let old = &caps[1];
            let new = &caps[2];
            if !create_view_after(statements, old, new, i) {
                diagnostics.push(Diagnostic::new(
                    "SL301",
                    DiagnosticCategory::BackwardIncompatible,
                    format!("renames table `{old}` to `{new}` with no compatibility view left behind"),
                    i,
                ));
            }
        } else if rename_column.is_match(trimmed) {
            diagnostics.push(Diagnostic::new(
                "SL302",
                DiagnosticCategory::BackwardIncompatible,
                "renames a column; clients still selecting the old name will break",
                i,
            ));
        } else if narrow_type.is_match(trimmed) {
            diagnostics.push(Diagnostic::new(
                "SL303",
                DiagnosticCategory::BackwardIncompatible,
                "changes a column's type; may silently truncate values clients still write in the old shape",
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
    fn flags_table_rename_without_compat_view() {
        let stmts = vec!["ALTER TABLE old_name RENAME TO new_name".to_string()];
        let diags = analyze(&stmts);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "SL301");
    }

    #[test]
    fn does_not_flag_table_rename_with_compat_view() {
        let stmts = vec![
            "ALTER TABLE old_name RENAME TO new_name".to_string(),
            "CREATE VIEW old_name AS SELECT * FROM new_name".to_string(),
        ];
        let diags = analyze(&stmts);
        assert!(diags.is_empty());
    }

    #[test]
    fn flags_column_rename() {
        let stmts = vec!["ALTER TABLE t1 RENAME COLUMN a TO b".to_string()];
        let diags = analyze(&stmts);
        assert_eq!(diags[0].code, "SL302");
    }

    #[test]
    fn flags_column_type_narrowing() {
        let stmts = vec!["ALTER TABLE t1 ALTER COLUMN a TYPE VARCHAR(10)".to_string()];
        let diags = analyze(&stmts);
        assert_eq!(diags[0].code, "SL303");
    }
}
