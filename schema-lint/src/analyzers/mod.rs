//! The three lint analyzers: destructive, data-dependent,
//! backward-incompatible. Each takes the canonical statement list the
//! [`crate::replay`] step produced (or, in tests, a hand-written one) and
//! returns whatever [`schema_connector::Diagnostic`]s it flags — no shared
//! trait, since every analyzer's signature is identical and a trait object
//! would only cost a vtable indirection for no real polymorphism.

pub mod backward_incompatible;
pub mod data_dependent;
pub mod destructive;

use schema_connector::Diagnostic;

/// Runs every analyzer over `statements` and drops whatever a file's
/// `-- atlas:nolint <code|category>` directive suppresses.
pub fn analyze_all(statements: &[String], suppressions: &[String]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    diagnostics.extend(destructive::analyze(statements));
    diagnostics.extend(data_dependent::analyze(statements));
    diagnostics.extend(backward_incompatible::analyze(statements));
    diagnostics.retain(|d| !d.suppressed_by(suppressions));
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nolint_directive_suppresses_matching_code() {
        let stmts = vec!["DROP TABLE users".to_string()];
        let diagnostics = analyze_all(&stmts, &["SL101".to_string()]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn nolint_directive_suppresses_matching_category() {
        let stmts = vec!["DROP TABLE users".to_string()];
        let diagnostics = analyze_all(&stmts, &["destructive".to_string()]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn unsuppressed_statements_still_flag() {
        let stmts = vec!["DROP TABLE users".to_string()];
        let diagnostics = analyze_all(&stmts, &[]);
        assert_eq!(diagnostics.len(), 1);
    }
}
