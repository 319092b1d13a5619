//! Static and dev-replay migration linting: three
//! analyzers — destructive, data-dependent, backward-incompatible — run
//! over a migration file's statements, with `-- atlas:nolint` directives
//! suppressing whichever ones the author already signed off on.

pub mod analyzers;
pub mod replay;

use migration_directory::MigrationFile;
use schema_connector::Diagnostic;

/// Lints one migration file's own statements in isolation — no replay,
/// no connection to a dev database, just the text the file already
/// contains. Used for the fast, offline path; [`replay::replay_and_inspect`]
/// feeds the same analyzers real post-apply statement text for the
/// dev-database path.
pub fn lint_file(file: &MigrationFile) -> Vec<Diagnostic> {
    let statements: Vec<String> = file.stmts().into_iter().map(|s| s.text).collect();
    analyzers::analyze_all(&statements, &file.nolint_suppressions())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lint_file_suppresses_via_nolint_directive() {
        let file = MigrationFile::new(
            "20260101000000_drop_users.sql",
            "-- atlas:nolint SL101\nDROP TABLE users;\n",
        );
        assert!(lint_file(&file).is_empty());
    }

    #[test]
    fn lint_file_flags_unsuppressed_destructive_statement() {
        let file = MigrationFile::new("20260101000000_drop_users.sql", "DROP TABLE users;\n");
        let diagnostics = lint_file(&file);
        assert!(diagnostics.iter().any(|d| d.code == "SL101"));
    }
}
