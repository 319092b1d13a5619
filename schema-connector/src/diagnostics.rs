use serde::{Deserialize, Serialize};

/// The three lint categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticCategory {
    Destructive,
    DataDependent,
    BackwardIncompatible,
}

/// One diagnostic emitted by the lint analyzers while replaying a
/// migration file against a dev database. `code` is a short, stable
/// identifier (e.g. `"MF101"`) so a migration file's
/// `-- atlas:nolint <code|category>` directive can suppress it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub category: DiagnosticCategory,
    pub message: String,
    pub statement_index: usize,
}

impl Diagnostic {
    pub fn new(
        code: &'static str,
        category: DiagnosticCategory,
        message: impl Into<String>,
        statement_index: usize,
    ) -> Self {
        Diagnostic {
            code,
            category,
            message: message.into(),
            statement_index,
        }
    }

    pub fn suppressed_by(&self, suppressions: &[String]) -> bool {
        suppressions.iter().any(|s| {
            s == self.code
                || match self.category {
                    DiagnosticCategory::Destructive => s == "destructive",
                    DiagnosticCategory::DataDependent => s == "data-dependent",
                    DiagnosticCategory::BackwardIncompatible => s == "backward-incompatible",
                }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppressed_by_matches_code_or_category() {
        let diag = Diagnostic::new(
            "MF101",
            DiagnosticCategory::Destructive,
            "dropping column loses data",
            0,
        );
        assert!(diag.suppressed_by(&["MF101".to_string()]));
        assert!(diag.suppressed_by(&["destructive".to_string()]));
        assert!(!diag.suppressed_by(&["data-dependent".to_string()]));
    }
}
