use serde::{Deserialize, Serialize};

/// One lowered statement plus everything needed to undo it. `reverse` may
/// hold more than one statement — dropping a table with comments, for
/// instance, must recreate the table *and* reapply the `COMMENT ON`
/// statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanItem {
    pub cmd: String,
    pub reverse: Vec<String>,
    pub comment: Option<String>,
    /// Whether this single statement must run outside a transaction
    /// (concurrent index builds, enum value appends, VACUUM).
    pub non_transactional: bool,
    /// Whether this statement cannot be undone even when `reverse` is
    /// empty for a structural reason (enum value append, destructive drop
    /// in apply mode without data retention) — distinct from "we didn't
    /// bother computing a reverse".
    pub irreversible: bool,
}

impl PlanItem {
    pub fn new(cmd: impl Into<String>) -> Self {
        PlanItem {
            cmd: cmd.into(),
            reverse: Vec::new(),
            comment: None,
            non_transactional: false,
            irreversible: false,
        }
    }

    pub fn with_reverse(mut self, reverse: impl Into<String>) -> Self {
        self.reverse.push(reverse.into());
        self
    }

    pub fn with_reverses(mut self, reverse: Vec<String>) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn non_transactional(mut self) -> Self {
        self.non_transactional = true;
        self
    }

    pub fn irreversible(mut self) -> Self {
        self.irreversible = true;
        self
    }

    pub fn is_reversible(&self) -> bool {
        !self.irreversible && !self.reverse.is_empty()
    }
}

/// The Planner's output: an ordered list of statements with
/// reverses, plus the two verdicts every downstream consumer (Executor,
/// Migration Directory formatter, lint) relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub items: Vec<PlanItem>,
}

impl Plan {
    pub fn new(name: impl Into<String>, items: Vec<PlanItem>) -> Self {
        Plan {
            name: name.into(),
            items,
        }
    }

    /// A plan is reversible iff every item provides a reverse and none is
    /// marked structurally irreversible.
    pub fn reversible(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(PlanItem::is_reversible)
    }

    /// A plan is transactional iff no item opts out.
    pub fn transactional(&self) -> bool {
        !self.items.iter().any(|item| item.non_transactional)
    }

    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.cmd.as_str())
    }

    /// Statements to run, in LIFO order, to undo this plan.
    /// Panics-free: returns `None` if any item lacks a reverse.
    pub fn reverse_statements(&self) -> Option<Vec<String>> {
        if !self.reversible() {
            return None;
        }
        let mut out = Vec::new();
        for item in self.items.iter().rev() {
            out.extend(item.reverse.iter().rev().cloned());
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_plan_is_not_reversible() {
        let plan = Plan::new("0001_init", vec![]);
        assert!(!plan.reversible());
    }

    #[test]
    fn plan_with_full_reverses_is_reversible() {
        let plan = Plan::new(
            "0001_init",
            vec![PlanItem::new("CREATE TABLE t (id int)").with_reverse("DROP TABLE t")],
        );
        assert!(plan.reversible());
        assert!(plan.transactional());
    }

    #[test]
    fn irreversible_item_poisons_whole_plan() {
        let plan = Plan::new(
            "0002_enum",
            vec![PlanItem::new("ALTER TYPE state ADD VALUE 'x'").irreversible()],
        );
        assert!(!plan.reversible());
    }

    #[test]
    fn non_transactional_item_poisons_whole_plan() {
        let plan = Plan::new(
            "0003_concurrent_index",
            vec![PlanItem::new("CREATE INDEX CONCURRENTLY idx ON t (a)")
                .with_reverse("DROP INDEX idx")
                .non_transactional()],
        );
        assert!(plan.reversible());
        assert!(!plan.transactional());
    }

    #[test]
    fn reverse_statements_are_lifo() {
        let plan = Plan::new(
            "0004_two_steps",
            vec![
                PlanItem::new("ALTER TABLE t ADD COLUMN a int").with_reverse("ALTER TABLE t DROP COLUMN a"),
                PlanItem::new("ALTER TABLE t ADD COLUMN b int").with_reverse("ALTER TABLE t DROP COLUMN b"),
            ],
        );
        let reverse = plan.reverse_statements().unwrap();
        assert_eq!(
            reverse,
            vec!["ALTER TABLE t DROP COLUMN b", "ALTER TABLE t DROP COLUMN a"]
        );
    }
}
