//! The SQL Parser Bridge: for the *versioned*
//! workflow the engine accepts hand-written SQL files and needs to recover
//! rename intent the differ's name-based pairing can't see on its own. A
//! per-dialect parse splits a file into canonical statements; a
//! regex pass over that canonical text (not the raw AST — `sqlparser`'s
//! statement shape varies enough across its own dialects that matching on
//! it directly would be more fragile than the text it renders) recovers
//! `RENAME` intent and fuses the differ's `Drop*`/`Add*` pairs into
//! `Rename*`. The same canonical statements back the linter's
//! `column_filled_before`/`create_view_after` checks.

use crate::differ::Change;
use regex::Regex;
use schema_connector::{ConnectorError, ConnectorResult, Dialect};
use sqlparser::dialect::{Dialect as SqlTextDialect, GenericDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

fn text_dialect(dialect: Dialect) -> Box<dyn SqlTextDialect> {
    match dialect {
        Dialect::Mysql => Box::new(MySqlDialect {}),
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::Sqlite => Box::new(SQLiteDialect {}),
    }
}

/// Parses `sql` with the dialect's grammar, falling back to the generic
/// dialect if the dialect-specific parser rejects a statement a real
/// server would accept (vendor extensions `sqlparser` doesn't model).
/// Returns each statement re-rendered to its canonical text, one entry per
/// statement, in file order.
pub fn split_statements(sql: &str, dialect: Dialect) -> ConnectorResult<Vec<String>> {
    let specific = text_dialect(dialect);
    let statements = Parser::parse_sql(specific.as_ref(), sql)
        .or_else(|_| Parser::parse_sql(&GenericDialect {}, sql))
        .map_err(|e| ConnectorError::driver(e, Some("parsing migration file".into())))?;
    Ok(statements.iter().map(|s| s.to_string()).collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRenameHint {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRenameHint {
    pub table: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRenameHint {
    /// `None` for PostgreSQL's `ALTER INDEX … RENAME TO …`, which never
    /// names the owning table; `fuse_renames` falls back to matching the
    /// index name alone in that case.
    pub table: Option<String>,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default)]
pub struct RenameHints {
    pub tables: Vec<TableRenameHint>,
    pub columns: Vec<ColumnRenameHint>,
    pub indexes: Vec<IndexRenameHint>,
}

fn bare_ident(raw: &str) -> String {
    let raw = raw.trim();
    let last = raw.rsplit('.').next().unwrap_or(raw);
    last.trim_matches(|c| c == '"' || c == '`' || c == '\'').to_string()
}

fn ident_eq(a: &str, b: &str) -> bool {
    bare_ident(a).eq_ignore_ascii_case(&bare_ident(b))
}

/// Reads rename intent out of a file's canonical statements. Column and
/// MySQL-style index renames are matched before the bare `RENAME TO` table
/// pattern, since a looser table-rename regex would otherwise need to
/// explicitly exclude them.
pub fn detect_rename_hints(statements: &[String]) -> RenameHints {
    let column_rename = Regex::new(r#"(?is)^ALTER\s+TABLE\s+([\w".]+)\s+RENAME\s+COLUMN\s+([\w"]+)\s+TO\s+([\w"]+)"#)
        .expect("valid regex");
    let index_rename_mysql =
        Regex::new(r#"(?is)^ALTER\s+TABLE\s+([\w".]+)\s+RENAME\s+INDEX\s+([\w"]+)\s+TO\s+([\w"]+)"#)
            .expect("valid regex");
    let table_rename = Regex::new(r#"(?is)^ALTER\s+TABLE\s+([\w".]+)\s+RENAME\s+TO\s+([\w".]+)"#).expect("valid regex");
    let index_rename_pg = Regex::new(r#"(?is)^ALTER\s+INDEX\s+([\w".]+)\s+RENAME\s+TO\s+([\w".]+)"#).expect("valid regex");

    let mut hints = RenameHints::default();
    for stmt in statements {
        let stmt = stmt.trim();
        if let Some(c) = column_rename.captures(stmt) {
            hints.columns.push(ColumnRenameHint {
                table: bare_ident(&c[1]),
                from: bare_ident(&c[2]),
                to: bare_ident(&c[3]),
            });
        } else if let Some(c) = index_rename_mysql.captures(stmt) {
            hints.indexes.push(IndexRenameHint {
                table: Some(bare_ident(&c[1])),
                from: bare_ident(&c[2]),
                to: bare_ident(&c[3]),
            });
        } else if let Some(c) = table_rename.captures(stmt) {
            hints.tables.push(TableRenameHint {
                from: bare_ident(&c[1]),
                to: bare_ident(&c[2]),
            });
        } else if let Some(c) = index_rename_pg.captures(stmt) {
            hints.indexes.push(IndexRenameHint {
                table: None,
                from: bare_ident(&c[1]),
                to: bare_ident(&c[2]),
            });
        }
    }
    hints
}

/// Fuses a `{Drop*; Add*}` pair the differ produced into the matching
/// `Rename*` whenever `hints` says the file renamed that exact shape.
/// Enum-value renames have no corresponding `Change` variant — the differ
/// only ever appends enum values, so there is never a drop half to fuse against — and so
/// are intentionally left undetected here.
pub fn fuse_renames(mut changes: Vec<Change>, hints: &RenameHints) -> Vec<Change> {
    for hint in &hints.tables {
        let drop_idx = changes
            .iter()
            .position(|c| matches!(c, Change::DropTable { table, .. } if ident_eq(table, &hint.from)));
        let add_idx = changes
            .iter()
            .position(|c| matches!(c, Change::AddTable { table, .. } if ident_eq(table, &hint.to)));
        if let (Some(di), Some(ai)) = (drop_idx, add_idx) {
            let schema = match &changes[di] {
                Change::DropTable { schema, .. } => schema.clone(),
                _ => unreachable!(),
            };
            changes[di] = Change::RenameTable {
                schema,
                from: hint.from.clone(),
                to: hint.to.clone(),
            };
            changes.remove(ai);
        }
    }

    for hint in &hints.columns {
        let drop_idx = changes.iter().position(|c| {
            matches!(c, Change::DropColumn { table, column, .. } if ident_eq(table, &hint.table) && ident_eq(column, &hint.from))
        });
        let add_idx = changes.iter().position(|c| {
            matches!(c, Change::AddColumn { table, column, .. } if ident_eq(table, &hint.table) && ident_eq(column, &hint.to))
        });
        if let (Some(di), Some(ai)) = (drop_idx, add_idx) {
            let schema = match &changes[di] {
                Change::DropColumn { schema, .. } => schema.clone(),
                _ => unreachable!(),
            };
            let table = match &changes[di] {
                Change::DropColumn { table, .. } => table.clone(),
                _ => unreachable!(),
            };
            changes[di] = Change::RenameColumn {
                schema,
                table,
                from: hint.from.clone(),
                to: hint.to.clone(),
            };
            changes.remove(ai);
        }
    }

    for hint in &hints.indexes {
        let drop_idx = changes.iter().position(|c| match c {
            Change::DropIndex { table, index, .. } => {
                ident_eq(index, &hint.from) && hint.table.as_deref().map_or(true, |t| ident_eq(table, t))
            }
            _ => false,
        });
        let add_idx = changes.iter().position(|c| match c {
            Change::AddIndex { table, index, .. } => {
                ident_eq(index, &hint.to) && hint.table.as_deref().map_or(true, |t| ident_eq(table, t))
            }
            _ => false,
        });
        if let (Some(di), Some(ai)) = (drop_idx, add_idx) {
            let (schema, table) = match &changes[di] {
                Change::DropIndex { schema, table, .. } => (schema.clone(), table.clone()),
                _ => unreachable!(),
            };
            changes[di] = Change::RenameIndex {
                schema,
                table,
                from: hint.from.clone(),
                to: hint.to.clone(),
            };
            changes.remove(ai);
        }
    }

    changes
}

/// Runs the full bridge over one migration file's contents: parses it for
/// the given dialect, recovers rename hints, and fuses them into `changes`.
/// Returns the canonical statements alongside the fused list so a caller
/// can reuse them for `column_filled_before`/`create_view_after` without
/// re-parsing.
pub fn bridge(sql: &str, dialect: Dialect, changes: Vec<Change>) -> ConnectorResult<(Vec<String>, Vec<Change>)> {
    let statements = split_statements(sql, dialect)?;
    let hints = detect_rename_hints(&statements);
    Ok((statements.clone(), fuse_renames(changes, &hints)))
}

/// Whether an `UPDATE` touching `table`/`column` appears among the
/// statements strictly before `pos` — the linter's data-dependent check for
/// whether a backfill preceded a `SET NOT NULL`.
pub fn column_filled_before(statements: &[String], table: &str, column: &str, pos: usize) -> bool {
    let pattern = format!(
        r#"(?is)^UPDATE\s+"?{table}"?\b.*\bSET\b.*\b{column}\b"#,
        table = regex::escape(table),
        column = regex::escape(column),
    );
    let re = Regex::new(&pattern).expect("valid regex");
    statements[..pos.min(statements.len())].iter().any(|s| re.is_match(s))
}

/// Whether a `CREATE VIEW old AS SELECT … FROM new` appears among the
/// statements strictly after `pos` — the linter's check for a compatibility
/// shim preserving a renamed table's old name.
pub fn create_view_after(statements: &[String], old: &str, new: &str, pos: usize) -> bool {
    let pattern = format!(
        r#"(?is)^CREATE\s+VIEW\s+"?{old}"?\b.*\bFROM\s+"?{new}"?\b"#,
        old = regex::escape(old),
        new = regex::escape(new),
    );
    let re = Regex::new(&pattern).expect("valid regex");
    statements.get(pos + 1..).unwrap_or(&[]).iter().any(|s| re.is_match(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::ColumnChanges;

    #[test]
    fn detects_column_rename_hint() {
        let stmts = vec!["ALTER TABLE t1 RENAME COLUMN a TO b".to_string()];
        let hints = detect_rename_hints(&stmts);
        assert_eq!(hints.columns.len(), 1);
        assert_eq!(hints.columns[0].table, "t1");
        assert_eq!(hints.columns[0].from, "a");
        assert_eq!(hints.columns[0].to, "b");
    }

    #[test]
    fn detects_table_rename_hint_but_not_column_rename() {
        let stmts = vec!["ALTER TABLE t1 RENAME TO t2".to_string()];
        let hints = detect_rename_hints(&stmts);
        assert_eq!(hints.tables.len(), 1);
        assert!(hints.columns.is_empty());
        assert_eq!(hints.tables[0].from, "t1");
        assert_eq!(hints.tables[0].to, "t2");
    }

    #[test]
    fn detects_postgres_index_rename_without_table() {
        let stmts = vec![r#"ALTER INDEX "idx_a" RENAME TO "idx_b""#.to_string()];
        let hints = detect_rename_hints(&stmts);
        assert_eq!(hints.indexes.len(), 1);
        assert!(hints.indexes[0].table.is_none());
    }

    #[test]
    fn fuses_drop_add_column_into_rename() {
        let changes = vec![
            Change::DropColumn {
                schema: "s1".into(),
                table: "t1".into(),
                column: "a".into(),
            },
            Change::AddColumn {
                schema: "s1".into(),
                table: "t1".into(),
                column: "b".into(),
            },
        ];
        let mut hints = RenameHints::default();
        hints.columns.push(ColumnRenameHint {
            table: "t1".into(),
            from: "a".into(),
            to: "b".into(),
        });
        let fused = fuse_renames(changes, &hints);
        assert_eq!(fused.len(), 1);
        assert!(matches!(&fused[0], Change::RenameColumn { from, to, .. } if from == "a" && to == "b"));
    }

    #[test]
    fn leaves_unrelated_changes_untouched() {
        let changes = vec![Change::ModifyColumn {
            schema: "s1".into(),
            table: "t1".into(),
            column: "c".into(),
            changes: ColumnChanges::empty(),
        }];
        let fused = fuse_renames(changes.clone(), &RenameHints::default());
        assert_eq!(fused.len(), changes.len());
    }

    #[test]
    fn column_filled_before_finds_preceding_backfill() {
        let stmts = vec![
            "UPDATE t1 SET a = 0".to_string(),
            "ALTER TABLE t1 ALTER COLUMN a SET NOT NULL".to_string(),
        ];
        assert!(column_filled_before(&stmts, "t1", "a", 1));
        assert!(!column_filled_before(&stmts, "t1", "a", 0));
    }

    #[test]
    fn create_view_after_finds_following_shim() {
        let stmts = vec![
            "ALTER TABLE old_name RENAME TO new_name".to_string(),
            "CREATE VIEW old_name AS SELECT * FROM new_name".to_string(),
        ];
        assert!(create_view_after(&stmts, "old_name", "new_name", 0));
        assert!(!create_view_after(&stmts, "old_name", "new_name", 1));
    }

    #[test]
    fn split_statements_splits_multiple_statements() {
        let sql = "CREATE TABLE t1 (a int); CREATE TABLE t2 (b int);";
        let stmts = split_statements(sql, Dialect::Postgres).unwrap();
        assert_eq!(stmts.len(), 2);
    }
}
