use crate::create_table::ColumnSpec;
use crate::ident::{qualified, Ident, Quoting};
use std::fmt;

/// One `ALTER TABLE` clause. Dialects differ on whether several of these
/// can share a single statement (MySQL/Postgres collapse them; TiDB
/// forbids multi-clause `ALTER TABLE` and must emit one statement per
/// clause). [`AlterTable`] renders all clauses together; the
/// per-dialect planner decides whether to split them into several
/// `AlterTable` values first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterTableClause {
    AddColumn(ColumnSpec),
    DropColumn(String),
    AlterColumnType { column: String, type_name: String },
    AlterColumnSetNotNull(String),
    AlterColumnDropNotNull(String),
    AlterColumnSetDefault { column: String, default: String },
    AlterColumnDropDefault(String),
    RenameColumn { from: String, to: String },
    AddConstraintPrimaryKey(Vec<String>),
    DropPrimaryKey(Option<String>),
    AddForeignKey {
        name: Option<String>,
        columns: Vec<String>,
        referenced_table: String,
        referenced_columns: Vec<String>,
        on_delete: Option<String>,
        on_update: Option<String>,
    },
    DropForeignKey(String),
    AddCheck { name: String, expression: String },
    DropCheck(String),
    Raw(String),
}

impl AlterTableClause {
    fn render(&self, quoting: Quoting) -> String {
        match self {
            AlterTableClause::AddColumn(col) => {
                let rendered = crate::create_table::CreateTable::new("_", quoting)
                    .column(col.clone())
                    .to_string();
                let inner = rendered
                    .trim_start_matches(|c| c != '(')
                    .trim_start_matches('(')
                    .trim_end_matches(')');
                format!("ADD COLUMN {inner}")
            }
            AlterTableClause::DropColumn(name) => format!("DROP COLUMN {}", Ident::new(name, quoting)),
            AlterTableClause::AlterColumnType { column, type_name } => {
                format!("ALTER COLUMN {} TYPE {}", Ident::new(column, quoting), type_name)
            }
            AlterTableClause::AlterColumnSetNotNull(column) => {
                format!("ALTER COLUMN {} SET NOT NULL", Ident::new(column, quoting))
            }
            AlterTableClause::AlterColumnDropNotNull(column) => {
                format!("ALTER COLUMN {} DROP NOT NULL", Ident::new(column, quoting))
            }
            AlterTableClause::AlterColumnSetDefault { column, default } => {
                format!("ALTER COLUMN {} SET DEFAULT {}", Ident::new(column, quoting), default)
            }
            AlterTableClause::AlterColumnDropDefault(column) => {
                format!("ALTER COLUMN {} DROP DEFAULT", Ident::new(column, quoting))
            }
            AlterTableClause::RenameColumn { from, to } => {
                format!(
                    "RENAME COLUMN {} TO {}",
                    Ident::new(from, quoting),
                    Ident::new(to, quoting)
                )
            }
            AlterTableClause::AddConstraintPrimaryKey(cols) => {
                let rendered = cols
                    .iter()
                    .map(|c| Ident::new(c, quoting).to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("ADD PRIMARY KEY ({rendered})")
            }
            AlterTableClause::DropPrimaryKey(name) => match name {
                Some(name) => format!("DROP CONSTRAINT {}", Ident::new(name, quoting)),
                None => "DROP PRIMARY KEY".to_string(),
            },
            AlterTableClause::AddForeignKey {
                name,
                columns,
                referenced_table,
                referenced_columns,
                on_delete,
                on_update,
            } => {
                let mut out = String::from("ADD ");
                if let Some(name) = name {
                    out.push_str(&format!("CONSTRAINT {} ", Ident::new(name, quoting)));
                }
                out.push_str(&format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    render_list(columns, quoting),
                    Ident::new(referenced_table, quoting),
                    render_list(referenced_columns, quoting)
                ));
                if let Some(a) = on_delete {
                    out.push_str(" ON DELETE ");
                    out.push_str(a);
                }
                if let Some(a) = on_update {
                    out.push_str(" ON UPDATE ");
                    out.push_str(a);
                }
                out
            }
            AlterTableClause::DropForeignKey(name) => {
                format!("DROP FOREIGN KEY {}", Ident::new(name, quoting))
            }
            AlterTableClause::AddCheck { name, expression } => {
                format!("ADD CONSTRAINT {} CHECK ({expression})", Ident::new(name, quoting))
            }
            AlterTableClause::DropCheck(name) => {
                format!("DROP CONSTRAINT {}", Ident::new(name, quoting))
            }
            AlterTableClause::Raw(raw) => raw.clone(),
        }
    }
}

fn render_list(columns: &[String], quoting: Quoting) -> String {
    columns
        .iter()
        .map(|c| Ident::new(c, quoting).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterTable {
    pub schema: Option<String>,
    pub table: String,
    pub clauses: Vec<AlterTableClause>,
    pub quoting: Quoting,
}

impl AlterTable {
    pub fn new(table: impl Into<String>, quoting: Quoting) -> Self {
        AlterTable {
            schema: None,
            table: table.into(),
            clauses: Vec::new(),
            quoting,
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn clause(mut self, clause: AlterTableClause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Splits this statement into one single-clause `AlterTable` per
    /// clause — for dialects (TiDB) that forbid multi-clause `ALTER TABLE`.
    pub fn split(&self) -> Vec<AlterTable> {
        self.clauses
            .iter()
            .map(|clause| AlterTable {
                schema: self.schema.clone(),
                table: self.table.clone(),
                clauses: vec![clause.clone()],
                quoting: self.quoting,
            })
            .collect()
    }
}

impl fmt::Display for AlterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = qualified(self.schema.as_deref(), &self.table, self.quoting);
        let clauses = self
            .clauses
            .iter()
            .map(|c| c.render(self.quoting))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "ALTER TABLE {name} {clauses}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_column_renders_standard_clause() {
        let stmt = AlterTable::new("t1", Quoting::DoubleQuote)
            .schema("s1")
            .clause(AlterTableClause::RenameColumn {
                from: "a".into(),
                to: "b".into(),
            });
        assert_eq!(
            stmt.to_string(),
            "ALTER TABLE \"s1\".\"t1\" RENAME COLUMN \"a\" TO \"b\""
        );
    }

    #[test]
    fn primary_key_swap_collapses_into_one_statement() {
        let stmt = AlterTable::new("posts", Quoting::DoubleQuote)
            .clause(AlterTableClause::DropPrimaryKey(Some("posts_pkey".into())))
            .clause(AlterTableClause::AddConstraintPrimaryKey(vec!["id".into(), "tenant_id".into()]));
        assert_eq!(
            stmt.to_string(),
            "ALTER TABLE \"posts\" DROP CONSTRAINT \"posts_pkey\", ADD PRIMARY KEY (\"id\", \"tenant_id\")"
        );
    }

    #[test]
    fn split_produces_one_statement_per_clause() {
        let stmt = AlterTable::new("t1", Quoting::Backtick)
            .clause(AlterTableClause::DropColumn("a".into()))
            .clause(AlterTableClause::AddColumn(ColumnSpec::new("b", "int", true)));
        let split = stmt.split();
        assert_eq!(split.len(), 2);
        assert_eq!(split[0].to_string(), "ALTER TABLE `t1` DROP COLUMN `a`");
        assert_eq!(split[1].to_string(), "ALTER TABLE `t1` ADD COLUMN `b` int");
    }
}
