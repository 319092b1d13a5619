use crate::ident::{qualified, Ident, Quoting};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    /// The dialect's raw type string (`"bigint"`, `"character varying(255)"`, …) — the authoritative form.
    pub type_name: String,
    pub nullable: bool,
    pub default: Option<String>,
    /// Extra trailing clauses the differ/planner already rendered
    /// (`AUTO_INCREMENT`, `GENERATED ALWAYS AS (...) STORED`, …).
    pub trailing: Vec<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, nullable: bool) -> Self {
        ColumnSpec {
            name: name.into(),
            type_name: type_name.into(),
            nullable,
            default: None,
            trailing: Vec::new(),
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_trailing(mut self, clause: impl Into<String>) -> Self {
        self.trailing.push(clause.into());
        self
    }

    fn render(&self, quoting: Quoting) -> String {
        let mut out = format!("{} {}", Ident::new(&self.name, quoting), self.type_name);
        if !self.nullable {
            out.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            out.push_str(" DEFAULT ");
            out.push_str(default);
        }
        for clause in &self.trailing {
            out.push(' ');
            out.push_str(clause);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableConstraint {
    PrimaryKey(Vec<String>),
    Unique { name: String, columns: Vec<String> },
    ForeignKey {
        name: Option<String>,
        columns: Vec<String>,
        referenced_table: String,
        referenced_columns: Vec<String>,
        on_delete: Option<String>,
        on_update: Option<String>,
    },
    Check { name: Option<String>, expression: String },
}

impl TableConstraint {
    fn render(&self, quoting: Quoting) -> String {
        match self {
            TableConstraint::PrimaryKey(cols) => {
                format!("PRIMARY KEY ({})", render_column_list(cols, quoting))
            }
            TableConstraint::Unique { name, columns } => {
                format!(
                    "CONSTRAINT {} UNIQUE ({})",
                    Ident::new(name, quoting),
                    render_column_list(columns, quoting)
                )
            }
            TableConstraint::ForeignKey {
                name,
                columns,
                referenced_table,
                referenced_columns,
                on_delete,
                on_update,
            } => {
                let mut out = String::new();
                if let Some(name) = name {
                    out.push_str(&format!("CONSTRAINT {} ", Ident::new(name, quoting)));
                }
                out.push_str(&format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    render_column_list(columns, quoting),
                    Ident::new(referenced_table, quoting),
                    render_column_list(referenced_columns, quoting)
                ));
                if let Some(action) = on_delete {
                    out.push_str(" ON DELETE ");
                    out.push_str(action);
                }
                if let Some(action) = on_update {
                    out.push_str(" ON UPDATE ");
                    out.push_str(action);
                }
                out
            }
            TableConstraint::Check { name, expression } => {
                let mut out = String::new();
                if let Some(name) = name {
                    out.push_str(&format!("CONSTRAINT {} ", Ident::new(name, quoting)));
                }
                out.push_str("CHECK (");
                out.push_str(expression);
                out.push(')');
                out
            }
        }
    }
}

fn render_column_list(columns: &[String], quoting: Quoting) -> String {
    columns
        .iter()
        .map(|c| Ident::new(c, quoting).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pretty-printing mode for `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndentMode {
    /// Everything on one line: `CREATE TABLE t (a int, b int)`.
    SingleLine,
    /// One column/constraint per line, each prefixed with `indent`, with
    /// the closing paren alone on its own line.
    Indented(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<ColumnSpec>,
    pub constraints: Vec<TableConstraint>,
    pub if_not_exists: bool,
    pub quoting: Quoting,
    pub indent: IndentMode,
}

impl CreateTable {
    pub fn new(table: impl Into<String>, quoting: Quoting) -> Self {
        CreateTable {
            schema: None,
            table: table.into(),
            columns: Vec::new(),
            constraints: Vec::new(),
            if_not_exists: false,
            quoting,
            indent: IndentMode::SingleLine,
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    pub fn constraint(mut self, constraint: TableConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    pub fn indent(mut self, mode: IndentMode) -> Self {
        self.indent = mode;
        self
    }
}

impl fmt::Display for CreateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = qualified(self.schema.as_deref(), &self.table, self.quoting);
        write!(f, "CREATE TABLE ")?;
        if self.if_not_exists {
            write!(f, "IF NOT EXISTS ")?;
        }
        write!(f, "{name} (")?;

        let mut entries: Vec<String> = self.columns.iter().map(|c| c.render(self.quoting)).collect();
        entries.extend(self.constraints.iter().map(|c| c.render(self.quoting)));

        match &self.indent {
            IndentMode::SingleLine => {
                write!(f, "{}", entries.join(", "))?;
                write!(f, ")")
            }
            IndentMode::Indented(indent) => {
                writeln!(f)?;
                for (i, entry) in entries.iter().enumerate() {
                    let comma = if i + 1 < entries.len() { "," } else { "" };
                    writeln!(f, "{indent}{entry}{comma}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_create_table_renders_inline_primary_key() {
        let stmt = CreateTable::new("users", Quoting::Backtick)
            .column(ColumnSpec::new("id", "bigint", false))
            .constraint(TableConstraint::PrimaryKey(vec!["id".into()]));
        assert_eq!(
            stmt.to_string(),
            "CREATE TABLE `users` (`id` bigint NOT NULL, PRIMARY KEY (`id`))"
        );
    }

    #[test]
    fn indented_create_table_breaks_one_column_per_line() {
        let stmt = CreateTable::new("t1", Quoting::Backtick)
            .column(ColumnSpec::new("a", "int", true))
            .column(ColumnSpec::new("b", "int", true))
            .constraint(TableConstraint::PrimaryKey(vec!["id".into()]))
            .indent(IndentMode::Indented("  ".into()));

        let expected = "CREATE TABLE `t1` (\n  `a` int,\n  `b` int,\n  PRIMARY KEY (`id`)\n)";
        assert_eq!(stmt.to_string(), expected);
    }

    #[test]
    fn qualified_schema_renders_dotted_name() {
        let stmt = CreateTable::new("t1", Quoting::DoubleQuote)
            .schema("public")
            .column(ColumnSpec::new("a", "integer", true));
        assert_eq!(stmt.to_string(), "CREATE TABLE \"public\".\"t1\" (\"a\" integer)");
    }

    #[test]
    fn inline_check_constraint_renders_with_and_without_name() {
        let stmt = CreateTable::new("t", Quoting::DoubleQuote)
            .column(ColumnSpec::new("age", "integer", true))
            .constraint(TableConstraint::Check {
                name: Some("age_nonneg".into()),
                expression: "age >= 0".into(),
            })
            .constraint(TableConstraint::Check { name: None, expression: "age < 150".into() });
        assert_eq!(
            stmt.to_string(),
            "CREATE TABLE \"t\" (\"age\" integer, CONSTRAINT \"age_nonneg\" CHECK (age >= 0), CHECK (age < 150))"
        );
    }

    #[test]
    fn column_with_default_and_trailing_clause() {
        let col = ColumnSpec::new("created_at", "timestamp", false)
            .with_default("now()")
            .with_trailing("GENERATED ALWAYS AS ROW START");
        let stmt = CreateTable::new("t", Quoting::DoubleQuote).column(col);
        assert_eq!(
            stmt.to_string(),
            "CREATE TABLE \"t\" (\"created_at\" timestamp NOT NULL DEFAULT now() GENERATED ALWAYS AS ROW START)"
        );
    }
}
