use crate::ident::{qualified, Ident, Quoting};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSchema {
    pub name: String,
    pub if_not_exists: bool,
    pub quoting: Quoting,
}

impl fmt::Display for CreateSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE SCHEMA ")?;
        if self.if_not_exists {
            write!(f, "IF NOT EXISTS ")?;
        }
        write!(f, "{}", Ident::new(&self.name, self.quoting))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropSchema {
    pub name: String,
    pub cascade: bool,
    pub quoting: Quoting,
}

impl fmt::Display for DropSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DROP SCHEMA {}", Ident::new(&self.name, self.quoting))?;
        if self.cascade {
            write!(f, " CASCADE")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTable {
    pub schema: Option<String>,
    pub table: String,
    pub cascade: bool,
    pub quoting: Quoting,
}

impl fmt::Display for DropTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DROP TABLE {}",
            qualified(self.schema.as_deref(), &self.table, self.quoting)
        )?;
        if self.cascade {
            write!(f, " CASCADE")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameTable {
    pub schema: Option<String>,
    pub from: String,
    pub to: String,
    pub quoting: Quoting,
}

impl fmt::Display for RenameTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ALTER TABLE {} RENAME TO {}",
            qualified(self.schema.as_deref(), &self.from, self.quoting),
            Ident::new(&self.to, self.quoting)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndex {
    pub schema: Option<String>,
    pub name: String,
    pub table: String,
    pub unique: bool,
    pub columns: Vec<String>,
    pub using: Option<String>,
    pub predicate: Option<String>,
    pub concurrently: bool,
    pub quoting: Quoting,
}

impl fmt::Display for CreateIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE ")?;
        if self.unique {
            write!(f, "UNIQUE ")?;
        }
        write!(f, "INDEX ")?;
        if self.concurrently {
            write!(f, "CONCURRENTLY ")?;
        }
        write!(
            f,
            "{} ON {}",
            Ident::new(&self.name, self.quoting),
            qualified(self.schema.as_deref(), &self.table, self.quoting)
        )?;
        if let Some(using) = &self.using {
            write!(f, " USING {using}")?;
        }
        let cols = self
            .columns
            .iter()
            .map(|c| Ident::new(c, self.quoting).to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, " ({cols})")?;
        if let Some(predicate) = &self.predicate {
            write!(f, " WHERE {predicate}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropIndex {
    pub schema: Option<String>,
    pub name: String,
    /// MySQL drops indexes with `DROP INDEX name ON table`.
    pub table: Option<String>,
    pub concurrently: bool,
    pub quoting: Quoting,
}

impl fmt::Display for DropIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DROP INDEX ")?;
        if self.concurrently {
            write!(f, "CONCURRENTLY ")?;
        }
        write!(f, "{}", qualified(self.schema.as_deref(), &self.name, self.quoting))?;
        if let Some(table) = &self.table {
            write!(f, " ON {}", Ident::new(table, self.quoting))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSequence {
    pub schema: Option<String>,
    pub name: String,
    pub if_not_exists: bool,
    pub owned_by: Option<(String, String)>,
    pub quoting: Quoting,
}

impl fmt::Display for CreateSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE SEQUENCE ")?;
        if self.if_not_exists {
            write!(f, "IF NOT EXISTS ")?;
        }
        write!(f, "{}", qualified(self.schema.as_deref(), &self.name, self.quoting))?;
        if let Some((table, column)) = &self.owned_by {
            write!(
                f,
                " OWNED BY {}.{}",
                Ident::new(table, self.quoting),
                Ident::new(column, self.quoting)
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropSequence {
    pub schema: Option<String>,
    pub name: String,
    pub if_exists: bool,
    pub quoting: Quoting,
}

impl fmt::Display for DropSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DROP SEQUENCE ")?;
        if self.if_exists {
            write!(f, "IF EXISTS ")?;
        }
        write!(f, "{}", qualified(self.schema.as_deref(), &self.name, self.quoting))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterSequence {
    pub schema: Option<String>,
    pub name: String,
    pub set_default_on: Option<(String, String)>,
    pub quoting: Quoting,
}

impl fmt::Display for AlterSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((table, column)) = &self.set_default_on {
            write!(
                f,
                "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT nextval('{}')",
                Ident::new(table, self.quoting),
                Ident::new(column, self.quoting),
                qualified(self.schema.as_deref(), &self.name, self.quoting)
            )
        } else {
            write!(f, "ALTER SEQUENCE {}", qualified(self.schema.as_deref(), &self.name, self.quoting))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateEnum {
    pub schema: Option<String>,
    pub name: String,
    pub values: Vec<String>,
    pub quoting: Quoting,
}

impl fmt::Display for CreateEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self
            .values
            .iter()
            .map(|v| format!("'{}'", v.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "CREATE TYPE {} AS ENUM ({values})",
            qualified(self.schema.as_deref(), &self.name, self.quoting)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterEnumAddValue {
    pub schema: Option<String>,
    pub name: String,
    pub value: String,
    pub quoting: Quoting,
}

impl fmt::Display for AlterEnumAddValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ALTER TYPE {} ADD VALUE '{}'",
            qualified(self.schema.as_deref(), &self.name, self.quoting),
            self.value.replace('\'', "''")
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentTarget {
    Table,
    Column,
    Index,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub target: CommentTarget,
    pub schema: Option<String>,
    pub table: String,
    pub column: Option<String>,
    pub text: Option<String>,
    pub quoting: Quoting,
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let on = match self.target {
            CommentTarget::Table => qualified(self.schema.as_deref(), &self.table, self.quoting),
            CommentTarget::Index => qualified(self.schema.as_deref(), &self.table, self.quoting),
            CommentTarget::Column => format!(
                "{}.{}",
                qualified(self.schema.as_deref(), &self.table, self.quoting),
                Ident::new(self.column.as_deref().unwrap_or_default(), self.quoting)
            ),
        };
        let target_kw = match self.target {
            CommentTarget::Table => "TABLE",
            CommentTarget::Column => "COLUMN",
            CommentTarget::Index => "INDEX",
        };
        let text = self
            .text
            .as_deref()
            .map(|t| format!("'{}'", t.replace('\'', "''")))
            .unwrap_or_else(|| "NULL".to_string());
        write!(f, "COMMENT ON {target_kw} {on} IS {text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_schema_with_if_not_exists() {
        let stmt = CreateSchema {
            name: "analytics".into(),
            if_not_exists: true,
            quoting: Quoting::DoubleQuote,
        };
        assert_eq!(stmt.to_string(), "CREATE SCHEMA IF NOT EXISTS \"analytics\"");
    }

    #[test]
    fn drop_sequence_if_exists_renders_qualified_name() {
        let stmt = DropSequence {
            schema: Some("public".into()),
            name: "posts_c1_seq".into(),
            if_exists: true,
            quoting: Quoting::DoubleQuote,
        };
        assert_eq!(
            stmt.to_string(),
            "DROP SEQUENCE IF EXISTS \"public\".\"posts_c1_seq\""
        );
    }

    #[test]
    fn alter_type_add_value_renders_quoted_literal() {
        let stmt = AlterEnumAddValue {
            schema: Some("public".into()),
            name: "state".into(),
            value: "unknown".into(),
            quoting: Quoting::DoubleQuote,
        };
        assert_eq!(
            stmt.to_string(),
            "ALTER TYPE \"public\".\"state\" ADD VALUE 'unknown'"
        );
    }

    #[test]
    fn comment_on_column_escapes_quotes() {
        let stmt = Comment {
            target: CommentTarget::Column,
            schema: None,
            table: "users".into(),
            column: Some("bio".into()),
            text: Some("user's bio".into()),
            quoting: Quoting::DoubleQuote,
        };
        assert_eq!(
            stmt.to_string(),
            "COMMENT ON COLUMN \"users\".\"bio\" IS 'user''s bio'"
        );
    }
}
