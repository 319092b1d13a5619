use std::fmt;

/// The three quoting conventions the engine needs to render (MySQL
/// backticks, Postgres/SQLite double quotes). Kept as a value rather than
/// a generic type parameter so `Box<dyn SqlFlavour>` (sql-schema-connector)
/// can carry it at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    Backtick,
    DoubleQuote,
}

/// A single identifier (table, column, index, …), quoted on `Display`.
/// Embedded quote characters are doubled, matching both MySQL's
/// backtick-escaping and the SQL-standard double-quote-escaping rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub quoting: Quoting,
}

impl Ident {
    pub fn new(name: impl Into<String>, quoting: Quoting) -> Self {
        Ident {
            name: name.into(),
            quoting,
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close, escape) = match self.quoting {
            Quoting::Backtick => ('`', '`', "``"),
            Quoting::DoubleQuote => ('"', '"', "\"\""),
        };
        write!(f, "{open}")?;
        for ch in self.name.chars() {
            if ch == open || ch == close {
                f.write_str(escape)?;
            } else {
                write!(f, "{ch}")?;
            }
        }
        write!(f, "{close}")
    }
}

/// Renders a dotted, quoted path (`"schema"."table"`), skipping the
/// qualifier when `schema` is `None` — used for the Planner's
/// `SchemaQualifier` option.
pub fn qualified(schema: Option<&str>, name: &str, quoting: Quoting) -> String {
    match schema {
        Some(schema) if !schema.is_empty() => {
            format!("{}.{}", Ident::new(schema, quoting), Ident::new(name, quoting))
        }
        _ => Ident::new(name, quoting).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backtick_identifiers_render_correctly() {
        assert_eq!(Ident::new("users", Quoting::Backtick).to_string(), "`users`");
    }

    #[test]
    fn double_quote_identifiers_render_correctly() {
        assert_eq!(
            Ident::new("users", Quoting::DoubleQuote).to_string(),
            "\"users\""
        );
    }

    #[test]
    fn embedded_quotes_are_escaped() {
        assert_eq!(
            Ident::new("a`b", Quoting::Backtick).to_string(),
            "`a``b`"
        );
    }

    #[test]
    fn qualified_name_without_schema_is_bare() {
        assert_eq!(qualified(None, "users", Quoting::DoubleQuote), "\"users\"");
    }

    #[test]
    fn qualified_name_with_schema_joins_with_dot() {
        assert_eq!(
            qualified(Some("public"), "users", Quoting::DoubleQuote),
            "\"public\".\"users\""
        );
    }
}
