//! A single migration file: `{Name, Version, Desc, Bytes, Stmts()}`,
//! plus the `-- atlas:<name> <args?>` directive block a file may
//! open with.

/// One recognized directive. Unknown `-- atlas:<name>` lines are kept
/// out of this closed set deliberately — the format enumerates exactly these
/// five; anything else is left as an ordinary leading comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    SumIgnore,
    Delimiter(String),
    Baseline,
    Checkpoint(Option<String>),
    NoLint(Vec<String>),
}

impl Directive {
    fn parse(line: &str) -> Option<Directive> {
        let rest = line.trim().strip_prefix("-- atlas:")?;
        let (name, args) = match rest.split_once(' ') {
            Some((n, a)) => (n, a.trim()),
            None => (rest, ""),
        };
        match name {
            "sum" if args == "ignore" => Some(Directive::SumIgnore),
            "delimiter" => Some(Directive::Delimiter(unescape_delimiter(args))),
            "baseline" => Some(Directive::Baseline),
            "checkpoint" => {
                let tag = if args.is_empty() { None } else { Some(args.to_string()) };
                Some(Directive::Checkpoint(tag))
            }
            "nolint" => {
                let codes = args.split_whitespace().map(str::to_string).collect();
                Some(Directive::NoLint(codes))
            }
            _ => None,
        }
    }
}

fn unescape_delimiter(raw: &str) -> String {
    raw.replace("\\n", "\n").replace("\\t", "\t")
}

/// One statement extracted from a file's body, with the `-- <description>`
/// comment immediately preceding it (if any) carried along.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub text: String,
    pub comment: Option<String>,
}

/// `{Name, Version, Desc, Bytes, Stmts()}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl MigrationFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        MigrationFile {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// By convention `<version>_<desc>.sql`; version is the prefix before
    /// the first `_`, which is either a zero-padded integer or a
    /// `YYYYMMDDHHMMSS` timestamp.
    pub fn version(&self) -> &str {
        let stem = self.name.strip_suffix(".sql").unwrap_or(&self.name);
        stem.split_once('_').map(|(v, _)| v).unwrap_or(stem)
    }

    pub fn desc(&self) -> &str {
        let stem = self.name.strip_suffix(".sql").unwrap_or(&self.name);
        stem.split_once('_').map(|(_, d)| d).unwrap_or("")
    }

    /// Splits the file into its leading directive-comment block and the
    /// statement body following the blank line that ends it.
    fn split_header(&self) -> (String, String) {
        let contents = self.contents();
        match contents.split_once("\n\n") {
            Some((header, body)) if header.lines().all(|l| l.trim().is_empty() || l.trim_start().starts_with("--")) => {
                (header.to_string(), body.to_string())
            }
            _ => (String::new(), contents),
        }
    }

    pub fn directives(&self) -> Vec<Directive> {
        let (header, _) = self.split_header();
        header.lines().filter_map(Directive::parse).collect()
    }

    pub fn is_sum_ignored(&self) -> bool {
        self.directives().iter().any(|d| *d == Directive::SumIgnore)
    }

    pub fn is_baseline(&self) -> bool {
        self.directives().iter().any(|d| *d == Directive::Baseline)
    }

    pub fn checkpoint_tag(&self) -> Option<Option<String>> {
        self.directives().into_iter().find_map(|d| match d {
            Directive::Checkpoint(tag) => Some(tag),
            _ => None,
        })
    }

    pub fn is_checkpoint(&self) -> bool {
        self.checkpoint_tag().is_some()
    }

    pub fn nolint_suppressions(&self) -> Vec<String> {
        self.directives()
            .into_iter()
            .find_map(|d| match d {
                Directive::NoLint(codes) => Some(codes),
                _ => None,
            })
            .unwrap_or_default()
    }

    fn delimiter(&self) -> String {
        self.directives()
            .into_iter()
            .find_map(|d| match d {
                Directive::Delimiter(delim) => Some(delim),
                _ => None,
            })
            .unwrap_or_else(|| ";".to_string())
    }

    /// Statements in source order, split by the file's configured
    /// delimiter (default `;`), each carrying its preceding `--` comment.
    pub fn stmts(&self) -> Vec<Statement> {
        let (_, body) = self.split_header();
        let delimiter = self.delimiter();
        if delimiter.is_empty() {
            return Vec::new();
        }

        let mut statements = Vec::new();
        let mut pending_comment: Option<String> = None;

        for chunk in body.split(delimiter.as_str()) {
            let mut comment_lines = Vec::new();
            let mut stmt_lines = Vec::new();
            for line in chunk.lines() {
                let trimmed = line.trim();
                if stmt_lines.is_empty() && trimmed.starts_with("--") {
                    comment_lines.push(trimmed.trim_start_matches('-').trim().to_string());
                } else if !trimmed.is_empty() {
                    stmt_lines.push(line);
                }
            }
            let text = stmt_lines.join("\n").trim().to_string();
            if text.is_empty() {
                continue;
            }
            let comment = pending_comment.take().or_else(|| {
                if comment_lines.is_empty() {
                    None
                } else {
                    Some(comment_lines.join(" "))
                }
            });
            statements.push(Statement { text, comment });
        }

        statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_and_desc_split_on_first_underscore() {
        let file = MigrationFile::new("20240102150405_add_users_table.sql", b"".to_vec());
        assert_eq!(file.version(), "20240102150405");
        assert_eq!(file.desc(), "add_users_table");
    }

    #[test]
    fn parses_sum_ignore_directive() {
        let file = MigrationFile::new("1_x.sql", b"-- atlas:sum ignore\n\nSELECT 1;".to_vec());
        assert!(file.is_sum_ignored());
    }

    #[test]
    fn parses_checkpoint_directive_with_tag() {
        let file = MigrationFile::new("1_x.sql", b"-- atlas:checkpoint v2\n\nSELECT 1;".to_vec());
        assert_eq!(file.checkpoint_tag(), Some(Some("v2".to_string())));
    }

    #[test]
    fn parses_checkpoint_directive_without_tag() {
        let file = MigrationFile::new("1_x.sql", b"-- atlas:checkpoint\n\nSELECT 1;".to_vec());
        assert_eq!(file.checkpoint_tag(), Some(None));
    }

    #[test]
    fn statements_split_on_default_semicolon_delimiter() {
        let file = MigrationFile::new(
            "1_x.sql",
            b"CREATE TABLE a (id int);\nCREATE TABLE b (id int);".to_vec(),
        );
        let stmts = file.stmts();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].text, "CREATE TABLE a (id int)");
        assert_eq!(stmts[1].text, "CREATE TABLE b (id int)");
    }

    #[test]
    fn statement_carries_preceding_comment() {
        let file = MigrationFile::new(
            "1_x.sql",
            b"-- create users table\nCREATE TABLE users (id int);".to_vec(),
        );
        let stmts = file.stmts();
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].comment.as_deref(), Some("create users table"));
    }

    #[test]
    fn custom_delimiter_directive_changes_split_points() {
        let file = MigrationFile::new(
            "1_x.sql",
            b"-- atlas:delimiter \\n\\n\n\nCREATE TABLE a (id int);\n\nCREATE TABLE b (id int);".to_vec(),
        );
        let stmts = file.stmts();
        assert_eq!(stmts.len(), 2);
    }
}
