use crate::writer::IndentedWriter;

/// A small document tree: enough structure to describe "these entries,
/// one per line, at this indent" without every caller re-deriving comma
/// placement and trailing-paren rules by hand. The Planner's
/// `CREATE TABLE` pretty-printer and the
/// Migration Directory's default file template are both just a
/// `Doc::Block` underneath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Doc {
    Text(String),
    /// Verbatim text with no trailing separator, never re-indented.
    Raw(String),
    /// A sequence of docs joined on one line by `sep`.
    Joined(Vec<Doc>, String),
    /// A header, an indented, one-per-line block of entries, and a
    /// closing line — the `CREATE TABLE ( ... )` shape.
    Block {
        header: String,
        indent: String,
        entries: Vec<Doc>,
        footer: String,
    },
}

impl Doc {
    pub fn text(s: impl Into<String>) -> Self {
        Doc::Text(s.into())
    }

    pub fn joined(docs: Vec<Doc>, sep: impl Into<String>) -> Self {
        Doc::Joined(docs, sep.into())
    }

    pub fn block(header: impl Into<String>, indent: impl Into<String>, entries: Vec<Doc>, footer: impl Into<String>) -> Self {
        Doc::Block {
            header: header.into(),
            indent: indent.into(),
            entries,
            footer: footer.into(),
        }
    }

    /// Renders on a single line, ignoring any block indentation — used
    /// when the Planner's `Indent` option is unset.
    pub fn render_flat(&self) -> String {
        match self {
            Doc::Text(s) | Doc::Raw(s) => s.clone(),
            Doc::Joined(docs, sep) => docs.iter().map(Doc::render_flat).collect::<Vec<_>>().join(sep),
            Doc::Block { header, entries, footer, .. } => {
                let body = entries.iter().map(Doc::render_flat).collect::<Vec<_>>().join(", ");
                format!("{header}{body}{footer}")
            }
        }
    }

    /// Renders multi-line, one entry per line, indented by `self`'s own
    /// `indent` string at each `Block` nesting level.
    pub fn render_indented(&self) -> String {
        let mut writer = IndentedWriter::new();
        self.write(&mut writer, true);
        writer.finish()
    }

    fn write(&self, writer: &mut IndentedWriter, is_top_level: bool) {
        match self {
            Doc::Text(s) | Doc::Raw(s) => writer.push_str(s),
            Doc::Joined(docs, sep) => {
                for (i, doc) in docs.iter().enumerate() {
                    if i > 0 {
                        writer.push_str(sep);
                    }
                    doc.write(writer, false);
                }
            }
            Doc::Block { header, indent, entries, footer } => {
                writer.push_str(header);
                if entries.is_empty() {
                    writer.push_str(footer);
                    return;
                }
                writer.newline();
                writer.indented(indent.clone(), |writer| {
                    for (i, entry) in entries.iter().enumerate() {
                        entry.write(writer, false);
                        if i + 1 < entries.len() {
                            writer.push_str(",");
                        }
                        writer.newline();
                    }
                });
                writer.push_str(footer);
                let _ = is_top_level;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_render_joins_with_comma_space() {
        let doc = Doc::block("CREATE TABLE t (", "  ", vec![Doc::text("a int"), Doc::text("b int")], ")");
        assert_eq!(doc.render_flat(), "CREATE TABLE t (a int, b int)");
    }

    #[test]
    fn indented_render_breaks_one_entry_per_line() {
        let doc = Doc::block(
            "CREATE TABLE `t1` (",
            "  ",
            vec![Doc::text("`a` int"), Doc::text("`b` int"), Doc::text("PRIMARY KEY (`id`)")],
            ")",
        );
        assert_eq!(
            doc.render_indented(),
            "CREATE TABLE `t1` (\n  `a` int,\n  `b` int,\n  PRIMARY KEY (`id`)\n)"
        );
    }

    #[test]
    fn empty_block_renders_header_and_footer_only() {
        let doc = Doc::block("CREATE TABLE t (", "  ", vec![], ")");
        assert_eq!(doc.render_indented(), "CREATE TABLE t ()");
    }
}
