//! A minimal pair-wise name/content template for the Migration
//! Directory's `TemplateFormatter`: "Default: one file named
//! `<now|version>_<name>.sql` whose body is
//! `{{range .Changes}}-- <Comment capitalized>\n<Cmd>;\n{{end}}`."
//!
//! This is deliberately not a general templating engine — the format
//! string vocabulary is the closed set `{{version}}`, `{{name}}` (for
//! filenames) and `{{cmd}}`/`{{comment}}` (for the per-change body,
//! substituted once per entry by [`PlanTemplate::render_body`]).

/// One statement to format into a migration file body.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    pub version: String,
    pub name: String,
    pub changes: Vec<ChangeContext>,
}

#[derive(Debug, Clone)]
pub struct ChangeContext {
    pub cmd: String,
    pub comment: Option<String>,
}

/// A name template and a body template, e.g. `<version>_<name>.sql` and
/// the default per-change body shown above.
#[derive(Debug, Clone)]
pub struct PlanTemplate {
    pub name_template: String,
}

impl Default for PlanTemplate {
    fn default() -> Self {
        PlanTemplate {
            name_template: "{{version}}_{{name}}.sql".to_string(),
        }
    }
}

impl PlanTemplate {
    pub fn new(name_template: impl Into<String>) -> Self {
        PlanTemplate {
            name_template: name_template.into(),
        }
    }

    pub fn render_filename(&self, ctx: &TemplateContext) -> String {
        self.name_template
            .replace("{{version}}", &ctx.version)
            .replace("{{name}}", &ctx.name)
    }

    /// The default body: one `-- <comment, capitalized>` line (when a
    /// comment is present) followed by `<cmd>;`, per change, in order.
    pub fn render_body(&self, ctx: &TemplateContext) -> String {
        let mut out = String::new();
        for change in &ctx.changes {
            if let Some(comment) = &change.comment {
                out.push_str("-- ");
                out.push_str(&capitalize(comment));
                out.push('\n');
            }
            out.push_str(&change.cmd);
            out.push_str(";\n");
        }
        out
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filename_template_interpolates_version_and_name() {
        let template = PlanTemplate::default();
        let ctx = TemplateContext {
            version: "20240102150405".into(),
            name: "add_users".into(),
            changes: vec![],
        };
        assert_eq!(template.render_filename(&ctx), "20240102150405_add_users.sql");
    }

    #[test]
    fn body_renders_capitalized_comment_then_statement() {
        let template = PlanTemplate::default();
        let ctx = TemplateContext {
            version: "1".into(),
            name: "init".into(),
            changes: vec![ChangeContext {
                cmd: "CREATE TABLE users (id int)".into(),
                comment: Some("create \"users\" table".into()),
            }],
        };
        assert_eq!(
            template.render_body(&ctx),
            "-- Create \"users\" table\nCREATE TABLE users (id int);\n"
        );
    }

    #[test]
    fn body_skips_comment_line_when_absent() {
        let template = PlanTemplate::default();
        let ctx = TemplateContext {
            version: "1".into(),
            name: "init".into(),
            changes: vec![ChangeContext {
                cmd: "DROP TABLE users".into(),
                comment: None,
            }],
        };
        assert_eq!(template.render_body(&ctx), "DROP TABLE users;\n");
    }
}
