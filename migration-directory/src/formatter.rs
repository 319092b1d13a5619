//! The Planner formatter: turns a [`Plan`] into one or more
//! `{filename, content}` pairs. The default template names a file
//! `<version>_<name>.sql` and renders one `-- <comment>` / `<cmd>;` pair
//! per change. `version` is supplied by the caller rather than read from
//! the clock here — matching the "no env-var reading inside the
//! engine crates" policy, generalized to "no wall-clock reads either";
//! the external CLI layer owns picking a version stamp.

use crate::file::MigrationFile;
use datamodel_renderer::{ChangeContext, PlanTemplate, TemplateContext};
use schema_connector::Plan;

#[derive(Debug, Clone, Default)]
pub struct TemplateFormatter {
    template: PlanTemplate,
}

impl TemplateFormatter {
    pub fn new() -> Self {
        TemplateFormatter::default()
    }

    pub fn with_name_template(name_template: impl Into<String>) -> Self {
        TemplateFormatter {
            template: PlanTemplate::new(name_template),
        }
    }

    pub fn format(&self, version: &str, plan: &Plan) -> MigrationFile {
        let ctx = TemplateContext {
            version: version.to_string(),
            name: plan.name.clone(),
            changes: plan
                .items
                .iter()
                .map(|item| ChangeContext {
                    cmd: item.cmd.clone(),
                    comment: item.comment.clone(),
                })
                .collect(),
        };

        let filename = self.template.render_filename(&ctx);
        let body = self.template.render_body(&ctx);
        MigrationFile::new(filename, body.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_connector::PlanItem;

    #[test]
    fn formats_single_file_from_create_table_plan() {
        let plan = Plan::new(
            "create_users",
            vec![PlanItem::new("CREATE TABLE `users` (`id` bigint NOT NULL, PRIMARY KEY (`id`))")
                .with_reverse("DROP TABLE `users`")
                .with_comment("create \"users\" table")],
        );
        let formatter = TemplateFormatter::new();
        let file = formatter.format("20240102150405", &plan);

        assert_eq!(file.name, "20240102150405_create_users.sql");
        assert_eq!(
            file.contents(),
            "-- Create \"users\" table\nCREATE TABLE `users` (`id` bigint NOT NULL, PRIMARY KEY (`id`));\n"
        );
    }
}
