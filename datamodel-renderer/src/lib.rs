//! An indent-aware text renderer: a small `Doc` tree that the planner's
//! pretty-printed `CREATE TABLE` output (`Indent` option) and the
//! migration directory's `TemplateFormatter` both build on, so
//! indentation rules live in one place instead of being hand-rolled per
//! caller.

mod doc;
mod template;
mod writer;

pub use doc::Doc;
pub use template::{ChangeContext, PlanTemplate, TemplateContext};
pub use writer::IndentedWriter;
