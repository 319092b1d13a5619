//! A zero-dependency, dialect-gated DDL AST with `Display` renderers. This
//! is the Planner's lowering target: the differ emits a change
//! list, the per-dialect planner in `sql-schema-connector` turns each
//! change into one of these statements, and `Display::to_string()` is the
//! final SQL text.
//!
//! Every statement type is dialect-agnostic in shape; quoting and a
//! handful of dialect-only clauses are parameterized by [`Quoting`] and
//! the per-statement builder methods, gating MySQL/Postgres/SQLite-only
//! pieces behind Cargo features.

mod alter_table;
mod create_table;
mod ident;
mod misc;

pub use alter_table::{AlterTable, AlterTableClause};
pub use create_table::{ColumnSpec, CreateTable, IndentMode, TableConstraint};
pub use ident::{Ident, Quoting};
pub use misc::{
    AlterEnumAddValue, AlterSequence, Comment, CommentTarget, CreateEnum, CreateIndex, CreateSchema,
    CreateSequence, DropIndex, DropSchema, DropSequence, DropTable, RenameTable,
};
