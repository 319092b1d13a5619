//! The Planner (component D, `sql_renderer`): lowers an ordered [`Change`]
//! list from the differ into [`sql_ddl`] statements wrapped up as a
//! [`schema_connector::Plan`]. One [`PlanItem`] per physical statement;
//! the overall forward/reverse sequencing `Plan`'s `Reversible`
//! property needs falls out of `Plan::reverse_statements`'s own LIFO walk
//! over items, so this module never has to hand-assemble multi-statement
//! reverses itself — each side effect (a synthesized `CREATE SEQUENCE`, a
//! secondary index, …) is its own item with its own one-statement reverse.

use crate::differ::{Change, ColumnChangeKind, ForeignKeyChangeKind};
use crate::flavour::SqlFlavour;
use schema_connector::{ConnectorError, ConnectorResult, Plan, PlanItem};
use sql_ddl::{
    AlterEnumAddValue, AlterSequence, AlterTable, AlterTableClause, ColumnSpec, Comment, CommentTarget, CreateEnum,
    CreateIndex, CreateSchema, CreateSequence, CreateTable, DropIndex, DropSchema, DropSequence, DropTable,
    IndentMode, RenameTable, TableConstraint,
};
use sql_schema_describer::{
    ColumnAttr, ColumnWalker, DefaultValue, ForeignKeyAction, GeneratedStorage, SqlSchema, SqlSchemaExt, TableWalker,
};

/// `AlterTable::schema` only takes a bare schema name; the planner's
/// options may resolve to `None` (stripped qualifier), so every call
/// site goes through this instead of repeating the `if let` everywhere.
trait AlterTableSchemaOpt {
    fn schema_opt(self, schema: Option<String>) -> Self;
}

impl AlterTableSchemaOpt for AlterTable {
    fn schema_opt(self, schema: Option<String>) -> Self {
        match schema {
            Some(s) => self.schema(s),
            None => self,
        }
    }
}

fn qualified_name(schema: Option<&str>, name: &str, quoting: sql_ddl::Quoting) -> String {
    match schema {
        Some(s) if !s.is_empty() => format!(
            "{}.{}",
            sql_ddl::Ident::new(s, quoting),
            sql_ddl::Ident::new(name, quoting)
        ),
        _ => sql_ddl::Ident::new(name, quoting).to_string(),
    }
}

/// The planner's `SchemaQualifier` option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaQualifier {
    /// nil: use each entity's own schema.
    PerEntity,
    /// empty pointer: strip the qualifier entirely (single-schema mode).
    Stripped,
    /// non-empty pointer: force this qualifier on every statement.
    Forced(String),
}

/// The planner's `Mode` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanMode {
    /// Planning immediately before execution: a `DropTable` on a table
    /// known to be empty can be marked reversible.
    PlanApply,
    /// Planning into a migration file for later application: a
    /// `DropTable`'s reverse can't be trusted, since the table may hold
    /// data by the time the file actually runs.
    PlanFile,
}

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub schema_qualifier: SchemaQualifier,
    pub indent: Option<String>,
    pub mode: PlanMode,
}

impl Default for PlanOptions {
    fn default() -> Self {
        PlanOptions {
            schema_qualifier: SchemaQualifier::PerEntity,
            indent: None,
            mode: PlanMode::PlanApply,
        }
    }
}

impl PlanOptions {
    fn resolve_schema(&self, entity_schema: &str) -> Option<String> {
        match &self.schema_qualifier {
            SchemaQualifier::Stripped => None,
            SchemaQualifier::Forced(name) => Some(name.clone()),
            SchemaQualifier::PerEntity => {
                if entity_schema.is_empty() {
                    None
                } else {
                    Some(entity_schema.to_string())
                }
            }
        }
    }

    fn indent_mode(&self) -> IndentMode {
        match &self.indent {
            Some(indent) => IndentMode::Indented(indent.clone()),
            None => IndentMode::SingleLine,
        }
    }
}

fn find_table<'a>(schema: &'a SqlSchema, schema_name: &str, table_name: &str) -> Option<TableWalker<'a>> {
    schema.table_walkers().find(|t| t.schema_name() == schema_name && t.name() == table_name)
}

fn find_column<'a>(schema: &'a SqlSchema, schema_name: &str, table_name: &str, column_name: &str) -> Option<ColumnWalker<'a>> {
    find_table(schema, schema_name, table_name)?.column(column_name)
}

fn render_action(action: ForeignKeyAction) -> Option<String> {
    let s = match action {
        ForeignKeyAction::NoAction => return None,
        ForeignKeyAction::Restrict => "RESTRICT",
        ForeignKeyAction::SetNull => "SET NULL",
        ForeignKeyAction::SetDefault => "SET DEFAULT",
        ForeignKeyAction::Cascade => "CASCADE",
    };
    Some(s.to_string())
}

fn render_default(default: &DefaultValue) -> String {
    match default {
        DefaultValue::Value(v) | DefaultValue::Expression(v) => v.clone(),
        DefaultValue::Now => "now()".to_string(),
        DefaultValue::Sequence(name) => format!("nextval('{name}')"),
    }
}

/// Builds the `sql_ddl::ColumnSpec` for a column, including the
/// MySQL-only inline trailing clauses (`AUTO_INCREMENT`, `COMMENT '...'`,
/// `ON UPDATE ...`) that dialect folds into the column definition rather
/// than emitting as a separate statement.
fn column_spec(flavour: &dyn SqlFlavour, col: ColumnWalker<'_>) -> ColumnSpec {
    let mut spec = ColumnSpec::new(col.name(), col.column_type().full_data_type.clone(), col.arity().is_nullable());
    if let Some(default) = col.default() {
        spec = spec.with_default(render_default(default));
    }
    if flavour.dialect() == schema_connector::Dialect::Mysql {
        for attr in &col.schema.columns[col.column_id().index()].attrs {
            match attr {
                ColumnAttr::AutoIncrement => spec = spec.with_trailing("AUTO_INCREMENT"),
                ColumnAttr::OnUpdate(expr) => spec = spec.with_trailing(format!("ON UPDATE {expr}")),
                ColumnAttr::Comment(text) => spec = spec.with_trailing(format!("COMMENT '{}'", text.replace('\'', "''"))),
                _ => {}
            }
        }
    }
    spec
}

/// Builds the inline `CREATE TABLE` (columns + primary key) and the
/// trailing statements (secondary indexes, comments) a fresh table needs.
/// Shared by `AddTable` lowering and by a `DropTable`'s best-effort
/// reverse (which only recreates the bare structure, not secondary
/// indexes or comments — a DropTable's reverse is already best-effort by
/// nature, since dropped data itself can never come back).
fn build_create_table(flavour: &dyn SqlFlavour, table: TableWalker<'_>, options: &PlanOptions) -> CreateTable {
    let mut stmt = CreateTable::new(table.name(), flavour.quoting()).indent(options.indent_mode());
    if let Some(schema) = options.resolve_schema(table.schema_name()) {
        stmt = stmt.schema(schema);
    }
    for column in table.columns() {
        stmt = stmt.column(column_spec(flavour, column));
    }
    if let Some(pk) = table.primary_key() {
        let cols: Vec<String> = pk.columns().map(|c| c.name().to_string()).collect();
        stmt = stmt.constraint(TableConstraint::PrimaryKey(cols));
    }
    if flavour.inlines_indexes_in_create_table() {
        for index in table.indexes() {
            if index.is_unique() {
                let cols: Vec<String> = index.columns().map(|c| c.name().to_string()).collect();
                stmt = stmt.constraint(TableConstraint::Unique {
                    name: index.name().to_string(),
                    columns: cols,
                });
            }
        }
    }
    for check in table.checks() {
        stmt = stmt.constraint(TableConstraint::Check {
            name: check.name().map(|s| s.to_string()),
            expression: check.expression().to_string(),
        });
    }
    stmt
}

/// A `COMMENT ON TABLE` plan item for dialects that expose one (PostgreSQL);
/// `None` when the table carries no comment or the dialect folds comments
/// inline into `CREATE TABLE` instead (MySQL).
fn table_comment_item(flavour: &dyn SqlFlavour, table: TableWalker<'_>, options: &PlanOptions) -> Option<PlanItem> {
    if !flavour.supports_comment_on() {
        return None;
    }
    let text = table.comment()?;
    let schema = options.resolve_schema(table.schema_name());
    let set = Comment {
        target: CommentTarget::Table,
        schema: schema.clone(),
        table: table.name().to_string(),
        column: None,
        text: Some(text.to_string()),
        quoting: flavour.quoting(),
    };
    let clear = Comment {
        target: CommentTarget::Table,
        schema,
        table: table.name().to_string(),
        column: None,
        text: None,
        quoting: flavour.quoting(),
    };
    Some(PlanItem::new(set.to_string()).with_reverse(clear.to_string()))
}

/// Non-inlined secondary indexes for a table just created, as standalone
/// `CREATE INDEX` plan items (reverse: `DROP INDEX`).
fn secondary_index_items(flavour: &dyn SqlFlavour, table: TableWalker<'_>, options: &PlanOptions) -> Vec<PlanItem> {
    let schema = options.resolve_schema(table.schema_name());
    table
        .indexes()
        .filter(|idx| !(flavour.inlines_indexes_in_create_table() && idx.is_unique()))
        .map(|idx| {
            let cols: Vec<String> = idx.columns().map(|c| c.name().to_string()).collect();
            let create = CreateIndex {
                schema: schema.clone(),
                name: idx.name().to_string(),
                table: table.name().to_string(),
                unique: idx.is_unique(),
                columns: cols,
                using: None,
                predicate: None,
                concurrently: false,
                quoting: flavour.quoting(),
            };
            let drop = DropIndex {
                schema: schema.clone(),
                name: idx.name().to_string(),
                table: if flavour.dialect() == schema_connector::Dialect::Mysql {
                    Some(table.name().to_string())
                } else {
                    None
                },
                concurrently: false,
                quoting: flavour.quoting(),
            };
            PlanItem::new(create.to_string()).with_reverse(drop.to_string())
        })
        .collect()
}

fn foreign_key_clause(
    constraint: Option<&str>,
    columns: Vec<String>,
    referenced_table: String,
    referenced_columns: Vec<String>,
    on_delete: ForeignKeyAction,
    on_update: ForeignKeyAction,
) -> AlterTableClause {
    AlterTableClause::AddForeignKey {
        name: constraint.map(|s| s.to_string()),
        columns,
        referenced_table,
        referenced_columns,
        on_delete: render_action(on_delete),
        on_update: render_action(on_update),
    }
}

/// Lowers an ordered change list into a dialect-specific [`Plan`].
/// `previous`/`next` are the two schema states the changes were diffed
/// from, consulted for the structural detail (column types, constraint
/// names, …) a bare `Change` doesn't carry.
#[tracing::instrument(skip_all)]
pub fn plan_changes(
    flavour: &dyn SqlFlavour,
    previous: &SqlSchema,
    next: &SqlSchema,
    changes: &[Change],
    name: impl Into<String>,
    options: &PlanOptions,
) -> ConnectorResult<Plan> {
    if options.schema_qualifier == SchemaQualifier::Stripped {
        let mut schema_names: Vec<&str> = changes.iter().map(|c| c.schema_name()).collect();
        schema_names.sort_unstable();
        schema_names.dedup();
        if schema_names.len() > 1 {
            return Err(ConnectorError::UnsupportedOperation(format!(
                "cannot strip the schema qualifier from a plan spanning more than one schema: {}",
                schema_names.join(", ")
            )));
        }
    }

    let mut items = Vec::new();
    let mut i = 0;

    while i < changes.len() {
        match &changes[i] {
            Change::AddSchema { name: schema_name } => {
                let create = CreateSchema {
                    name: schema_name.clone(),
                    if_not_exists: true,
                    quoting: flavour.quoting(),
                };
                let drop = DropSchema {
                    name: schema_name.clone(),
                    cascade: true,
                    quoting: flavour.quoting(),
                };
                items.push(PlanItem::new(create.to_string()).with_reverse(drop.to_string()));
                i += 1;
            }
            Change::DropSchema { name: schema_name } => {
                let drop = DropSchema {
                    name: schema_name.clone(),
                    cascade: true,
                    quoting: flavour.quoting(),
                };
                let create = CreateSchema {
                    name: schema_name.clone(),
                    if_not_exists: false,
                    quoting: flavour.quoting(),
                };
                items.push(PlanItem::new(drop.to_string()).with_reverse(create.to_string()).irreversible());
                i += 1;
            }
            Change::AddTable { schema, table } => {
                let Some(table_walker) = find_table(next, schema, table) else {
                    i += 1;
                    continue;
                };
                // Consume the AddColumn/AddPrimaryKey/AddIndex changes the
                // differ emits right after AddTable for this same table.
                let mut j = i + 1;
                while j < changes.len() && change_belongs_to_create(&changes[j], schema, table) {
                    j += 1;
                }
                let create = build_create_table(flavour, table_walker, options);
                let drop = DropTable {
                    schema: options.resolve_schema(schema),
                    table: table.clone(),
                    cascade: false,
                    quoting: flavour.quoting(),
                };
                items.push(PlanItem::new(create.to_string()).with_reverse(drop.to_string()));
                items.extend(secondary_index_items(flavour, table_walker, options));
                items.extend(table_comment_item(flavour, table_walker, options));
                i = j;
            }
            Change::DropTable { schema, table } => {
                let drop = DropTable {
                    schema: options.resolve_schema(schema),
                    table: table.clone(),
                    cascade: false,
                    quoting: flavour.quoting(),
                };
                let mut item = PlanItem::new(drop.to_string());
                if let Some(table_walker) = find_table(previous, schema, table) {
                    let recreate = build_create_table(flavour, table_walker, options);
                    item = item.with_reverse(recreate.to_string());
                }
                if options.mode == PlanMode::PlanFile {
                    item = item.irreversible();
                }
                items.push(item);
                i += 1;
            }
            Change::RenameTable { schema, from, to } => {
                let rename = RenameTable {
                    schema: options.resolve_schema(schema),
                    from: from.clone(),
                    to: to.clone(),
                    quoting: flavour.quoting(),
                };
                let reverse = RenameTable {
                    schema: options.resolve_schema(schema),
                    from: to.clone(),
                    to: from.clone(),
                    quoting: flavour.quoting(),
                };
                items.push(PlanItem::new(rename.to_string()).with_reverse(reverse.to_string()));
                i += 1;
            }
            Change::AddColumn { schema, table, .. }
            | Change::DropColumn { schema, table, .. }
            | Change::ModifyColumn { schema, table, .. }
            | Change::RenameColumn { schema, table, .. }
            | Change::AddPrimaryKey { schema, table }
            | Change::DropPrimaryKey { schema, table }
            | Change::ModifyPrimaryKey { schema, table } => {
                let schema = schema.clone();
                let table = table.clone();
                let mut j = i;
                while j < changes.len() && is_table_alter_change(&changes[j], &schema, &table) {
                    j += 1;
                }
                items.extend(render_alter_table_group(flavour, previous, next, &schema, &table, &changes[i..j], options)?);
                i = j;
            }
            Change::AddIndex { schema, table, index } => {
                let Some(idx) = find_table(next, schema, table).and_then(|t| t.indexes().find(|i| i.name() == index)) else {
                    i += 1;
                    continue;
                };
                let schema_q = options.resolve_schema(schema);
                let cols: Vec<String> = idx.columns().map(|c| c.name().to_string()).collect();
                let create = CreateIndex {
                    schema: schema_q.clone(),
                    name: index.clone(),
                    table: table.clone(),
                    unique: idx.is_unique(),
                    columns: cols,
                    using: None,
                    predicate: None,
                    concurrently: flavour.dialect() == schema_connector::Dialect::Postgres,
                    quoting: flavour.quoting(),
                };
                let drop = DropIndex {
                    schema: schema_q,
                    name: index.clone(),
                    table: mysql_index_table(flavour, table),
                    concurrently: create.concurrently,
                    quoting: flavour.quoting(),
                };
                let mut item = PlanItem::new(create.to_string()).with_reverse(drop.to_string());
                if create.concurrently {
                    item = item.non_transactional();
                }
                items.push(item);
                i += 1;
            }
            Change::DropIndex { schema, table, index } => {
                let Some(idx) = find_table(previous, schema, table).and_then(|t| t.indexes().find(|i| i.name() == index)) else {
                    i += 1;
                    continue;
                };
                let schema_q = options.resolve_schema(schema);
                let cols: Vec<String> = idx.columns().map(|c| c.name().to_string()).collect();
                let drop = DropIndex {
                    schema: schema_q.clone(),
                    name: index.clone(),
                    table: mysql_index_table(flavour, table),
                    concurrently: false,
                    quoting: flavour.quoting(),
                };
                let create = CreateIndex {
                    schema: schema_q,
                    name: index.clone(),
                    table: table.clone(),
                    unique: idx.is_unique(),
                    columns: cols,
                    using: None,
                    predicate: None,
                    concurrently: false,
                    quoting: flavour.quoting(),
                };
                items.push(PlanItem::new(drop.to_string()).with_reverse(create.to_string()));
                i += 1;
            }
            Change::ModifyIndex { schema, table, index, .. } => {
                // Rendered as drop-then-recreate for part/uniqueness
                // changes, since most dialects have no single ALTER INDEX
                // clause that covers both.
                if let Some(idx) = find_previous_or_next_index(previous, next, schema, table, index) {
                    let schema_q = options.resolve_schema(schema);
                    let old_cols: Vec<String> = find_table(previous, schema, table)
                        .and_then(|t| t.indexes().find(|i| i.name() == index))
                        .map(|i| i.columns().map(|c| c.name().to_string()).collect())
                        .unwrap_or_default();
                    let new_cols: Vec<String> = idx.columns().map(|c| c.name().to_string()).collect();
                    let drop = DropIndex {
                        schema: schema_q.clone(),
                        name: index.clone(),
                        table: mysql_index_table(flavour, table),
                        concurrently: false,
                        quoting: flavour.quoting(),
                    };
                    let create = CreateIndex {
                        schema: schema_q.clone(),
                        name: index.clone(),
                        table: table.clone(),
                        unique: idx.is_unique(),
                        columns: new_cols,
                        using: None,
                        predicate: None,
                        concurrently: false,
                        quoting: flavour.quoting(),
                    };
                    let recreate_old = CreateIndex {
                        schema: schema_q,
                        name: index.clone(),
                        table: table.clone(),
                        unique: idx.is_unique(),
                        columns: old_cols,
                        using: None,
                        predicate: None,
                        concurrently: false,
                        quoting: flavour.quoting(),
                    };
                    items.push(PlanItem::new(drop.to_string()));
                    items.push(PlanItem::new(create.to_string()).with_reverse(recreate_old.to_string()));
                }
                i += 1;
            }
            Change::AddForeignKey { schema, table, constraint, .. } => {
                if let Some(fk) = find_table(next, schema, table).and_then(|t| t.foreign_keys().find(|f| f.constraint_name().unwrap_or("") == constraint)) {
                    let columns: Vec<String> = fk.constrained_columns().map(|c| c.name().to_string()).collect();
                    let referenced_columns: Vec<String> = fk.referenced_column_names().map(|s| s.to_string()).collect();
                    let clause = foreign_key_clause(
                        Some(constraint.as_str()),
                        columns,
                        fk.referenced_table_name().to_string(),
                        referenced_columns,
                        fk.on_delete_action(),
                        fk.on_update_action(),
                    );
                    let alter = AlterTable::new(table.clone(), flavour.quoting())
                        .schema_opt(options.resolve_schema(schema))
                        .clause(clause);
                    let reverse = AlterTable::new(table.clone(), flavour.quoting())
                        .schema_opt(options.resolve_schema(schema))
                        .clause(AlterTableClause::DropForeignKey(constraint.clone()));
                    items.push(PlanItem::new(alter.to_string()).with_reverse(reverse.to_string()));
                }
                i += 1;
            }
            Change::DropForeignKey { schema, table, constraint } => {
                if let Some(fk) = find_table(previous, schema, table).and_then(|t| t.foreign_keys().find(|f| f.constraint_name().unwrap_or("") == constraint)) {
                    let columns: Vec<String> = fk.constrained_columns().map(|c| c.name().to_string()).collect();
                    let referenced_columns: Vec<String> = fk.referenced_column_names().map(|s| s.to_string()).collect();
                    let alter = AlterTable::new(table.clone(), flavour.quoting())
                        .schema_opt(options.resolve_schema(schema))
                        .clause(AlterTableClause::DropForeignKey(constraint.clone()));
                    let reverse = AlterTable::new(table.clone(), flavour.quoting())
                        .schema_opt(options.resolve_schema(schema))
                        .clause(foreign_key_clause(
                            Some(constraint.as_str()),
                            columns,
                            fk.referenced_table_name().to_string(),
                            referenced_columns,
                            fk.on_delete_action(),
                            fk.on_update_action(),
                        ));
                    items.push(PlanItem::new(alter.to_string()).with_reverse(reverse.to_string()));
                }
                i += 1;
            }
            Change::ModifyForeignKey { schema, table, constraint, changes: fk_changes } => {
                if let Some(fk) = find_table(next, schema, table).and_then(|t| t.foreign_keys().find(|f| f.constraint_name().unwrap_or("") == constraint)) {
                    let columns: Vec<String> = fk.constrained_columns().map(|c| c.name().to_string()).collect();
                    let referenced_columns: Vec<String> = fk.referenced_column_names().map(|s| s.to_string()).collect();
                    let drop_clause = AlterTableClause::DropForeignKey(constraint.clone());
                    let add_clause = foreign_key_clause(
                        Some(constraint.as_str()),
                        columns,
                        fk.referenced_table_name().to_string(),
                        referenced_columns,
                        fk.on_delete_action(),
                        fk.on_update_action(),
                    );
                    let alter = AlterTable::new(table.clone(), flavour.quoting())
                        .schema_opt(options.resolve_schema(schema))
                        .clause(drop_clause.clone())
                        .clause(add_clause);
                    items.push(PlanItem::new(alter.to_string()));
                    let _ = fk_changes;
                }
                i += 1;
            }
            Change::AddCheck { schema, table, name: check_name } => {
                if let Some(check) = find_table(next, schema, table).and_then(|t| t.checks().find(|c| c.name() == Some(check_name.as_str()))) {
                    let alter = AlterTable::new(table.clone(), flavour.quoting())
                        .schema_opt(options.resolve_schema(schema))
                        .clause(AlterTableClause::AddCheck {
                            name: check_name.clone(),
                            expression: check.expression().to_string(),
                        });
                    let reverse = AlterTable::new(table.clone(), flavour.quoting())
                        .schema_opt(options.resolve_schema(schema))
                        .clause(AlterTableClause::DropCheck(check_name.clone()));
                    items.push(PlanItem::new(alter.to_string()).with_reverse(reverse.to_string()));
                }
                i += 1;
            }
            Change::DropCheck { schema, table, name: check_name } => {
                if let Some(check) = find_table(previous, schema, table).and_then(|t| t.checks().find(|c| c.name() == Some(check_name.as_str()))) {
                    let alter = AlterTable::new(table.clone(), flavour.quoting())
                        .schema_opt(options.resolve_schema(schema))
                        .clause(AlterTableClause::DropCheck(check_name.clone()));
                    let reverse = AlterTable::new(table.clone(), flavour.quoting())
                        .schema_opt(options.resolve_schema(schema))
                        .clause(AlterTableClause::AddCheck {
                            name: check_name.clone(),
                            expression: check.expression().to_string(),
                        });
                    items.push(PlanItem::new(alter.to_string()).with_reverse(reverse.to_string()));
                }
                i += 1;
            }
            Change::ModifyCheck { schema, table, name: check_name } => {
                if let Some(check) = find_table(next, schema, table).and_then(|t| t.checks().find(|c| c.name() == Some(check_name.as_str()))) {
                    let alter = AlterTable::new(table.clone(), flavour.quoting())
                        .schema_opt(options.resolve_schema(schema))
                        .clause(AlterTableClause::DropCheck(check_name.clone()))
                        .clause(AlterTableClause::AddCheck {
                            name: check_name.clone(),
                            expression: check.expression().to_string(),
                        });
                    items.push(PlanItem::new(alter.to_string()));
                }
                i += 1;
            }
            Change::CreateEnum { schema, name: enum_name, values } => {
                let create = CreateEnum {
                    schema: options.resolve_schema(schema),
                    name: enum_name.clone(),
                    values: values.clone(),
                    quoting: flavour.quoting(),
                };
                // sql_ddl has no dedicated DROP TYPE statement; build it directly.
                let drop_type = format!(
                    "DROP TYPE IF EXISTS {}",
                    qualified_name(options.resolve_schema(schema).as_deref(), enum_name, flavour.quoting())
                );
                items.push(PlanItem::new(create.to_string()).with_reverse(drop_type));
                i += 1;
            }
            Change::DropEnum { schema, name: enum_name } => {
                let drop_type = format!(
                    "DROP TYPE IF EXISTS {}",
                    qualified_name(options.resolve_schema(schema).as_deref(), enum_name, flavour.quoting())
                );
                items.push(PlanItem::new(drop_type).irreversible());
                i += 1;
            }
            Change::AddEnumValue { schema, name: enum_name, value } => {
                let alter = AlterEnumAddValue {
                    schema: options.resolve_schema(schema),
                    name: enum_name.clone(),
                    value: value.clone(),
                    quoting: flavour.quoting(),
                };
                items.push(PlanItem::new(alter.to_string()).non_transactional().irreversible());
                i += 1;
            }
        }
    }

    tracing::debug!(items = items.len(), "planned changes");
    Ok(Plan::new(name, items))
}

fn mysql_index_table(flavour: &dyn SqlFlavour, table: &str) -> Option<String> {
    if flavour.dialect() == schema_connector::Dialect::Mysql {
        Some(table.to_string())
    } else {
        None
    }
}

fn find_previous_or_next_index<'a>(
    previous: &'a SqlSchema,
    next: &'a SqlSchema,
    schema: &str,
    table: &str,
    index: &str,
) -> Option<sql_schema_describer::IndexWalker<'a>> {
    find_table(next, schema, table)
        .and_then(|t| t.indexes().find(|i| i.name() == index))
        .or_else(|| find_table(previous, schema, table).and_then(|t| t.indexes().find(|i| i.name() == index)))
}

/// Whether `change` is one of the changes the differ emits right after
/// `AddTable` for the same table (column adds, the primary key, its
/// indexes) — consumed as part of building the one `CREATE TABLE`
/// statement rather than planned individually.
fn change_belongs_to_create(change: &Change, schema: &str, table: &str) -> bool {
    match change {
        Change::AddColumn { schema: s, table: t, .. }
        | Change::AddPrimaryKey { schema: s, table: t }
        | Change::AddIndex { schema: s, table: t, .. } => s == schema && t == table,
        _ => false,
    }
}

fn is_table_alter_change(change: &Change, schema: &str, table: &str) -> bool {
    match change {
        Change::AddColumn { schema: s, table: t, .. }
        | Change::DropColumn { schema: s, table: t, .. }
        | Change::ModifyColumn { schema: s, table: t, .. }
        | Change::RenameColumn { schema: s, table: t, .. }
        | Change::AddPrimaryKey { schema: s, table: t }
        | Change::DropPrimaryKey { schema: s, table: t }
        | Change::ModifyPrimaryKey { schema: s, table: t } => s == schema && t == table,
        _ => false,
    }
}

/// Renders a run of column/primary-key changes on one table as a single
/// multi-clause `ALTER TABLE` (split per clause when the flavour forbids
/// batching), plus any side-statements a SERIAL synthesis/teardown needs.
fn render_alter_table_group(
    flavour: &dyn SqlFlavour,
    previous: &SqlSchema,
    next: &SqlSchema,
    schema: &str,
    table: &str,
    group: &[Change],
    options: &PlanOptions,
) -> ConnectorResult<Vec<PlanItem>> {
    let mut pre = Vec::new();
    let mut post = Vec::new();
    let mut clause_pairs: Vec<(AlterTableClause, AlterTableClause)> = Vec::new();

    for change in group {
        match change {
            Change::AddColumn { column, .. } => {
                let Some(col) = find_column(next, schema, table, column) else { continue };
                if let Some(DefaultValue::Sequence(seq)) = col.default() {
                    pre.push(create_sequence_item(flavour, schema, table, column, seq, options));
                }
                clause_pairs.push((
                    AlterTableClause::AddColumn(column_spec(flavour, col)),
                    AlterTableClause::DropColumn(column.clone()),
                ));
            }
            Change::DropColumn { column, .. } => {
                let Some(col) = find_column(previous, schema, table, column) else { continue };
                if let Some(DefaultValue::Sequence(seq)) = col.default() {
                    post.push(drop_sequence_item(flavour, schema, seq));
                }
                clause_pairs.push((
                    AlterTableClause::DropColumn(column.clone()),
                    AlterTableClause::AddColumn(column_spec(flavour, col)),
                ));
            }
            Change::ModifyColumn { column, changes: col_changes, .. } => {
                let (Some(prev_col), Some(next_col)) = (
                    find_column(previous, schema, table, column),
                    find_column(next, schema, table, column),
                ) else {
                    continue;
                };

                if col_changes.contains(ColumnChangeKind::ChangeGenerated) {
                    let prev_storage = match prev_col.attr("generated") {
                        Some(ColumnAttr::GeneratedExpr { storage, .. }) => Some(*storage),
                        _ => None,
                    };
                    let next_storage = match next_col.attr("generated") {
                        Some(ColumnAttr::GeneratedExpr { storage, .. }) => Some(*storage),
                        _ => None,
                    };
                    let illegal = match (prev_storage, next_storage) {
                        (Some(from), Some(to)) => from != to,
                        (None, Some(GeneratedStorage::Virtual)) => true,
                        _ => false,
                    };
                    if illegal {
                        return Err(ConnectorError::UnsupportedOperation(format!(
                            "column \"{column}\"'s generated storage class cannot change once set"
                        )));
                    }
                }

                let serial_dropped = matches!(prev_col.default(), Some(DefaultValue::Sequence(_)))
                    && !matches!(next_col.default(), Some(DefaultValue::Sequence(_)));
                let serial_added = matches!(next_col.default(), Some(DefaultValue::Sequence(_)))
                    && !matches!(prev_col.default(), Some(DefaultValue::Sequence(_)));

                if serial_added {
                    if let Some(DefaultValue::Sequence(seq)) = next_col.default() {
                        pre.push(create_sequence_item(flavour, schema, table, column, seq, options));
                        let set_default = AlterSequence {
                            schema: options.resolve_schema(schema),
                            name: seq.clone(),
                            set_default_on: Some((table.to_string(), column.clone())),
                            quoting: flavour.quoting(),
                        };
                        let drop_default = AlterTable::new(table.to_string(), flavour.quoting())
                            .schema_opt(options.resolve_schema(schema))
                            .clause(AlterTableClause::AlterColumnDropDefault(column.clone()));
                        pre.push(PlanItem::new(set_default.to_string()).with_reverse(drop_default.to_string()));
                    }
                } else if col_changes.contains(ColumnChangeKind::ChangeDefault) {
                    if serial_dropped {
                        clause_pairs.push((
                            AlterTableClause::AlterColumnDropDefault(column.clone()),
                            default_clause(column, prev_col.default()),
                        ));
                    } else {
                        clause_pairs.push((default_clause(column, next_col.default()), default_clause(column, prev_col.default())));
                    }
                }

                if col_changes.contains(ColumnChangeKind::ChangeType) {
                    clause_pairs.push((
                        AlterTableClause::AlterColumnType {
                            column: column.clone(),
                            type_name: next_col.column_type().full_data_type.clone(),
                        },
                        AlterTableClause::AlterColumnType {
                            column: column.clone(),
                            type_name: prev_col.column_type().full_data_type.clone(),
                        },
                    ));
                }

                if col_changes.contains(ColumnChangeKind::ChangeNull) {
                    if next_col.arity().is_nullable() {
                        clause_pairs.push((
                            AlterTableClause::AlterColumnDropNotNull(column.clone()),
                            AlterTableClause::AlterColumnSetNotNull(column.clone()),
                        ));
                    } else {
                        clause_pairs.push((
                            AlterTableClause::AlterColumnSetNotNull(column.clone()),
                            AlterTableClause::AlterColumnDropNotNull(column.clone()),
                        ));
                    }
                }

                if serial_dropped {
                    if let Some(DefaultValue::Sequence(seq)) = prev_col.default() {
                        post.push(drop_sequence_item(flavour, schema, seq));
                    }
                }
            }
            Change::RenameColumn { from, to, .. } => {
                clause_pairs.push((
                    AlterTableClause::RenameColumn { from: from.clone(), to: to.clone() },
                    AlterTableClause::RenameColumn { from: to.clone(), to: from.clone() },
                ));
            }
            Change::AddPrimaryKey { .. } => {
                if let Some(pk) = find_table(next, schema, table).and_then(|t| t.primary_key()) {
                    let cols: Vec<String> = pk.columns().map(|c| c.name().to_string()).collect();
                    clause_pairs.push((
                        AlterTableClause::AddConstraintPrimaryKey(cols),
                        AlterTableClause::DropPrimaryKey(Some(pk.name().to_string())),
                    ));
                }
            }
            Change::DropPrimaryKey { .. } => {
                if let Some(pk) = find_table(previous, schema, table).and_then(|t| t.primary_key()) {
                    let cols: Vec<String> = pk.columns().map(|c| c.name().to_string()).collect();
                    clause_pairs.push((
                        AlterTableClause::DropPrimaryKey(Some(pk.name().to_string())),
                        AlterTableClause::AddConstraintPrimaryKey(cols),
                    ));
                }
            }
            Change::ModifyPrimaryKey { .. } => {
                let prev_pk = find_table(previous, schema, table).and_then(|t| t.primary_key());
                let next_pk = find_table(next, schema, table).and_then(|t| t.primary_key());
                if let (Some(prev_pk), Some(next_pk)) = (prev_pk, next_pk) {
                    let prev_cols: Vec<String> = prev_pk.columns().map(|c| c.name().to_string()).collect();
                    let next_cols: Vec<String> = next_pk.columns().map(|c| c.name().to_string()).collect();
                    clause_pairs.push((
                        AlterTableClause::DropPrimaryKey(Some(prev_pk.name().to_string())),
                        AlterTableClause::DropPrimaryKey(Some(next_pk.name().to_string())),
                    ));
                    clause_pairs.push((
                        AlterTableClause::AddConstraintPrimaryKey(next_cols),
                        AlterTableClause::AddConstraintPrimaryKey(prev_cols),
                    ));
                }
            }
            _ => {}
        }
    }

    let mut out = Vec::new();
    out.append(&mut pre);

    if !clause_pairs.is_empty() {
        let schema_q = options.resolve_schema(schema);
        if flavour.allows_multi_clause_alter_table() {
            let mut forward = AlterTable::new(table.to_string(), flavour.quoting());
            if let Some(s) = schema_q.clone() {
                forward = forward.schema(s);
            }
            let mut reverse = AlterTable::new(table.to_string(), flavour.quoting());
            if let Some(s) = schema_q {
                reverse = reverse.schema(s);
            }
            for (fwd, _) in &clause_pairs {
                forward = forward.clause(fwd.clone());
            }
            for (_, rev) in clause_pairs.iter().rev() {
                reverse = reverse.clause(rev.clone());
            }
            out.push(PlanItem::new(forward.to_string()).with_reverse(reverse.to_string()));
        } else {
            for (fwd, rev) in &clause_pairs {
                let forward_stmt = AlterTable::new(table.to_string(), flavour.quoting())
                    .schema_opt(options.resolve_schema(schema))
                    .clause(fwd.clone());
                let reverse_stmt = AlterTable::new(table.to_string(), flavour.quoting())
                    .schema_opt(options.resolve_schema(schema))
                    .clause(rev.clone());
                out.push(PlanItem::new(forward_stmt.to_string()).with_reverse(reverse_stmt.to_string()));
            }
        }
    }

    out.append(&mut post);
    Ok(out)
}

fn default_clause(column: &str, default: Option<&DefaultValue>) -> AlterTableClause {
    match default {
        Some(d) => AlterTableClause::AlterColumnSetDefault {
            column: column.to_string(),
            default: render_default(d),
        },
        None => AlterTableClause::AlterColumnDropDefault(column.to_string()),
    }
}

fn create_sequence_item(
    flavour: &dyn SqlFlavour,
    schema: &str,
    table: &str,
    column: &str,
    seq: &str,
    options: &PlanOptions,
) -> PlanItem {
    let create = CreateSequence {
        schema: options.resolve_schema(schema),
        name: seq.to_string(),
        if_not_exists: true,
        owned_by: Some((table.to_string(), column.to_string())),
        quoting: flavour.quoting(),
    };
    let drop = DropSequence {
        schema: options.resolve_schema(schema),
        name: seq.to_string(),
        if_exists: true,
        quoting: flavour.quoting(),
    };
    PlanItem::new(create.to_string()).with_reverse(drop.to_string())
}

fn drop_sequence_item(flavour: &dyn SqlFlavour, schema: &str, seq: &str) -> PlanItem {
    let drop = DropSequence {
        schema: Some(schema.to_string()),
        name: seq.to_string(),
        if_exists: true,
        quoting: flavour.quoting(),
    };
    PlanItem::new(drop.to_string()).irreversible()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::diff_schemas;
    use crate::flavour::{MysqlFlavour, PostgresFlavour};
    use sql_schema_describer::{ColumnArity, ColumnAttr, ColumnRef, ColumnType, ColumnTypeFamily, GeneratedStorage, TableRef};

    fn int_type() -> ColumnType {
        ColumnType {
            full_data_type: "bigint".into(),
            family: ColumnTypeFamily::BigInt,
            arity: ColumnArity::Required,
        }
    }

        #[test]
    fn adding_a_table_emits_single_create_with_inline_primary_key() {
        let previous = SqlSchema::default();
        let mut next = SqlSchema::default();
        let schema_id = next.push_schema("");
        let table = next.push_table(schema_id, "users");
        let id_col = next.push_column(table, "id", int_type());
        next.push_primary_key(table, "users_pkey", vec![id_col]);

        let changes = diff_schemas(&previous, &next);
        let plan = plan_changes(&MysqlFlavour, &previous, &next, &changes, "0001_init", &PlanOptions::default()).unwrap();

        assert_eq!(plan.items.len(), 1);
        assert_eq!(plan.items[0].cmd, "CREATE TABLE `users` (`id` bigint NOT NULL, PRIMARY KEY (`id`))");
        assert_eq!(plan.items[0].reverse, vec!["DROP TABLE `users`"]);
        assert!(plan.reversible());
        assert!(plan.transactional());
    }

        #[test]
    fn enum_value_append_is_irreversible_and_nontransactional() {
        let mut previous = SqlSchema::default();
        let schema_id = previous.push_schema("public");
        previous.push_enum(schema_id, "state", vec!["on".into(), "off".into()]);

        let mut next = SqlSchema::default();
        let schema_id = next.push_schema("public");
        next.push_enum(schema_id, "state", vec!["on".into(), "off".into(), "unknown".into()]);

        let changes = diff_schemas(&previous, &next);
        let plan = plan_changes(&PostgresFlavour, &previous, &next, &changes, "0003_enum", &PlanOptions::default()).unwrap();

        assert_eq!(plan.items.len(), 1);
        assert_eq!(plan.items[0].cmd, "ALTER TYPE \"public\".\"state\" ADD VALUE 'unknown'");
        assert!(!plan.reversible());
        assert!(!plan.transactional());
    }

        /// A parser hint fused into the differ's raw Drop+Add pair renders
    /// as a single RENAME COLUMN, reversible by swapping the names.
    #[test]
    fn renaming_a_column_via_parser_hint_emits_rename_statement() {
        use crate::rename::{detect_rename_hints, fuse_renames};

        let mut previous = SqlSchema::default();
        let schema_id = previous.push_schema("s1");
        let table = previous.push_table(schema_id, "t1");
        previous.push_column(table, "a", int_type());

        let mut next = SqlSchema::default();
        let schema_id = next.push_schema("s1");
        let table = next.push_table(schema_id, "t1");
        next.push_column(table, "b", int_type());

        let changes = diff_schemas(&previous, &next);
        let hints = detect_rename_hints(&["ALTER TABLE t1 RENAME COLUMN a TO b".to_string()]);
        let changes = fuse_renames(changes, &hints);

        let plan = plan_changes(&PostgresFlavour, &previous, &next, &changes, "0002_rename", &PlanOptions::default()).unwrap();

        assert_eq!(plan.items.len(), 1);
        assert_eq!(plan.items[0].cmd, "ALTER TABLE \"s1\".\"t1\" RENAME COLUMN \"a\" TO \"b\"");
        assert_eq!(plan.items[0].reverse, vec!["ALTER TABLE \"s1\".\"t1\" RENAME COLUMN \"b\" TO \"a\""]);
        assert!(plan.reversible());
    }

        #[test]
    fn dropping_serial_columns_drops_their_sequences() {
        let mut previous = SqlSchema::default();
        let schema_id = previous.push_schema("public");
        let table = previous.push_table(schema_id, "posts");
        let c1 = previous.push_column(
            table,
            "c1",
            ColumnType {
                full_data_type: "smallint".into(),
                family: ColumnTypeFamily::Int,
                arity: ColumnArity::Required,
            },
        );
        previous.columns[c1.index()].default = Some(DefaultValue::Sequence("posts_c1_seq".into()));
        let c2 = previous.push_column(table, "c2", int_type());
        previous.columns[c2.index()].default = Some(DefaultValue::Sequence("previous_name".into()));

        let mut next = previous.clone();
        next.columns[c1.index()].tpe = ColumnType {
            full_data_type: "integer".into(),
            family: ColumnTypeFamily::Int,
            arity: ColumnArity::Required,
        };
        next.columns[c1.index()].default = None;
        next.columns[c2.index()].default = None;

        let changes = diff_schemas(&previous, &next);
        let plan = plan_changes(&PostgresFlavour, &previous, &next, &changes, "0004_drop_serial", &PlanOptions::default()).unwrap();

        assert_eq!(
            plan.items[0].cmd,
            "ALTER TABLE \"posts\" ALTER COLUMN \"c1\" DROP DEFAULT, ALTER COLUMN \"c1\" TYPE integer, ALTER COLUMN \"c2\" DROP DEFAULT"
        );
        assert_eq!(plan.items[1].cmd, "DROP SEQUENCE IF EXISTS \"public\".\"posts_c1_seq\"");
        assert_eq!(plan.items[2].cmd, "DROP SEQUENCE IF EXISTS \"public\".\"previous_name\"");
        assert!(!plan.reversible());
        let _ = ColumnRef::Stub;
        let _ = TableRef::External;
    }

        #[test]
    fn indent_option_pretty_prints_create_table() {
        let previous = SqlSchema::default();
        let mut next = SqlSchema::default();
        let schema_id = next.push_schema("");
        let table = next.push_table(schema_id, "t1");
        next.push_column(
            table,
            "a",
            ColumnType { full_data_type: "int".into(), family: ColumnTypeFamily::Int, arity: ColumnArity::Nullable },
        );
        next.push_column(
            table,
            "b",
            ColumnType { full_data_type: "int".into(), family: ColumnTypeFamily::Int, arity: ColumnArity::Nullable },
        );
        let id_col = next.push_column(table, "id", int_type());
        next.push_primary_key(table, "id", vec![id_col]);

        let changes = diff_schemas(&previous, &next);
        let options = PlanOptions {
            indent: Some("  ".into()),
            ..PlanOptions::default()
        };
        let plan = plan_changes(&MysqlFlavour, &previous, &next, &changes, "0005_indented", &options).unwrap();

        assert_eq!(
            plan.items[0].cmd,
            "CREATE TABLE `t1` (\n  `a` int,\n  `b` int,\n  `id` bigint NOT NULL,\n  PRIMARY KEY (`id`)\n)"
        );
    }

    #[test]
    fn stripping_the_schema_qualifier_across_multiple_schemas_is_rejected() {
        let mut previous = SqlSchema::default();
        let s1 = previous.push_schema("s1");
        previous.push_table(s1, "t1");
        let s2 = previous.push_schema("s2");
        previous.push_table(s2, "t2");
        let next = SqlSchema::default();

        let changes = diff_schemas(&previous, &next);
        let options = PlanOptions {
            schema_qualifier: SchemaQualifier::Stripped,
            ..PlanOptions::default()
        };
        let err = plan_changes(&PostgresFlavour, &previous, &next, &changes, "0006_drop_both", &options).unwrap_err();
        assert_eq!(err.kind(), schema_connector::ConnectorErrorKind::UnsupportedOperation);
    }

    #[test]
    fn generated_column_storage_class_change_is_rejected() {
        let mut previous = SqlSchema::default();
        let schema_id = previous.push_schema("public");
        let table = previous.push_table(schema_id, "t1");
        let col = previous.push_column(table, "full_name", ColumnType {
            full_data_type: "text".into(),
            family: ColumnTypeFamily::String,
            arity: ColumnArity::Required,
        });
        previous.columns[col.index()].attrs.push(ColumnAttr::GeneratedExpr {
            expression: "first || ' ' || last".into(),
            storage: GeneratedStorage::Stored,
        });

        let mut next = previous.clone();
        next.columns[col.index()].attrs.clear();
        next.columns[col.index()].attrs.push(ColumnAttr::GeneratedExpr {
            expression: "first || ' ' || last".into(),
            storage: GeneratedStorage::Virtual,
        });

        let changes = diff_schemas(&previous, &next);
        let err = plan_changes(&PostgresFlavour, &previous, &next, &changes, "0007_bad_storage_change", &PlanOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), schema_connector::ConnectorErrorKind::UnsupportedOperation);
    }
}
