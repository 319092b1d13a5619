//! The Differ (component C): turns two [`SqlSchema`] states into an
//! ordered, dependency-sound list of [`Change`]s. Entities are paired by
//! name first (`Pair<T>`); an unmatched `previous` becomes a `Drop*`, an
//! unmatched `next` an `Add*`, and a match becomes a `Modify*` carrying a
//! bitmask of exactly what differs. The differ never mutates either
//! schema and never decides reversibility — that's the planner's job,
//! since only the planner knows whether it can reconstruct a reverse
//! statement from the `previous` state.

use enumflags2::{bitflags, BitFlags};
use itertools::Itertools;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use schema_connector::Pair;
use sql_schema_describer::{
    CheckWalker, ColumnWalker, ForeignKeyWalker, IndexAttr, IndexWalker, SqlSchema, SqlSchemaExt, TableId, TableWalker,
};
use std::collections::HashMap;

#[bitflags]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColumnChangeKind {
    ChangeType,
    ChangeNull,
    ChangeDefault,
    ChangeAttr,
    ChangeComment,
    ChangeGenerated,
    ChangeCharset,
    ChangeCollate,
}
pub type ColumnChanges = BitFlags<ColumnChangeKind>;

#[bitflags]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ForeignKeyChangeKind {
    ChangeUpdateAction,
    ChangeDeleteAction,
    ChangeColumn,
    ChangeRefColumn,
    ChangeRefTable,
}
pub type ForeignKeyChanges = BitFlags<ForeignKeyChangeKind>;

#[bitflags]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IndexChangeKind {
    ChangeUnique,
    ChangeParts,
    ChangeAttr,
    ChangeComment,
}
pub type IndexChanges = BitFlags<IndexChangeKind>;

/// One atomic difference between `previous` and `next`, named by what it
/// does rather than how it will eventually be rendered. `schema`/`table`
/// are the entity's own names, taken from `next` for additions and
/// modifications, from `previous` for drops.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    AddSchema { name: String },
    DropSchema { name: String },
    AddTable { schema: String, table: String },
    DropTable { schema: String, table: String },
    RenameTable { schema: String, from: String, to: String },
    AddColumn { schema: String, table: String, column: String },
    DropColumn { schema: String, table: String, column: String },
    ModifyColumn { schema: String, table: String, column: String, changes: ColumnChanges },
    RenameColumn { schema: String, table: String, from: String, to: String },
    AddIndex { schema: String, table: String, index: String },
    DropIndex { schema: String, table: String, index: String },
    ModifyIndex { schema: String, table: String, index: String, changes: IndexChanges },
    RenameIndex { schema: String, table: String, from: String, to: String },
    AddPrimaryKey { schema: String, table: String },
    DropPrimaryKey { schema: String, table: String },
    ModifyPrimaryKey { schema: String, table: String },
    AddForeignKey { schema: String, table: String, constraint: String, detached: bool },
    DropForeignKey { schema: String, table: String, constraint: String },
    ModifyForeignKey { schema: String, table: String, constraint: String, changes: ForeignKeyChanges },
    AddCheck { schema: String, table: String, name: String },
    DropCheck { schema: String, table: String, name: String },
    ModifyCheck { schema: String, table: String, name: String },
    /// Enum value appends surface here rather than as a `ModifyColumn`
    /// flag: several columns (or none at all) may reference the same
    /// enum, so the type-level change is diffed once here instead of once
    /// per dependent column.
    CreateEnum { schema: String, name: String, values: Vec<String> },
    DropEnum { schema: String, name: String },
    AddEnumValue { schema: String, name: String, value: String },
}

impl Change {
    pub fn table_name(&self) -> Option<&str> {
        match self {
            Change::AddTable { table, .. }
            | Change::DropTable { table, .. }
            | Change::AddColumn { table, .. }
            | Change::DropColumn { table, .. }
            | Change::ModifyColumn { table, .. }
            | Change::RenameColumn { table, .. }
            | Change::AddIndex { table, .. }
            | Change::DropIndex { table, .. }
            | Change::ModifyIndex { table, .. }
            | Change::RenameIndex { table, .. }
            | Change::AddPrimaryKey { table, .. }
            | Change::DropPrimaryKey { table, .. }
            | Change::ModifyPrimaryKey { table, .. }
            | Change::AddForeignKey { table, .. }
            | Change::DropForeignKey { table, .. }
            | Change::ModifyForeignKey { table, .. }
            | Change::AddCheck { table, .. }
            | Change::DropCheck { table, .. }
            | Change::ModifyCheck { table, .. } => Some(table),
            Change::RenameTable { from, .. } => Some(from),
            _ => None,
        }
    }

    /// The schema this change lives in, taken from `next` for additions
    /// and modifications, from `previous` for drops — the same convention
    /// the whole `Change` enum already follows per-variant.
    pub fn schema_name(&self) -> &str {
        match self {
            Change::AddSchema { name } | Change::DropSchema { name } => name,
            Change::AddTable { schema, .. }
            | Change::DropTable { schema, .. }
            | Change::RenameTable { schema, .. }
            | Change::AddColumn { schema, .. }
            | Change::DropColumn { schema, .. }
            | Change::ModifyColumn { schema, .. }
            | Change::RenameColumn { schema, .. }
            | Change::AddIndex { schema, .. }
            | Change::DropIndex { schema, .. }
            | Change::ModifyIndex { schema, .. }
            | Change::RenameIndex { schema, .. }
            | Change::AddPrimaryKey { schema, .. }
            | Change::DropPrimaryKey { schema, .. }
            | Change::ModifyPrimaryKey { schema, .. }
            | Change::AddForeignKey { schema, .. }
            | Change::DropForeignKey { schema, .. }
            | Change::ModifyForeignKey { schema, .. }
            | Change::AddCheck { schema, .. }
            | Change::DropCheck { schema, .. }
            | Change::ModifyCheck { schema, .. }
            | Change::CreateEnum { schema, .. }
            | Change::DropEnum { schema, .. }
            | Change::AddEnumValue { schema, .. } => schema,
        }
    }
}

/// Pairs two name-keyed collections. Returned pairs are sorted by name so
/// the result is deterministic across runs regardless of arena order.
fn pair_by_name<'a, T: Copy>(previous: &[(&'a str, T)], next: &[(&'a str, T)]) -> Vec<Pair<Option<T>>> {
    let previous_names: HashMap<&str, T> = previous.iter().map(|(n, v)| (*n, *v)).collect();
    let next_names: HashMap<&str, T> = next.iter().map(|(n, v)| (*n, *v)).collect();
    let mut names: Vec<&str> = previous_names.keys().chain(next_names.keys()).copied().unique().collect();
    names.sort_unstable();
    names
        .into_iter()
        .map(|name| Pair::new(previous_names.get(name).copied(), next_names.get(name).copied()))
        .collect()
}

/// Diffs two whole schemas, returning changes ordered so that every
/// dependency precedes its dependent (property 6): every foreign key
/// drop before the table/column drop it depends on, every column add
/// before the foreign key add that references it, enum creation before
/// the table that uses it.
#[tracing::instrument(skip_all)]
pub fn diff_schemas(previous: &SqlSchema, next: &SqlSchema) -> Vec<Change> {
    let mut changes = Vec::new();

    let (added_schemas, dropped_schemas) = diff_schema_names(previous, next);
    changes.extend(added_schemas);

    diff_enums(previous, next, &mut changes);

    let previous_tables: Vec<(&str, TableWalker<'_>)> = previous.table_walkers().map(|t| (t.name(), t)).collect();
    let next_tables: Vec<(&str, TableWalker<'_>)> = next.table_walkers().map(|t| (t.name(), t)).collect();

    let mut dropped_tables = Vec::new();
    let mut added_tables = Vec::new();
    let mut kept_tables = Vec::new();

    for pair in pair_by_name(&previous_tables, &next_tables) {
        match pair.into_tuple() {
            (Some(from), None) => dropped_tables.push(from),
            (None, Some(to)) => added_tables.push(to),
            (Some(from), Some(to)) => kept_tables.push((from, to)),
            (None, None) => unreachable!(),
        }
    }

    // Pass 1: every foreign key drop, before any table drop — both the
    // ones owned by a table about to disappear, and the ones on a
    // surviving table whose FK set shrank (it may have referenced a
    // table that's about to disappear).
    for table in &dropped_tables {
        for fk in table.foreign_keys() {
            changes.push(drop_foreign_key_change(fk));
        }
    }

    let mut deferred_fk_adds = Vec::new();
    let mut deferred_fk_modifies = Vec::new();
    for (from, to) in &kept_tables {
        let (drops, adds, modifies) = diff_foreign_keys(*from, *to);
        changes.extend(drops);
        deferred_fk_adds.extend(adds);
        deferred_fk_modifies.extend(modifies);
    }

    // Pass 2: drop the tables themselves.
    for table in &dropped_tables {
        changes.push(Change::DropTable {
            schema: table.schema_name().to_string(),
            table: table.name().to_string(),
        });
    }

    // Pass 3: structural diffs (columns, primary key, indexes) on
    // surviving tables. Foreign keys are handled separately (passes 1
    // and 5) so their ordering relative to table drops/creates is exact.
    for (from, to) in &kept_tables {
        diff_table_structure(*from, *to, &mut changes);
    }

    // Pass 4: create new tables. FK cycles within this batch get one edge
    // per cycle detached so no CREATE TABLE needs a table that doesn't
    // exist yet.
    let cyclic = cyclic_foreign_keys(&added_tables);
    for table in &added_tables {
        changes.push(Change::AddTable {
            schema: table.schema_name().to_string(),
            table: table.name().to_string(),
        });
        for column in table.columns() {
            changes.push(Change::AddColumn {
                schema: table.schema_name().to_string(),
                table: table.name().to_string(),
                column: column.name().to_string(),
            });
        }
        if table.primary_key().is_some() {
            changes.push(Change::AddPrimaryKey {
                schema: table.schema_name().to_string(),
                table: table.name().to_string(),
            });
        }
        for index in table.indexes() {
            changes.push(Change::AddIndex {
                schema: table.schema_name().to_string(),
                table: table.name().to_string(),
                index: index.name().to_string(),
            });
        }
    }

    // Pass 5: every foreign key add/modify, now that every column on
    // every surviving and newly created table exists.
    changes.extend(deferred_fk_adds);
    changes.extend(deferred_fk_modifies);
    for table in &added_tables {
        for fk in table.foreign_keys() {
            let constraint = fk.constraint_name().unwrap_or("").to_string();
            let detached = cyclic.contains(&fk.foreign_key_index());
            changes.push(Change::AddForeignKey {
                schema: table.schema_name().to_string(),
                table: table.name().to_string(),
                constraint,
                detached,
            });
        }
    }

    changes.extend(dropped_schemas);

    tracing::debug!(changes = changes.len(), "diffed schemas");
    changes
}

/// Pairs `previous.schemas` against `next.schemas` by name. Returned as
/// (added, dropped) rather than folded into one `Vec` so the caller can
/// place additions at the very front of the change list and drops at the
/// very end, after every table/FK drop within that schema has already run.
fn diff_schema_names(previous: &SqlSchema, next: &SqlSchema) -> (Vec<Change>, Vec<Change>) {
    let previous_names: Vec<(&str, &str)> = previous.schemas.iter().map(|s| (s.name.as_str(), s.name.as_str())).collect();
    let next_names: Vec<(&str, &str)> = next.schemas.iter().map(|s| (s.name.as_str(), s.name.as_str())).collect();

    let mut added = Vec::new();
    let mut dropped = Vec::new();
    for pair in pair_by_name(&previous_names, &next_names) {
        match pair.into_tuple() {
            (Some(name), None) => dropped.push(Change::DropSchema { name: name.to_string() }),
            (None, Some(name)) => added.push(Change::AddSchema { name: name.to_string() }),
            _ => {}
        }
    }
    (added, dropped)
}

fn drop_foreign_key_change(fk: ForeignKeyWalker<'_>) -> Change {
    Change::DropForeignKey {
        schema: fk.table().schema_name().to_string(),
        table: fk.table().name().to_string(),
        constraint: fk.constraint_name().unwrap_or("").to_string(),
    }
}

/// Returns the set of foreign-key indexes (within `next`) that must be
/// detached from their owning `CREATE TABLE` because they participate in
/// a strongly connected component of the added-tables' FK graph — two or
/// more tables in the same batch referencing each other, so neither can
/// be created with its FK inline.
fn cyclic_foreign_keys(added_tables: &[TableWalker<'_>]) -> std::collections::HashSet<usize> {
    let mut graph = DiGraph::<TableId, usize>::new();
    let mut node_for_table: HashMap<TableId, NodeIndex> = HashMap::new();
    for table in added_tables {
        let node = graph.add_node(table.table_id());
        node_for_table.insert(table.table_id(), node);
    }

    for table in added_tables {
        let Some(&from_node) = node_for_table.get(&table.table_id()) else { continue };
        for fk in table.foreign_keys() {
            let Some(referenced) = fk.referenced_table() else { continue };
            let Some(&to_node) = node_for_table.get(&referenced.table_id()) else { continue };
            graph.add_edge(from_node, to_node, fk.foreign_key_index());
        }
    }

    let mut detached = std::collections::HashSet::new();
    for component in tarjan_scc(&graph) {
        if component.len() < 2 {
            continue;
        }
        for &node in &component {
            for edge in graph.edges(node) {
                if component.contains(&edge.target()) {
                    detached.insert(*edge.weight());
                }
            }
        }
    }
    detached
}

fn diff_table_structure(from: TableWalker<'_>, to: TableWalker<'_>, changes: &mut Vec<Change>) {
    let schema = to.schema_name().to_string();
    let table = to.name().to_string();

    let from_columns: Vec<(&str, ColumnWalker<'_>)> = from.columns().map(|c| (c.name(), c)).collect();
    let to_columns: Vec<(&str, ColumnWalker<'_>)> = to.columns().map(|c| (c.name(), c)).collect();

    for pair in pair_by_name(&from_columns, &to_columns) {
        match pair.into_tuple() {
            (Some(from_col), None) => changes.push(Change::DropColumn {
                schema: schema.clone(),
                table: table.clone(),
                column: from_col.name().to_string(),
            }),
            (None, Some(to_col)) => changes.push(Change::AddColumn {
                schema: schema.clone(),
                table: table.clone(),
                column: to_col.name().to_string(),
            }),
            (Some(from_col), Some(to_col)) => {
                if let Some(change_kind) = diff_column(from_col, to_col) {
                    changes.push(Change::ModifyColumn {
                        schema: schema.clone(),
                        table: table.clone(),
                        column: to_col.name().to_string(),
                        changes: change_kind,
                    });
                }
            }
            (None, None) => unreachable!(),
        }
    }

    diff_primary_key(from, to, &schema, &table, changes);
    diff_indexes(from, to, &schema, &table, changes);
    diff_checks(from, to, &schema, &table, changes);
}

fn diff_checks(from: TableWalker<'_>, to: TableWalker<'_>, schema: &str, table: &str, changes: &mut Vec<Change>) {
    let from_checks: Vec<(&str, CheckWalker<'_>)> = from.checks().map(|c| (c.name().unwrap_or(""), c)).collect();
    let to_checks: Vec<(&str, CheckWalker<'_>)> = to.checks().map(|c| (c.name().unwrap_or(""), c)).collect();

    for pair in pair_by_name(&from_checks, &to_checks) {
        match pair.into_tuple() {
            (Some(from_chk), None) => changes.push(Change::DropCheck {
                schema: schema.to_string(),
                table: table.to_string(),
                name: from_chk.name().unwrap_or("").to_string(),
            }),
            (None, Some(to_chk)) => changes.push(Change::AddCheck {
                schema: schema.to_string(),
                table: table.to_string(),
                name: to_chk.name().unwrap_or("").to_string(),
            }),
            (Some(from_chk), Some(to_chk)) => {
                if from_chk.expression() != to_chk.expression() {
                    changes.push(Change::ModifyCheck {
                        schema: schema.to_string(),
                        table: table.to_string(),
                        name: to_chk.name().unwrap_or("").to_string(),
                    });
                }
            }
            (None, None) => {}
        }
    }
}

fn diff_column(from: ColumnWalker<'_>, to: ColumnWalker<'_>) -> Option<ColumnChanges> {
    let mut changed = ColumnChanges::empty();

    if from.column_type().full_data_type != to.column_type().full_data_type {
        changed |= ColumnChangeKind::ChangeType;
    }
    if from.arity() != to.arity() {
        changed |= ColumnChangeKind::ChangeNull;
    }
    if !defaults_equal(from.default(), to.default()) {
        changed |= ColumnChangeKind::ChangeDefault;
    }
    if from.attr("comment") != to.attr("comment") {
        changed |= ColumnChangeKind::ChangeComment;
    }
    if from.attr("charset") != to.attr("charset") {
        changed |= ColumnChangeKind::ChangeCharset;
    }
    if from.attr("collation") != to.attr("collation") {
        changed |= ColumnChangeKind::ChangeCollate;
    }
    if from.attr("generated") != to.attr("generated") {
        changed |= ColumnChangeKind::ChangeGenerated;
    }
    // Everything else (AutoIncrement, OnUpdate, Identity) shares one
    // catch-all bit rather than a dedicated one each.
    for kind in ["auto_increment", "on_update", "identity"] {
        if from.attr(kind) != to.attr(kind) {
            changed |= ColumnChangeKind::ChangeAttr;
        }
    }

    if changed.is_empty() {
        None
    } else {
        Some(changed)
    }
}

/// Default comparison: plain value equality. The live `SELECT x = y`
/// round-trip fallback for array/expression equivalence is a
/// dialect-specific concern the PostgreSQL flavour opts into separately,
/// since it needs a live connection the differ itself never holds.
fn defaults_equal(
    from: Option<&sql_schema_describer::DefaultValue>,
    to: Option<&sql_schema_describer::DefaultValue>,
) -> bool {
    use sql_schema_describer::DefaultValue;
    match (from, to) {
        (None, None) => true,
        (Some(DefaultValue::Value(a)), Some(DefaultValue::Value(b))) => a == b,
        (Some(DefaultValue::Expression(a)), Some(DefaultValue::Expression(b))) => a == b,
        (Some(DefaultValue::Now), Some(DefaultValue::Now)) => true,
        (Some(DefaultValue::Sequence(a)), Some(DefaultValue::Sequence(b))) => a == b,
        _ => false,
    }
}

fn diff_primary_key(from: TableWalker<'_>, to: TableWalker<'_>, schema: &str, table: &str, changes: &mut Vec<Change>) {
    match (from.primary_key(), to.primary_key()) {
        (None, Some(_)) => changes.push(Change::AddPrimaryKey {
            schema: schema.to_string(),
            table: table.to_string(),
        }),
        (Some(_), None) => changes.push(Change::DropPrimaryKey {
            schema: schema.to_string(),
            table: table.to_string(),
        }),
        (Some(from_pk), Some(to_pk)) => {
            let from_cols: Vec<&str> = from_pk.columns().map(|c| c.name()).collect();
            let to_cols: Vec<&str> = to_pk.columns().map(|c| c.name()).collect();
            if from_cols != to_cols {
                changes.push(Change::ModifyPrimaryKey {
                    schema: schema.to_string(),
                    table: table.to_string(),
                });
            }
        }
        (None, None) => {}
    }
}

fn diff_indexes(from: TableWalker<'_>, to: TableWalker<'_>, schema: &str, table: &str, changes: &mut Vec<Change>) {
    let from_indexes: Vec<(&str, IndexWalker<'_>)> = from.indexes().map(|i| (i.name(), i)).collect();
    let to_indexes: Vec<(&str, IndexWalker<'_>)> = to.indexes().map(|i| (i.name(), i)).collect();

    for pair in pair_by_name(&from_indexes, &to_indexes) {
        match pair.into_tuple() {
            (Some(from_idx), None) => changes.push(Change::DropIndex {
                schema: schema.to_string(),
                table: table.to_string(),
                index: from_idx.name().to_string(),
            }),
            (None, Some(to_idx)) => changes.push(Change::AddIndex {
                schema: schema.to_string(),
                table: table.to_string(),
                index: to_idx.name().to_string(),
            }),
            (Some(from_idx), Some(to_idx)) => {
                let mut kind = IndexChanges::empty();
                if from_idx.is_unique() != to_idx.is_unique() {
                    kind |= IndexChangeKind::ChangeUnique;
                }
                let from_cols: Vec<&str> = from_idx.columns().map(|c| c.name()).collect();
                let to_cols: Vec<&str> = to_idx.columns().map(|c| c.name()).collect();
                if from_cols != to_cols {
                    kind |= IndexChangeKind::ChangeParts;
                }
                let from_comment = from_idx.attrs().iter().find(|a| matches!(a, IndexAttr::Comment(_)));
                let to_comment = to_idx.attrs().iter().find(|a| matches!(a, IndexAttr::Comment(_)));
                if from_comment != to_comment {
                    kind |= IndexChangeKind::ChangeComment;
                }
                let from_rest: Vec<&IndexAttr> = from_idx.attrs().iter().filter(|a| !matches!(a, IndexAttr::Comment(_))).collect();
                let to_rest: Vec<&IndexAttr> = to_idx.attrs().iter().filter(|a| !matches!(a, IndexAttr::Comment(_))).collect();
                if from_rest != to_rest {
                    kind |= IndexChangeKind::ChangeAttr;
                }
                if !kind.is_empty() {
                    changes.push(Change::ModifyIndex {
                        schema: schema.to_string(),
                        table: table.to_string(),
                        index: to_idx.name().to_string(),
                        changes: kind,
                    });
                }
            }
            (None, None) => {}
        }
    }
}

/// Diffs the foreign keys of one matched table pair, returning
/// (drops, adds, modifies) separately so the caller can place drops
/// before any table drop and adds/modifies after every table create.
fn diff_foreign_keys(from: TableWalker<'_>, to: TableWalker<'_>) -> (Vec<Change>, Vec<Change>, Vec<Change>) {
    let schema = to.schema_name().to_string();
    let table = to.name().to_string();

    let from_fks: Vec<(&str, ForeignKeyWalker<'_>)> =
        from.foreign_keys().map(|fk| (fk.constraint_name().unwrap_or(""), fk)).collect();
    let to_fks: Vec<(&str, ForeignKeyWalker<'_>)> =
        to.foreign_keys().map(|fk| (fk.constraint_name().unwrap_or(""), fk)).collect();

    let mut drops = Vec::new();
    let mut adds = Vec::new();
    let mut modifies = Vec::new();

    for pair in pair_by_name(&from_fks, &to_fks) {
        match pair.into_tuple() {
            (Some(from_fk), None) => drops.push(Change::DropForeignKey {
                schema: schema.clone(),
                table: table.clone(),
                constraint: from_fk.constraint_name().unwrap_or("").to_string(),
            }),
            (None, Some(to_fk)) => adds.push(Change::AddForeignKey {
                schema: schema.clone(),
                table: table.clone(),
                constraint: to_fk.constraint_name().unwrap_or("").to_string(),
                detached: false,
            }),
            (Some(from_fk), Some(to_fk)) => {
                let mut kind = ForeignKeyChanges::empty();
                if !from_fk.on_delete_action().normalized_eq(to_fk.on_delete_action()) {
                    kind |= ForeignKeyChangeKind::ChangeDeleteAction;
                }
                if !from_fk.on_update_action().normalized_eq(to_fk.on_update_action()) {
                    kind |= ForeignKeyChangeKind::ChangeUpdateAction;
                }
                if from_fk.referenced_table_name() != to_fk.referenced_table_name() {
                    kind |= ForeignKeyChangeKind::ChangeRefTable;
                }
                let from_cols: Vec<&str> = from_fk.constrained_columns().map(|c| c.name()).collect();
                let to_cols: Vec<&str> = to_fk.constrained_columns().map(|c| c.name()).collect();
                if from_cols != to_cols {
                    kind |= ForeignKeyChangeKind::ChangeColumn;
                }
                let from_ref_cols: Vec<&str> = from_fk.referenced_column_names().collect();
                let to_ref_cols: Vec<&str> = to_fk.referenced_column_names().collect();
                if from_ref_cols != to_ref_cols {
                    kind |= ForeignKeyChangeKind::ChangeRefColumn;
                }
                if !kind.is_empty() {
                    modifies.push(Change::ModifyForeignKey {
                        schema: schema.clone(),
                        table: table.clone(),
                        constraint: to_fk.constraint_name().unwrap_or("").to_string(),
                        changes: kind,
                    });
                }
            }
            (None, None) => {}
        }
    }

    (drops, adds, modifies)
}

fn diff_enums(previous: &SqlSchema, next: &SqlSchema, changes: &mut Vec<Change>) {
    let previous_enums: Vec<(&str, &sql_schema_describer::EnumType)> =
        previous.enums.iter().map(|e| (e.name.as_str(), e)).collect();
    let next_enums: Vec<(&str, &sql_schema_describer::EnumType)> = next.enums.iter().map(|e| (e.name.as_str(), e)).collect();

    for pair in pair_by_name(&previous_enums, &next_enums) {
        match pair.into_tuple() {
            (Some(from_enum), None) => changes.push(Change::DropEnum {
                schema: previous.schemas[from_enum.schema_id.index()].name.clone(),
                name: from_enum.name.clone(),
            }),
            (None, Some(to_enum)) => changes.push(Change::CreateEnum {
                schema: next.schemas[to_enum.schema_id.index()].name.clone(),
                name: to_enum.name.clone(),
                values: to_enum.values.clone(),
            }),
            (Some(from_enum), Some(to_enum)) if from_enum.values != to_enum.values => {
                // Value removal is rejected at plan time (invariant 5);
                // the differ only ever emits additions, in file order.
                for value in to_enum.values.iter().filter(|v| !from_enum.values.contains(v)) {
                    changes.push(Change::AddEnumValue {
                        schema: next.schemas[to_enum.schema_id.index()].name.clone(),
                        name: to_enum.name.clone(),
                        value: value.clone(),
                    });
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sql_schema_describer::{ColumnArity, ColumnAttr, ColumnType, ColumnTypeFamily};

    fn int_type() -> ColumnType {
        ColumnType {
            full_data_type: "bigint".into(),
            family: ColumnTypeFamily::BigInt,
            arity: ColumnArity::Required,
        }
    }

    #[test]
    fn adding_a_table_produces_create_then_columns_then_pk() {
        let previous = SqlSchema::default();

        let mut next = SqlSchema::default();
        let schema_id = next.push_schema("");
        let table = next.push_table(schema_id, "users");
        let id_col = next.push_column(table, "id", int_type());
        next.push_primary_key(table, "users_pkey", vec![id_col]);

        let changes = diff_schemas(&previous, &next);
        assert!(matches!(&changes[0], Change::AddTable { table, .. } if table == "users"));
        assert!(matches!(&changes[1], Change::AddColumn { column, .. } if column == "id"));
        assert!(matches!(&changes[2], Change::AddPrimaryKey { .. }));
    }

    #[test]
    fn dropping_a_referenced_table_drops_the_foreign_key_first() {
        let mut previous = SqlSchema::default();
        let schema_id = previous.push_schema("public");
        let parent = previous.push_table(schema_id, "users");
        let parent_col = previous.push_column(parent, "id", int_type());
        previous.push_primary_key(parent, "users_pkey", vec![parent_col]);
        let child = previous.push_table(schema_id, "posts");
        let fk_col = previous.push_column(child, "user_id", int_type());
        previous.push_foreign_key(
            child,
            vec![fk_col],
            sql_schema_describer::TableRef::Resolved(parent),
            vec![sql_schema_describer::ColumnRef::Resolved(parent_col)],
        );

        let mut next = previous.clone();
        next.tables.retain(|t| t.name != "users");
        next.foreign_keys.clear();
        next.columns.retain(|c| c.table_id == child);
        next.indexes.retain(|i| i.table_id == child);

        let changes = diff_schemas(&previous, &next);
        let drop_fk_pos = changes.iter().position(|c| matches!(c, Change::DropForeignKey { .. }));
        let drop_table_pos = changes
            .iter()
            .position(|c| matches!(c, Change::DropTable { table, .. } if table == "users"));
        assert!(drop_fk_pos.unwrap() < drop_table_pos.unwrap());
    }

    #[test]
    fn enum_value_append_is_detected() {
        let mut previous = SqlSchema::default();
        let schema_id = previous.push_schema("public");
        previous.push_enum(schema_id, "state", vec!["on".into(), "off".into()]);

        let mut next = SqlSchema::default();
        let schema_id = next.push_schema("public");
        next.push_enum(schema_id, "state", vec!["on".into(), "off".into(), "unknown".into()]);

        let changes = diff_schemas(&previous, &next);
        assert_eq!(
            changes,
            vec![Change::AddEnumValue {
                schema: "public".into(),
                name: "state".into(),
                value: "unknown".into(),
            }]
        );
    }

    #[test]
    fn unchanged_schemas_produce_no_changes() {
        let mut schema = SqlSchema::default();
        let schema_id = schema.push_schema("public");
        let table = schema.push_table(schema_id, "t1");
        schema.push_column(table, "a", int_type());

        assert!(diff_schemas(&schema, &schema).is_empty());
    }

    #[test]
    fn mutual_foreign_keys_between_two_new_tables_are_detached() {
        let previous = SqlSchema::default();

        let mut next = SqlSchema::default();
        let schema_id = next.push_schema("public");
        let a = next.push_table(schema_id, "a");
        let a_id = next.push_column(a, "id", int_type());
        next.push_primary_key(a, "a_pkey", vec![a_id]);
        let a_b_id = next.push_column(a, "b_id", int_type());

        let b = next.push_table(schema_id, "b");
        let b_id = next.push_column(b, "id", int_type());
        next.push_primary_key(b, "b_pkey", vec![b_id]);
        let b_a_id = next.push_column(b, "a_id", int_type());

        next.push_foreign_key(
            a,
            vec![a_b_id],
            sql_schema_describer::TableRef::Resolved(b),
            vec![sql_schema_describer::ColumnRef::Resolved(b_id)],
        );
        next.push_foreign_key(
            b,
            vec![b_a_id],
            sql_schema_describer::TableRef::Resolved(a),
            vec![sql_schema_describer::ColumnRef::Resolved(a_id)],
        );

        let changes = diff_schemas(&previous, &next);
        let detached_count = changes
            .iter()
            .filter(|c| matches!(c, Change::AddForeignKey { detached: true, .. }))
            .count();
        assert_eq!(detached_count, 1, "exactly one edge of the two-table cycle must be detached");
    }

    #[test]
    fn adding_and_dropping_schemas_is_detected() {
        let mut previous = SqlSchema::default();
        previous.push_schema("old_tenant");

        let mut next = SqlSchema::default();
        next.push_schema("new_tenant");

        let changes = diff_schemas(&previous, &next);
        assert!(changes.contains(&Change::AddSchema { name: "new_tenant".into() }));
        assert!(changes.contains(&Change::DropSchema { name: "old_tenant".into() }));
    }

    #[test]
    fn adding_a_check_constraint_is_detected() {
        let mut previous = SqlSchema::default();
        let schema_id = previous.push_schema("public");
        previous.push_table(schema_id, "t1");

        let mut next = previous.clone();
        let table = next.tables.iter().position(|t| t.name == "t1").map(|i| TableId(i as u32)).unwrap();
        next.push_check(table, Some("age_nonneg".into()), "age >= 0");

        let changes = diff_schemas(&previous, &next);
        assert!(changes.contains(&Change::AddCheck {
            schema: "public".into(),
            table: "t1".into(),
            name: "age_nonneg".into(),
        }));
    }

    #[test]
    fn changing_a_check_expression_emits_modify_check() {
        let mut previous = SqlSchema::default();
        let schema_id = previous.push_schema("public");
        let table = previous.push_table(schema_id, "t1");
        previous.push_check(table, Some("age_nonneg".into()), "age >= 0");

        let mut next = previous.clone();
        next.checks[0].expression = "age >= 18".into();

        let changes = diff_schemas(&previous, &next);
        assert!(changes.contains(&Change::ModifyCheck {
            schema: "public".into(),
            table: "t1".into(),
            name: "age_nonneg".into(),
        }));
    }

    #[test]
    fn column_comment_change_sets_change_comment_flag() {
        let mut previous = SqlSchema::default();
        let schema_id = previous.push_schema("public");
        let table = previous.push_table(schema_id, "t1");
        let col = previous.push_column(table, "a", int_type());
        previous.columns[col.index()].attrs.push(ColumnAttr::Comment("old".into()));

        let mut next = previous.clone();
        next.columns[col.index()].attrs = vec![ColumnAttr::Comment("new".into())];

        let changes = diff_schemas(&previous, &next);
        assert!(matches!(
            &changes[0],
            Change::ModifyColumn { changes, .. } if changes.contains(ColumnChangeKind::ChangeComment)
        ));
    }

    #[test]
    fn generated_storage_class_change_sets_change_generated_flag() {
        use sql_schema_describer::GeneratedStorage;

        let mut previous = SqlSchema::default();
        let schema_id = previous.push_schema("public");
        let table = previous.push_table(schema_id, "t1");
        let col = previous.push_column(table, "full_name", int_type());
        previous.columns[col.index()].attrs.push(ColumnAttr::GeneratedExpr {
            expression: "first || ' ' || last".into(),
            storage: GeneratedStorage::Virtual,
        });

        let mut next = previous.clone();
        next.columns[col.index()].attrs = vec![ColumnAttr::GeneratedExpr {
            expression: "first || ' ' || last".into(),
            storage: GeneratedStorage::Stored,
        }];

        let changes = diff_schemas(&previous, &next);
        assert!(matches!(
            &changes[0],
            Change::ModifyColumn { changes, .. } if changes.contains(ColumnChangeKind::ChangeGenerated)
        ));
    }

    #[test]
    fn foreign_key_column_list_change_sets_change_column_flag() {
        let mut previous = SqlSchema::default();
        let schema_id = previous.push_schema("public");
        let parent = previous.push_table(schema_id, "users");
        let parent_id = previous.push_column(parent, "id", int_type());
        previous.push_primary_key(parent, "users_pkey", vec![parent_id]);
        let child = previous.push_table(schema_id, "posts");
        let fk_col_a = previous.push_column(child, "author_id", int_type());
        let fk_col_b = previous.push_column(child, "owner_id", int_type());
        previous.push_foreign_key(
            child,
            vec![fk_col_a],
            sql_schema_describer::TableRef::Resolved(parent),
            vec![sql_schema_describer::ColumnRef::Resolved(parent_id)],
        );
        previous.foreign_keys[0].constraint_name = Some("posts_fk".into());

        let mut next = previous.clone();
        next.foreign_keys[0].constrained_columns = vec![fk_col_b];

        let changes = diff_schemas(&previous, &next);
        assert!(changes.iter().any(
            |c| matches!(c, Change::ModifyForeignKey { changes, .. } if changes.contains(ForeignKeyChangeKind::ChangeColumn))
        ));
    }
}
