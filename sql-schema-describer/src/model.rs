//! The in-memory schema model (component A). A passive aggregate: entities
//! are appended through the `push_*` builders, which enforce the back-
//! reference and uniqueness invariants; nothing here diffs or plans.

use crate::ids::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Realm {
    pub charset: Option<String>,
    pub collation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub schema_id: SchemaId,
    pub name: String,
    pub partition: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnArity {
    Required,
    Nullable,
    List,
}

impl ColumnArity {
    pub fn is_nullable(self) -> bool {
        matches!(self, ColumnArity::Nullable)
    }

    pub fn is_required(self) -> bool {
        matches!(self, ColumnArity::Required)
    }
}

/// Semantic family of a column's type, used by the differ to decide
/// castability independent of the two dialects' raw spellings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnTypeFamily {
    Int,
    BigInt,
    Float,
    Decimal,
    Boolean,
    String,
    DateTime,
    Binary,
    Json,
    Uuid,
    Enum(String),
    Unsupported(String),
}

/// A column's type: the dialect's raw spelling is authoritative; `family` and `arity` are derived by inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnType {
    pub full_data_type: String,
    pub family: ColumnTypeFamily,
    pub arity: ColumnArity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
    Value(String),
    Expression(String),
    Now,
    Sequence(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneratedStorage {
    Virtual,
    Stored,
}

/// An entity's heterogeneous, order-preserving attribute list. Lookup is always by kind via [`Column::attr`], never by
/// position; unrecognized attrs round-trip unchanged because the differ
/// and planner both treat unknown variants as opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnAttr {
    AutoIncrement,
    OnUpdate(String),
    GeneratedExpr { expression: String, storage: GeneratedStorage },
    Identity { start: i64, increment: i64, last: Option<i64> },
    Comment(String),
    Charset(String),
    Collation(String),
}

impl ColumnAttr {
    pub fn kind(&self) -> &'static str {
        match self {
            ColumnAttr::AutoIncrement => "auto_increment",
            ColumnAttr::OnUpdate(_) => "on_update",
            ColumnAttr::GeneratedExpr { .. } => "generated",
            ColumnAttr::Identity { .. } => "identity",
            ColumnAttr::Comment(_) => "comment",
            ColumnAttr::Charset(_) => "charset",
            ColumnAttr::Collation(_) => "collation",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub table_id: TableId,
    pub name: String,
    pub tpe: ColumnType,
    pub default: Option<DefaultValue>,
    pub attrs: Vec<ColumnAttr>,
}

impl Column {
    pub fn attr(&self, kind: &str) -> Option<&ColumnAttr> {
        self.attrs.iter().find(|a| a.kind() == kind)
    }

    pub fn is_autoincrement(&self) -> bool {
        self.attrs.iter().any(|a| matches!(a, ColumnAttr::AutoIncrement))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexType {
    BTree,
    Hash,
    Brin,
    Gin,
    Gist,
    FullText,
    Spatial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexAttr {
    IndexType(IndexType),
    Predicate(String),
    Include(Vec<ColumnId>),
    StorageParam(String, String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexPartTarget {
    Column(ColumnId),
    Expression(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPart {
    pub target: IndexPartTarget,
    pub descending: bool,
    pub sub_part_length: Option<u32>,
    pub operator_class: Option<String>,
}

impl IndexPart {
    pub fn column(column_id: ColumnId) -> Self {
        IndexPart {
            target: IndexPartTarget::Column(column_id),
            descending: false,
            sub_part_length: None,
            operator_class: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    pub table_id: TableId,
    pub name: String,
    pub is_unique: bool,
    pub is_primary_key: bool,
    pub parts: Vec<IndexPart>,
    pub attrs: Vec<IndexAttr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForeignKeyAction {
    NoAction,
    Restrict,
    SetNull,
    SetDefault,
    Cascade,
}

impl ForeignKeyAction {
    /// Empty and `NO ACTION` compare equal for differ purposes.
    pub fn normalized_eq(self, other: Self) -> bool {
        self == other
    }
}

/// A foreign key's referenced table, which may point outside the
/// inspected schema set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableRef {
    Resolved(TableId),
    External(String),
}

/// A single referenced column. Created as a `Stub` during the inspector's
/// first pass, resolved to `Resolved` once the owning table is known
///.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnRef {
    Resolved(ColumnId),
    Stub(String),
}

impl ColumnRef {
    pub fn name<'a>(&'a self, schema: &'a SqlSchema) -> &'a str {
        match self {
            ColumnRef::Resolved(id) => &schema.columns[id.index()].name,
            ColumnRef::Stub(name) => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    pub table_id: TableId,
    pub constraint_name: Option<String>,
    pub constrained_columns: Vec<ColumnId>,
    pub referenced_table: TableRef,
    pub referenced_columns: Vec<ColumnRef>,
    pub on_delete_action: ForeignKeyAction,
    pub on_update_action: ForeignKeyAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Check {
    pub table_id: TableId,
    pub name: Option<String>,
    pub expression: String,
    pub enforced: bool,
    pub no_inherit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumType {
    pub schema_id: SchemaId,
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sequence {
    pub schema_id: SchemaId,
    pub name: String,
    pub start: i64,
    pub increment: i64,
    pub owned_by: Option<(TableId, ColumnId)>,
}

/// The realm-rooted arena: every entity lives in a flat `Vec` here and is
/// addressed by id. Mutated only through the `push_*`/`set_*` builders,
/// which is what keeps the model's invariants (unique PK per table, back-refs
/// always pointing at an entity that exists) from being violated by
/// construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SqlSchema {
    pub realm: Realm,
    pub schemas: Vec<Schema>,
    pub tables: Vec<Table>,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
    pub checks: Vec<Check>,
    pub enums: Vec<EnumType>,
    pub sequences: Vec<Sequence>,
}

impl SqlSchema {
    pub fn push_schema(&mut self, name: impl Into<String>) -> SchemaId {
        let id = SchemaId(self.schemas.len() as u32);
        self.schemas.push(Schema { name: name.into() });
        id
    }

    pub fn push_table(&mut self, schema_id: SchemaId, name: impl Into<String>) -> TableId {
        let id = TableId(self.tables.len() as u32);
        self.tables.push(Table {
            schema_id,
            name: name.into(),
            partition: None,
            comment: None,
        });
        id
    }

    pub fn push_column(&mut self, table_id: TableId, name: impl Into<String>, tpe: ColumnType) -> ColumnId {
        let id = ColumnId(self.columns.len() as u32);
        self.columns.push(Column {
            table_id,
            name: name.into(),
            tpe,
            default: None,
            attrs: Vec::new(),
        });
        id
    }

    /// Adds a primary key to `table_id`. Panics if the table already has
    /// one — callers (the Inspector, or a surface parser) must not violate
    /// invariant 2 ("a Table has at most one PrimaryKey").
    pub fn push_primary_key(&mut self, table_id: TableId, name: impl Into<String>, columns: Vec<ColumnId>) -> IndexId {
        assert!(
            !self.indexes.iter().any(|i| i.table_id == table_id && i.is_primary_key),
            "table already has a primary key"
        );
        let id = IndexId(self.indexes.len() as u32);
        self.indexes.push(Index {
            table_id,
            name: name.into(),
            is_unique: true,
            is_primary_key: true,
            parts: columns.into_iter().map(IndexPart::column).collect(),
            attrs: Vec::new(),
        });
        id
    }

    pub fn push_index(&mut self, table_id: TableId, name: impl Into<String>, is_unique: bool, parts: Vec<IndexPart>) -> IndexId {
        let id = IndexId(self.indexes.len() as u32);
        self.indexes.push(Index {
            table_id,
            name: name.into(),
            is_unique,
            is_primary_key: false,
            parts,
            attrs: Vec::new(),
        });
        id
    }

    pub fn push_foreign_key(
        &mut self,
        table_id: TableId,
        constrained_columns: Vec<ColumnId>,
        referenced_table: TableRef,
        referenced_columns: Vec<ColumnRef>,
    ) -> ForeignKeyId {
        assert_eq!(
            constrained_columns.len(),
            referenced_columns.len(),
            "foreign key column lists must have equal length (invariant 3)"
        );
        assert!(!constrained_columns.is_empty(), "foreign key must constrain at least one column");
        let id = ForeignKeyId(self.foreign_keys.len() as u32);
        self.foreign_keys.push(ForeignKey {
            table_id,
            constraint_name: None,
            constrained_columns,
            referenced_table,
            referenced_columns,
            on_delete_action: ForeignKeyAction::NoAction,
            on_update_action: ForeignKeyAction::NoAction,
        });
        id
    }

    pub fn push_check(&mut self, table_id: TableId, name: Option<String>, expression: impl Into<String>) -> CheckId {
        let id = CheckId(self.checks.len() as u32);
        self.checks.push(Check {
            table_id,
            name,
            expression: expression.into(),
            enforced: true,
            no_inherit: false,
        });
        id
    }

    pub fn push_enum(&mut self, schema_id: SchemaId, name: impl Into<String>, values: Vec<String>) -> EnumId {
        assert!(!values.is_empty(), "enum values must be non-empty (invariant 5)");
        let id = EnumId(self.enums.len() as u32);
        self.enums.push(EnumType {
            schema_id,
            name: name.into(),
            values,
        });
        id
    }

    pub fn push_sequence(&mut self, schema_id: SchemaId, name: impl Into<String>) -> SequenceId {
        let id = SequenceId(self.sequences.len() as u32);
        self.sequences.push(Sequence {
            schema_id,
            name: name.into(),
            start: 1,
            increment: 1,
            owned_by: None,
        });
        id
    }

    pub fn table_by_name(&self, schema_id: SchemaId, name: &str) -> Option<TableId> {
        self.tables
            .iter()
            .position(|t| t.schema_id == schema_id && t.name == name)
            .map(|i| TableId(i as u32))
    }

    pub fn schema_by_name(&self, name: &str) -> Option<SchemaId> {
        self.schemas.iter().position(|s| s.name == name).map(|i| SchemaId(i as u32))
    }

    /// Resolves every foreign key's stub [`ColumnRef`]s against the tables
    /// present in this schema, by `(schema, table, name)`. Foreign keys
    /// whose referenced table cannot be found are left referencing an
    /// external table and are not an error.
    pub fn resolve_foreign_key_stubs(&mut self) {
        let column_by_table_and_name: HashMap<(TableId, String), ColumnId> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| ((c.table_id, c.name.clone()), ColumnId(i as u32)))
            .collect();

        for fk_idx in 0..self.foreign_keys.len() {
            let table_id = match self.foreign_keys[fk_idx].referenced_table {
                TableRef::Resolved(id) => id,
                TableRef::External(_) => continue,
            };
            for col_ref in self.foreign_keys[fk_idx].referenced_columns.iter_mut() {
                if let ColumnRef::Stub(name) = col_ref {
                    if let Some(&resolved) = column_by_table_and_name.get(&(table_id, name.clone())) {
                        *col_ref = ColumnRef::Resolved(resolved);
                    }
                }
            }
        }
    }

    /// Appends another schema's entities into this one, rebasing every id
    /// that crosses the boundary. Used by the realm-wide describers to
    /// fold several per-schema `describe_schema` calls into one realm
    ///.
    pub fn merge_from(&mut self, described: SqlSchema) {
        let schema_offset = self.schemas.len() as u32;
        let table_offset = self.tables.len() as u32;
        let column_offset = self.columns.len() as u32;

        self.schemas.extend(described.schemas);
        self.tables.extend(described.tables.into_iter().map(|mut t| {
            t.schema_id = SchemaId(t.schema_id.0 + schema_offset);
            t
        }));
        self.columns.extend(described.columns.into_iter().map(|mut c| {
            c.table_id = TableId(c.table_id.0 + table_offset);
            c
        }));
        self.indexes.extend(described.indexes.into_iter().map(|mut i| {
            i.table_id = TableId(i.table_id.0 + table_offset);
            for part in i.parts.iter_mut() {
                if let IndexPartTarget::Column(id) = &mut part.target {
                    *id = ColumnId(id.0 + column_offset);
                }
            }
            i
        }));
        self.foreign_keys.extend(described.foreign_keys.into_iter().map(|mut fk| {
            fk.table_id = TableId(fk.table_id.0 + table_offset);
            fk.constrained_columns = fk.constrained_columns.into_iter().map(|id| ColumnId(id.0 + column_offset)).collect();
            if let TableRef::Resolved(id) = &mut fk.referenced_table {
                *id = TableId(id.0 + table_offset);
            }
            fk
        }));
        self.checks.extend(described.checks.into_iter().map(|mut c| {
            c.table_id = TableId(c.table_id.0 + table_offset);
            c
        }));
        self.enums.extend(described.enums.into_iter().map(|mut e| {
            e.schema_id = SchemaId(e.schema_id.0 + schema_offset);
            e
        }));
        self.sequences.extend(described.sequences.into_iter().map(|mut s| {
            s.schema_id = SchemaId(s.schema_id.0 + schema_offset);
            s.owned_by = s.owned_by.map(|(t, c)| (TableId(t.0 + table_offset), ColumnId(c.0 + column_offset)));
            s
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_type() -> ColumnType {
        ColumnType {
            full_data_type: "int".into(),
            family: ColumnTypeFamily::Int,
            arity: ColumnArity::Required,
        }
    }

    #[test]
    fn push_primary_key_twice_panics() {
        let mut schema = SqlSchema::default();
        let schema_id = schema.push_schema("public");
        let table_id = schema.push_table(schema_id, "t1");
        let col = schema.push_column(table_id, "id", int_type());
        schema.push_primary_key(table_id, "t1_pkey", vec![col]);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut schema = schema.clone();
            schema.push_primary_key(table_id, "t1_pkey2", vec![col]);
        }));
        assert!(result.is_err());
    }

    #[test]
    fn foreign_key_stub_resolves_to_column_id() {
        let mut schema = SqlSchema::default();
        let schema_id = schema.push_schema("public");
        let parent = schema.push_table(schema_id, "users");
        let parent_id_col = schema.push_column(parent, "id", int_type());
        schema.push_primary_key(parent, "users_pkey", vec![parent_id_col]);

        let child = schema.push_table(schema_id, "posts");
        let fk_col = schema.push_column(child, "user_id", int_type());

        schema.push_foreign_key(
            child,
            vec![fk_col],
            TableRef::Resolved(parent),
            vec![ColumnRef::Stub("id".into())],
        );

        schema.resolve_foreign_key_stubs();
        assert_eq!(
            schema.foreign_keys[0].referenced_columns[0],
            ColumnRef::Resolved(parent_id_col)
        );
    }

    #[test]
    fn external_foreign_key_stub_is_left_unresolved() {
        let mut schema = SqlSchema::default();
        let schema_id = schema.push_schema("public");
        let child = schema.push_table(schema_id, "posts");
        let fk_col = schema.push_column(child, "owner_id", int_type());

        schema.push_foreign_key(
            child,
            vec![fk_col],
            TableRef::External("other_service.owners".into()),
            vec![ColumnRef::Stub("id".into())],
        );

        schema.resolve_foreign_key_stubs();
        assert_eq!(
            schema.foreign_keys[0].referenced_columns[0],
            ColumnRef::Stub("id".into())
        );
    }
}
