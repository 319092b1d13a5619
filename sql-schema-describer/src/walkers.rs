//! Cheap, `Copy` handles into a [`SqlSchema`](crate::SqlSchema) arena. A
//! `Walker<'a, Id>` is just `(&'a SqlSchema, Id)`; it never owns data, so
//! the differ can hold thousands of them without cloning anything.

use crate::ids::*;
use crate::model::*;
use crate::SqlSchema;

#[derive(Debug, Clone, Copy)]
pub struct Walker<'a, Id> {
    pub schema: &'a SqlSchema,
    pub id: Id,
}

impl<'a, Id: PartialEq> PartialEq for Walker<'a, Id> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema) && self.id == other.id
    }
}

pub type TableWalker<'a> = Walker<'a, TableId>;
pub type ColumnWalker<'a> = Walker<'a, ColumnId>;
pub type IndexWalker<'a> = Walker<'a, IndexId>;
pub type ForeignKeyWalker<'a> = Walker<'a, ForeignKeyId>;
pub type CheckWalker<'a> = Walker<'a, CheckId>;
pub type EnumWalker<'a> = Walker<'a, EnumId>;
pub type SequenceWalker<'a> = Walker<'a, SequenceId>;

impl<'a> TableWalker<'a> {
    pub fn table_id(&self) -> TableId {
        self.id
    }

    fn get(&self) -> &'a Table {
        &self.schema.tables[self.id.index()]
    }

    pub fn name(&self) -> &'a str {
        &self.get().name
    }

    pub fn schema_name(&self) -> &'a str {
        &self.schema.schemas[self.get().schema_id.index()].name
    }

    pub fn comment(&self) -> Option<&'a str> {
        self.get().comment.as_deref()
    }

    pub fn columns(&self) -> impl Iterator<Item = ColumnWalker<'a>> + 'a {
        let id = self.id;
        let schema = self.schema;
        schema
            .columns
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.table_id == id)
            .map(move |(i, _)| Walker { schema, id: ColumnId(i as u32) })
    }

    pub fn column(&self, name: &str) -> Option<ColumnWalker<'a>> {
        self.columns().find(|c| c.name() == name)
    }

    pub fn indexes(&self) -> impl Iterator<Item = IndexWalker<'a>> + 'a {
        let id = self.id;
        let schema = self.schema;
        schema
            .indexes
            .iter()
            .enumerate()
            .filter(move |(_, idx)| idx.table_id == id && !idx.is_primary_key)
            .map(move |(i, _)| Walker { schema, id: IndexId(i as u32) })
    }

    pub fn primary_key(&self) -> Option<IndexWalker<'a>> {
        let id = self.id;
        let schema = self.schema;
        schema
            .indexes
            .iter()
            .position(|idx| idx.table_id == id && idx.is_primary_key)
            .map(|i| Walker { schema, id: IndexId(i as u32) })
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = ForeignKeyWalker<'a>> + 'a {
        let id = self.id;
        let schema = self.schema;
        schema
            .foreign_keys
            .iter()
            .enumerate()
            .filter(move |(_, fk)| fk.table_id == id)
            .map(move |(i, _)| Walker { schema, id: ForeignKeyId(i as u32) })
    }

    pub fn checks(&self) -> impl Iterator<Item = CheckWalker<'a>> + 'a {
        let id = self.id;
        let schema = self.schema;
        schema
            .checks
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.table_id == id)
            .map(move |(i, _)| Walker { schema, id: CheckId(i as u32) })
    }
}

impl<'a> ColumnWalker<'a> {
    pub fn column_id(&self) -> ColumnId {
        self.id
    }

    fn get(&self) -> &'a Column {
        &self.schema.columns[self.id.index()]
    }

    pub fn name(&self) -> &'a str {
        &self.get().name
    }

    pub fn column_type(&self) -> &'a ColumnType {
        &self.get().tpe
    }

    pub fn arity(&self) -> ColumnArity {
        self.get().tpe.arity
    }

    pub fn default(&self) -> Option<&'a DefaultValue> {
        self.get().default.as_ref()
    }

    pub fn table(&self) -> TableWalker<'a> {
        Walker {
            schema: self.schema,
            id: self.get().table_id,
        }
    }

    pub fn is_part_of_primary_key(&self) -> bool {
        self.table()
            .primary_key()
            .map(|pk| pk.columns().any(|c| c.id == self.id))
            .unwrap_or(false)
    }

    pub fn is_autoincrement(&self) -> bool {
        self.get().is_autoincrement()
    }

    pub fn column_type_is_enum(&self, enum_name: Option<&str>) -> bool {
        match (&self.get().tpe.family, enum_name) {
            (ColumnTypeFamily::Enum(name), Some(expected)) => name == expected,
            (ColumnTypeFamily::Enum(_), None) => true,
            _ => false,
        }
    }

    pub fn attrs(&self) -> &'a [ColumnAttr] {
        &self.get().attrs
    }

    pub fn attr(&self, kind: &str) -> Option<&'a ColumnAttr> {
        self.get().attr(kind)
    }
}

impl<'a> IndexWalker<'a> {
    pub fn index(&self) -> usize {
        self.id.index()
    }

    fn get(&self) -> &'a Index {
        &self.schema.indexes[self.id.index()]
    }

    pub fn name(&self) -> &'a str {
        &self.get().name
    }

    pub fn is_unique(&self) -> bool {
        self.get().is_unique
    }

    pub fn is_primary_key(&self) -> bool {
        self.get().is_primary_key
    }

    pub fn table(&self) -> TableWalker<'a> {
        Walker {
            schema: self.schema,
            id: self.get().table_id,
        }
    }

    pub fn parts(&self) -> &'a [IndexPart] {
        &self.get().parts
    }

    pub fn attrs(&self) -> &'a [IndexAttr] {
        &self.get().attrs
    }

    pub fn columns(&self) -> impl Iterator<Item = ColumnWalker<'a>> + 'a {
        let schema = self.schema;
        self.get().parts.iter().filter_map(move |part| match part.target {
            IndexPartTarget::Column(id) => Some(Walker { schema, id }),
            IndexPartTarget::Expression(_) => None,
        })
    }
}

impl<'a> ForeignKeyWalker<'a> {
    pub fn foreign_key_index(&self) -> usize {
        self.id.index()
    }

    fn get(&self) -> &'a ForeignKey {
        &self.schema.foreign_keys[self.id.index()]
    }

    pub fn table(&self) -> TableWalker<'a> {
        Walker {
            schema: self.schema,
            id: self.get().table_id,
        }
    }

    pub fn constraint_name(&self) -> Option<&'a str> {
        self.get().constraint_name.as_deref()
    }

    pub fn constrained_columns(&self) -> impl Iterator<Item = ColumnWalker<'a>> + 'a {
        let schema = self.schema;
        self.get().constrained_columns.iter().map(move |&id| Walker { schema, id })
    }

    pub fn referenced_table(&self) -> Option<TableWalker<'a>> {
        match self.get().referenced_table {
            TableRef::Resolved(id) => Some(Walker { schema: self.schema, id }),
            TableRef::External(_) => None,
        }
    }

    pub fn referenced_table_name(&self) -> &'a str {
        match &self.get().referenced_table {
            TableRef::Resolved(id) => &self.schema.tables[id.index()].name,
            TableRef::External(name) => name,
        }
    }

    pub fn referenced_column_names(&self) -> impl Iterator<Item = &'a str> + 'a {
        let schema = self.schema;
        self.get().referenced_columns.iter().map(move |c| c.name(schema))
    }

    pub fn referenced_columns_count(&self) -> usize {
        self.get().referenced_columns.len()
    }

    pub fn on_delete_action(&self) -> ForeignKeyAction {
        self.get().on_delete_action
    }

    pub fn on_update_action(&self) -> ForeignKeyAction {
        self.get().on_update_action
    }

    pub fn references_external_table(&self) -> bool {
        matches!(self.get().referenced_table, TableRef::External(_))
    }
}

impl<'a> EnumWalker<'a> {
    fn get(&self) -> &'a EnumType {
        &self.schema.enums[self.id.index()]
    }

    pub fn name(&self) -> &'a str {
        &self.get().name
    }

    pub fn values(&self) -> &'a [String] {
        &self.get().values
    }
}

impl<'a> CheckWalker<'a> {
    fn get(&self) -> &'a Check {
        &self.schema.checks[self.id.index()]
    }

    pub fn name(&self) -> Option<&'a str> {
        self.get().name.as_deref()
    }

    pub fn expression(&self) -> &'a str {
        &self.get().expression
    }

    pub fn table(&self) -> TableWalker<'a> {
        Walker {
            schema: self.schema,
            id: self.get().table_id,
        }
    }
}

/// Extension trait that turns a schema reference into walkers without
/// importing every concrete walker type.
pub trait SqlSchemaExt {
    fn table_walker_at(&self, id: TableId) -> TableWalker<'_>;
    fn table_walker<'a>(&'a self, name: &str) -> Option<TableWalker<'a>>;
    fn table_walkers(&self) -> Box<dyn Iterator<Item = TableWalker<'_>> + '_>;
    fn enum_walkers(&self) -> Box<dyn Iterator<Item = EnumWalker<'_>> + '_>;
    fn column_at(&self, id: ColumnId) -> ColumnWalker<'_>;
}

impl SqlSchemaExt for SqlSchema {
    fn table_walker_at(&self, id: TableId) -> TableWalker<'_> {
        Walker { schema: self, id }
    }

    fn table_walker<'a>(&'a self, name: &str) -> Option<TableWalker<'a>> {
        self.tables
            .iter()
            .position(|t| t.name == name)
            .map(|i| Walker { schema: self, id: TableId(i as u32) })
    }

    fn table_walkers(&self) -> Box<dyn Iterator<Item = TableWalker<'_>> + '_> {
        Box::new((0..self.tables.len()).map(move |i| Walker { schema: self, id: TableId(i as u32) }))
    }

    fn enum_walkers(&self) -> Box<dyn Iterator<Item = EnumWalker<'_>> + '_> {
        Box::new((0..self.enums.len()).map(move |i| Walker { schema: self, id: EnumId(i as u32) }))
    }

    fn column_at(&self, id: ColumnId) -> ColumnWalker<'_> {
        Walker { schema: self, id }
    }
}
