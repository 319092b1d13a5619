//! MySQL/MariaDB inspector. Same two-pass shape as the PostgreSQL
//! describer: columns + checks first, then indexes and foreign
//! keys, with stub resolution at the end. MySQL exposes everything
//! through `information_schema`, so unlike Postgres there is no
//! `pg_catalog` fallback query for indexes.

use crate::describer::{InspectOptions, SchemaDescriber};
use crate::model::*;
use async_trait::async_trait;
use schema_connector::{CancellationToken, ConnectorError, ConnectorResult, Executor};
use std::collections::HashMap;

pub struct MysqlDescriber;

impl MysqlDescriber {
    pub fn new() -> Self {
        MysqlDescriber
    }

    fn column_type(&self, data_type: &str, column_type: &str) -> ColumnType {
        let family = match data_type.to_ascii_lowercase().as_str() {
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" => ColumnTypeFamily::Int,
            "bigint" => ColumnTypeFamily::BigInt,
            "float" | "double" => ColumnTypeFamily::Float,
            "decimal" | "numeric" => ColumnTypeFamily::Decimal,
            "bool" | "boolean" => ColumnTypeFamily::Boolean,
            "char" | "varchar" | "text" | "tinytext" | "mediumtext" | "longtext" => ColumnTypeFamily::String,
            "datetime" | "timestamp" | "date" | "time" | "year" => ColumnTypeFamily::DateTime,
            "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary" => ColumnTypeFamily::Binary,
            "json" => ColumnTypeFamily::Json,
            "enum" => ColumnTypeFamily::Enum(column_type.to_string()),
            other => ColumnTypeFamily::Unsupported(other.to_string()),
        };

        ColumnType {
            full_data_type: column_type.to_string(),
            family,
            arity: ColumnArity::Required,
        }
    }
}

impl Default for MysqlDescriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchemaDescriber for MysqlDescriber {
    async fn list_schema_names(&self, executor: &dyn Executor, token: &CancellationToken) -> ConnectorResult<Vec<String>> {
        let rows = executor
            .query(
                "SELECT schema_name FROM information_schema.schemata \
                 WHERE schema_name NOT IN ('information_schema', 'mysql', 'performance_schema', 'sys') \
                 ORDER BY schema_name",
                token,
            )
            .await?;
        Ok(rows.rows.iter().filter_map(|r| r.text(0).map(str::to_string)).collect())
    }

    #[tracing::instrument(skip(self, executor, options, token))]
    async fn describe_schema(
        &self,
        executor: &dyn Executor,
        schema_name: &str,
        options: &InspectOptions,
        token: &CancellationToken,
    ) -> ConnectorResult<SqlSchema> {
        let mut schema = SqlSchema::default();
        let schema_id = schema.push_schema(schema_name);

        let tables_rs = executor
            .query(
                &format!(
                    "SELECT table_name, table_comment FROM information_schema.tables \
                     WHERE table_schema = '{schema_name}' AND table_type = 'BASE TABLE' ORDER BY table_name"
                ),
                token,
            )
            .await?;

        let mut table_ids = HashMap::new();
        for row in &tables_rs.rows {
            let name = row.text(0).ok_or_else(|| ConnectorError::driver("missing table_name column", None))?;
            if options.is_excluded(name) {
                continue;
            }
            let table_id = schema.push_table(schema_id, name);
            if let Some(comment) = row.text(1).filter(|c| !c.is_empty()) {
                schema.tables[table_id.index()].comment = Some(comment.to_string());
            }
            table_ids.insert(name.to_string(), table_id);
        }

        for (table_name, &table_id) in table_ids.clone().iter() {
            token.check()?;
            let cols_rs = executor
                .query(
                    &format!(
                        "SELECT column_name, data_type, column_type, is_nullable, column_default, extra, \
                                column_comment, character_set_name, collation_name \
                         FROM information_schema.columns \
                         WHERE table_schema = '{schema_name}' AND table_name = '{table_name}' \
                         ORDER BY ordinal_position"
                    ),
                    token,
                )
                .await?;

            for row in &cols_rs.rows {
                let name = row.text(0).unwrap_or_default();
                let data_type = row.text(1).unwrap_or_default();
                let column_type = row.text(2).unwrap_or(data_type);
                let is_nullable = row.text(3).map(|s| s.eq_ignore_ascii_case("yes")).unwrap_or(true);
                let extra = row.text(5).unwrap_or_default().to_ascii_lowercase();

                let mut tpe = self.column_type(data_type, column_type);
                tpe.arity = if is_nullable { ColumnArity::Nullable } else { ColumnArity::Required };

                let column_id = schema.push_column(table_id, name, tpe);

                if let Some(default_expr) = row.text(4) {
                    schema.columns[column_id.index()].default = Some(DefaultValue::Expression(default_expr.to_string()));
                }
                if extra.contains("auto_increment") {
                    schema.columns[column_id.index()].attrs.push(ColumnAttr::AutoIncrement);
                }
                if extra.contains("on update") {
                    schema.columns[column_id.index()]
                        .attrs
                        .push(ColumnAttr::OnUpdate(extra.clone()));
                }
                if let Some(comment) = row.text(6).filter(|c| !c.is_empty()) {
                    schema.columns[column_id.index()]
                        .attrs
                        .push(ColumnAttr::Comment(comment.to_string()));
                }
                if let Some(charset) = row.text(7) {
                    schema.columns[column_id.index()]
                        .attrs
                        .push(ColumnAttr::Charset(charset.to_string()));
                }
                if let Some(collation) = row.text(8) {
                    schema.columns[column_id.index()]
                        .attrs
                        .push(ColumnAttr::Collation(collation.to_string()));
                }
            }
        }

        for (table_name, &table_id) in table_ids.iter() {
            token.check()?;
            describe_indexes(executor, &mut schema, schema_name, table_name, table_id, token).await?;
            describe_foreign_keys(executor, &mut schema, schema_id, schema_name, table_name, table_id, token).await?;
        }

        schema.resolve_foreign_key_stubs();
        tracing::debug!(tables = schema.tables.len(), columns = schema.columns.len(), "described mysql schema");
        Ok(schema)
    }

    #[tracing::instrument(skip(self, executor, options, token))]
    async fn describe_realm(
        &self,
        executor: &dyn Executor,
        options: &InspectOptions,
        token: &CancellationToken,
    ) -> ConnectorResult<SqlSchema> {
        let names = if options.schemas.is_empty() {
            self.list_schema_names(executor, token).await?
        } else {
            options.schemas.clone()
        };
        tracing::debug!(schema_count = names.len(), "describing mysql realm");

        let mut realm = SqlSchema::default();
        for name in names {
            if options.is_excluded(&name) {
                continue;
            }
            let described = self.describe_schema(executor, &name, options, token).await?;
            realm.merge_from(described);
        }
        realm.resolve_foreign_key_stubs();
        Ok(realm)
    }
}

async fn describe_indexes(
    executor: &dyn Executor,
    schema: &mut SqlSchema,
    schema_name: &str,
    table_name: &str,
    table_id: crate::TableId,
    token: &CancellationToken,
) -> ConnectorResult<()> {
    let rs = executor
        .query(
            &format!(
                "SELECT index_name, non_unique, column_name, index_type \
                 FROM information_schema.statistics \
                 WHERE table_schema = '{schema_name}' AND table_name = '{table_name}' \
                 ORDER BY index_name, seq_in_index"
            ),
            token,
        )
        .await?;

    let mut by_index: Vec<(String, bool, Vec<String>)> = Vec::new();
    for row in &rs.rows {
        let index_name = row.text(0).unwrap_or_default().to_string();
        let is_unique = !row.boolean(1).unwrap_or(true);
        let column_name = row.text(2).unwrap_or_default().to_string();

        match by_index.last_mut() {
            Some((name, _, cols)) if *name == index_name => cols.push(column_name),
            _ => by_index.push((index_name, is_unique, vec![column_name])),
        }
    }

    for (name, is_unique, columns) in by_index {
        let table = crate::walkers::Walker { schema: &*schema, id: table_id };
        let column_ids: Vec<_> = columns
            .iter()
            .filter_map(|col_name| table.column(col_name).map(|c| c.column_id()))
            .collect();
        if column_ids.is_empty() {
            continue;
        }
        if name.eq_ignore_ascii_case("PRIMARY") {
            schema.push_primary_key(table_id, format!("{table_name}_pkey"), column_ids);
        } else {
            let parts = column_ids.into_iter().map(IndexPart::column).collect();
            schema.push_index(table_id, name, is_unique, parts);
        }
    }

    Ok(())
}

async fn describe_foreign_keys(
    executor: &dyn Executor,
    schema: &mut SqlSchema,
    schema_id: crate::SchemaId,
    schema_name: &str,
    table_name: &str,
    table_id: crate::TableId,
    token: &CancellationToken,
) -> ConnectorResult<()> {
    let rs = executor
        .query(
            &format!(
                "SELECT kcu.constraint_name, kcu.column_name, kcu.referenced_table_schema, \
                        kcu.referenced_table_name, kcu.referenced_column_name, \
                        rc.update_rule, rc.delete_rule \
                 FROM information_schema.key_column_usage kcu \
                 JOIN information_schema.referential_constraints rc \
                   ON rc.constraint_name = kcu.constraint_name AND rc.constraint_schema = kcu.constraint_schema \
                 WHERE kcu.table_schema = '{schema_name}' AND kcu.table_name = '{table_name}' \
                 AND kcu.referenced_table_name IS NOT NULL \
                 ORDER BY kcu.constraint_name, kcu.ordinal_position"
            ),
            token,
        )
        .await?;

    let mut by_constraint: HashMap<String, (String, String, Vec<String>, Vec<String>, String, String)> = HashMap::new();
    let mut order = Vec::new();
    for row in &rs.rows {
        let constraint_name = row.text(0).unwrap_or_default().to_string();
        let child_col = row.text(1).unwrap_or_default().to_string();
        let ref_schema = row.text(2).unwrap_or_default().to_string();
        let ref_table = row.text(3).unwrap_or_default().to_string();
        let ref_col = row.text(4).unwrap_or_default().to_string();
        let on_update = row.text(5).unwrap_or("NO ACTION").to_string();
        let on_delete = row.text(6).unwrap_or("NO ACTION").to_string();

        let entry = by_constraint.entry(constraint_name.clone()).or_insert_with(|| {
            order.push(constraint_name.clone());
            (ref_schema.clone(), ref_table.clone(), Vec::new(), Vec::new(), on_update.clone(), on_delete.clone())
        });
        entry.2.push(child_col);
        entry.3.push(ref_col);
    }

    for constraint_name in order {
        let (ref_schema, ref_table, child_cols, ref_cols, on_update, on_delete) = &by_constraint[&constraint_name];
        let table = crate::walkers::Walker { schema: &*schema, id: table_id };
        let constrained: Vec<_> = child_cols
            .iter()
            .filter_map(|c| table.column(c).map(|w| w.column_id()))
            .collect();
        if constrained.len() != child_cols.len() {
            continue;
        }

        let referenced_table = if ref_schema == schema_name {
            schema
                .table_by_name(schema_id, ref_table)
                .map(TableRef::Resolved)
                .unwrap_or_else(|| TableRef::External(format!("{ref_schema}.{ref_table}")))
        } else {
            TableRef::External(format!("{ref_schema}.{ref_table}"))
        };

        let referenced_columns = ref_cols.iter().map(|c| ColumnRef::Stub(c.clone())).collect();

        let fk_id = schema.push_foreign_key(table_id, constrained, referenced_table, referenced_columns);
        schema.foreign_keys[fk_id.index()].constraint_name = Some(constraint_name);
        schema.foreign_keys[fk_id.index()].on_update_action = parse_action(on_update);
        schema.foreign_keys[fk_id.index()].on_delete_action = parse_action(on_delete);
    }

    Ok(())
}

fn parse_action(raw: &str) -> ForeignKeyAction {
    match raw.to_ascii_uppercase().as_str() {
        "CASCADE" => ForeignKeyAction::Cascade,
        "SET NULL" => ForeignKeyAction::SetNull,
        "SET DEFAULT" => ForeignKeyAction::SetDefault,
        "RESTRICT" => ForeignKeyAction::Restrict,
        _ => ForeignKeyAction::NoAction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_type_classifies_enum_with_raw_spelling() {
        let describer = MysqlDescriber::new();
        let tpe = describer.column_type("enum", "enum('a','b')");
        assert!(matches!(tpe.family, ColumnTypeFamily::Enum(raw) if raw == "enum('a','b')"));
    }

    #[test]
    fn column_type_classifies_known_families() {
        let describer = MysqlDescriber::new();
        assert!(matches!(describer.column_type("bigint", "bigint").family, ColumnTypeFamily::BigInt));
        assert!(matches!(describer.column_type("tinyint", "tinyint(1)").family, ColumnTypeFamily::Int));
    }
}
