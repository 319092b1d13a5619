//! SQLite inspector. SQLite has no real schema namespace (everything
//! lives in `main`/an attached database) and exposes its catalog through
//! pragmas rather than `information_schema`, so this describer issues
//! `PRAGMA table_list`/`table_info`/`foreign_key_list`/`index_list`
//! instead of the two-pass `information_schema` queries the other
//! dialects use.

use crate::describer::{InspectOptions, SchemaDescriber};
use crate::model::*;
use async_trait::async_trait;
use schema_connector::{CancellationToken, ConnectorResult, Executor};
use std::collections::HashMap;

pub struct SqliteDescriber;

impl SqliteDescriber {
    pub fn new() -> Self {
        SqliteDescriber
    }

    fn column_type(&self, declared_type: &str) -> ColumnType {
        let upper = declared_type.to_ascii_uppercase();
        let family = if upper.contains("INT") {
            ColumnTypeFamily::Int
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            ColumnTypeFamily::String
        } else if upper.contains("BLOB") || upper.is_empty() {
            ColumnTypeFamily::Binary
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            ColumnTypeFamily::Float
        } else if upper.contains("BOOL") {
            ColumnTypeFamily::Boolean
        } else if upper.contains("DATE") || upper.contains("TIME") {
            ColumnTypeFamily::DateTime
        } else if upper.contains("DECIMAL") || upper.contains("NUMERIC") {
            ColumnTypeFamily::Decimal
        } else {
            ColumnTypeFamily::Unsupported(declared_type.to_string())
        };

        ColumnType {
            full_data_type: declared_type.to_string(),
            family,
            arity: ColumnArity::Required,
        }
    }
}

impl Default for SqliteDescriber {
    fn default() -> Self {
        Self::new()
    }
}

/// SQLite names its single built-in namespace `main`; attached databases
/// get their own names, but an `ATTACH`-based multi-schema setup is
/// exceptional enough that `InspectOptions.schemas` is normally left
/// empty and this constant used as the sole schema.
pub const MAIN_SCHEMA: &str = "main";

#[async_trait]
impl SchemaDescriber for SqliteDescriber {
    async fn list_schema_names(&self, _executor: &dyn Executor, _token: &CancellationToken) -> ConnectorResult<Vec<String>> {
        Ok(vec![MAIN_SCHEMA.to_string()])
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
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                token,
            )
            .await?;

        let mut table_ids = HashMap::new();
        for row in &tables_rs.rows {
            let name = row.text(0).unwrap_or_default();
            if name.is_empty() || options.is_excluded(name) {
                continue;
            }
            let table_id = schema.push_table(schema_id, name);
            table_ids.insert(name.to_string(), table_id);
        }

        for (table_name, &table_id) in table_ids.clone().iter() {
            token.check()?;
            let cols_rs = executor
                .query(&format!("PRAGMA table_info('{table_name}')"), token)
                .await?;

            // columns: cid, name, type, notnull, dflt_value, pk
            let mut pk_columns: Vec<(i64, ColumnId)> = Vec::new();
            for row in &cols_rs.rows {
                let name = row.text(1).unwrap_or_default();
                let declared_type = row.text(2).unwrap_or_default();
                let not_null = row.boolean(3).unwrap_or(false);
                let default_expr = row.text(4);
                let pk_ordinal = row.int(5).unwrap_or(0);

                let mut tpe = self.column_type(declared_type);
                tpe.arity = if not_null { ColumnArity::Required } else { ColumnArity::Nullable };

                let column_id = schema.push_column(table_id, name, tpe);
                if let Some(default_expr) = default_expr {
                    schema.columns[column_id.index()].default = Some(DefaultValue::Expression(default_expr.to_string()));
                }
                if pk_ordinal > 0 {
                    pk_columns.push((pk_ordinal, column_id));
                }
            }

            if !pk_columns.is_empty() {
                pk_columns.sort_by_key(|(ordinal, _)| *ordinal);
                let columns = pk_columns.into_iter().map(|(_, id)| id).collect();
                schema.push_primary_key(table_id, format!("{table_name}_pkey"), columns);
            }
        }

        for (table_name, &table_id) in table_ids.iter() {
            token.check()?;
            describe_indexes(executor, &mut schema, table_name, table_id, token).await?;
            describe_foreign_keys(executor, &mut schema, schema_id, table_name, table_id, token).await?;
        }

        schema.resolve_foreign_key_stubs();
        tracing::debug!(tables = schema.tables.len(), columns = schema.columns.len(), "described sqlite schema");
        Ok(schema)
    }

    #[tracing::instrument(skip(self, executor, options, token))]
    async fn describe_realm(
        &self,
        executor: &dyn Executor,
        options: &InspectOptions,
        token: &CancellationToken,
    ) -> ConnectorResult<SqlSchema> {
        self.describe_schema(executor, MAIN_SCHEMA, options, token).await
    }
}

async fn describe_indexes(
    executor: &dyn Executor,
    schema: &mut SqlSchema,
    table_name: &str,
    table_id: crate::TableId,
    token: &CancellationToken,
) -> ConnectorResult<()> {
    let list_rs = executor
        .query(&format!("PRAGMA index_list('{table_name}')"), token)
        .await?;

    // index_list columns: seq, name, unique, origin, partial
    for row in &list_rs.rows {
        let index_name = row.text(1).unwrap_or_default().to_string();
        let is_unique = row.boolean(2).unwrap_or(false);
        let origin = row.text(3).unwrap_or_default();
        if origin == "pk" {
            // Already captured via `PRAGMA table_info`'s pk column.
            continue;
        }

        let info_rs = executor
            .query(&format!("PRAGMA index_info('{index_name}')"), token)
            .await?;
        let table = crate::walkers::Walker { schema: &*schema, id: table_id };
        let column_ids: Vec<_> = info_rs
            .rows
            .iter()
            .filter_map(|r| r.text(2))
            .filter_map(|name| table.column(name).map(|c| c.column_id()))
            .collect();
        if column_ids.is_empty() {
            continue;
        }
        let parts = column_ids.into_iter().map(IndexPart::column).collect();
        schema.push_index(table_id, index_name, is_unique, parts);
    }

    Ok(())
}

async fn describe_foreign_keys(
    executor: &dyn Executor,
    schema: &mut SqlSchema,
    schema_id: crate::SchemaId,
    table_name: &str,
    table_id: crate::TableId,
    token: &CancellationToken,
) -> ConnectorResult<()> {
    let rs = executor
        .query(&format!("PRAGMA foreign_key_list('{table_name}')"), token)
        .await?;

    // columns: id, seq, table, from, to, on_update, on_delete, match
    let mut by_id: HashMap<i64, (String, Vec<String>, Vec<String>, String, String)> = HashMap::new();
    let mut order = Vec::new();
    for row in &rs.rows {
        let id = row.int(0).unwrap_or(0);
        let ref_table = row.text(2).unwrap_or_default().to_string();
        let from_col = row.text(3).unwrap_or_default().to_string();
        let to_col = row.text(4).unwrap_or_default().to_string();
        let on_update = row.text(5).unwrap_or("NO ACTION").to_string();
        let on_delete = row.text(6).unwrap_or("NO ACTION").to_string();

        let entry = by_id.entry(id).or_insert_with(|| {
            order.push(id);
            (ref_table.clone(), Vec::new(), Vec::new(), on_update.clone(), on_delete.clone())
        });
        entry.1.push(from_col);
        entry.2.push(to_col);
    }

    for id in order {
        let (ref_table, child_cols, ref_cols, on_update, on_delete) = &by_id[&id];
        let table = crate::walkers::Walker { schema: &*schema, id: table_id };
        let constrained: Vec<_> = child_cols
            .iter()
            .filter_map(|c| table.column(c).map(|w| w.column_id()))
            .collect();
        if constrained.len() != child_cols.len() {
            continue;
        }

        let referenced_table = schema
            .table_by_name(schema_id, ref_table)
            .map(TableRef::Resolved)
            .unwrap_or_else(|| TableRef::External(ref_table.clone()));
        let referenced_columns = ref_cols.iter().map(|c| ColumnRef::Stub(c.clone())).collect();

        let fk_id = schema.push_foreign_key(table_id, constrained, referenced_table, referenced_columns);
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
    fn column_type_family_is_inferred_from_type_affinity_rules() {
        let describer = SqliteDescriber::new();
        assert!(matches!(describer.column_type("INTEGER").family, ColumnTypeFamily::Int));
        assert!(matches!(describer.column_type("VARCHAR(255)").family, ColumnTypeFamily::String));
        assert!(matches!(describer.column_type("").family, ColumnTypeFamily::Binary));
        assert!(matches!(describer.column_type("REAL").family, ColumnTypeFamily::Float));
    }

    #[test]
    fn single_schema_name_is_main() {
        assert_eq!(MAIN_SCHEMA, "main");
    }
}
