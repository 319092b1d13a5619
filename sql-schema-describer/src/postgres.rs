//! PostgreSQL inspector. Builds tables in the two passes the contract
//! describes: columns + checks first, then indexes and foreign
//! keys (the latter initially as stubs, resolved at the end).

use crate::describer::{InspectOptions, SchemaDescriber};
use crate::model::*;
use crate::normalize;
use async_trait::async_trait;
use schema_connector::{CancellationToken, ConnectorError, ConnectorResult, Executor};
use std::collections::HashMap;

pub struct PostgresDescriber;

impl PostgresDescriber {
    pub fn new() -> Self {
        PostgresDescriber
    }

    fn column_type(&self, data_type: &str, udt_name: &str) -> ColumnType {
        let normalized = normalize::normalize_character_type(&normalize::normalize_time_type(data_type));
        let normalized = if normalized.to_ascii_lowercase().starts_with("float(") {
            normalize::normalize_float_type(&normalized)
        } else {
            normalized
        };

        let family = match data_type.to_ascii_lowercase().as_str() {
            "integer" | "smallint" => ColumnTypeFamily::Int,
            "bigint" => ColumnTypeFamily::BigInt,
            "real" | "double precision" => ColumnTypeFamily::Float,
            "numeric" | "decimal" => ColumnTypeFamily::Decimal,
            "boolean" => ColumnTypeFamily::Boolean,
            "text" | "character varying" | "character" => ColumnTypeFamily::String,
            "timestamp" | "timestamptz" | "date" | "time" => ColumnTypeFamily::DateTime,
            "bytea" => ColumnTypeFamily::Binary,
            "json" | "jsonb" => ColumnTypeFamily::Json,
            "uuid" => ColumnTypeFamily::Uuid,
            "user-defined" => ColumnTypeFamily::Enum(udt_name.to_string()),
            other => ColumnTypeFamily::Unsupported(other.to_string()),
        };

        ColumnType {
            full_data_type: normalized,
            family,
            arity: ColumnArity::Required,
        }
    }
}

impl Default for PostgresDescriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchemaDescriber for PostgresDescriber {
    async fn list_schema_names(&self, executor: &dyn Executor, token: &CancellationToken) -> ConnectorResult<Vec<String>> {
        let rows = executor
            .query(
                "SELECT schema_name FROM information_schema.schemata \
                 WHERE schema_name NOT IN ('pg_catalog', 'information_schema') ORDER BY schema_name",
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
                    "SELECT table_name FROM information_schema.tables \
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
            table_ids.insert(name.to_string(), table_id);
        }

        describe_table_comments(executor, &mut schema, schema_name, &table_ids, token).await?;

        // Pass 1: columns.
        for (table_name, &table_id) in table_ids.clone().iter() {
            token.check()?;
            let cols_rs = executor
                .query(
                    &format!(
                        "SELECT column_name, data_type, udt_name, is_nullable, column_default, \
                                collation_name, is_identity, identity_start, identity_increment, \
                                is_generated, generation_expression \
                         FROM information_schema.columns \
                         WHERE table_schema = '{schema_name}' AND table_name = '{table_name}' \
                         ORDER BY ordinal_position"
                    ),
                    token,
                )
                .await?;

            let comments = describe_column_comments(executor, schema_name, table_name, token).await?;

            for row in &cols_rs.rows {
                let name = row.text(0).unwrap_or_default();
                let data_type = row.text(1).unwrap_or_default();
                let udt_name = row.text(2).unwrap_or_default();
                let is_nullable = row.text(3).map(|s| s.eq_ignore_ascii_case("yes")).unwrap_or(true);
                let mut tpe = self.column_type(data_type, udt_name);
                tpe.arity = if is_nullable { ColumnArity::Nullable } else { ColumnArity::Required };

                let column_id = schema.push_column(table_id, name, tpe);

                if let Some(default_expr) = row.text(4) {
                    if let Some(seq_name) = normalize::split_serial_default(default_expr) {
                        schema.columns[column_id.index()].default = Some(DefaultValue::Sequence(seq_name));
                    } else if default_expr.eq_ignore_ascii_case("now()") {
                        schema.columns[column_id.index()].default = Some(DefaultValue::Now);
                    } else if !normalize::is_unparseable_currency_default(default_expr) {
                        let col_type = &schema.columns[column_id.index()].tpe.full_data_type;
                        let stripped = normalize::strip_matching_typecast(default_expr, col_type);
                        schema.columns[column_id.index()].default = Some(DefaultValue::Expression(stripped.to_string()));
                    }
                }

                if let Some(collation) = row.text(5) {
                    schema.columns[column_id.index()].attrs.push(ColumnAttr::Collation(collation.to_string()));
                }

                if row.text(6).map(|s| s.eq_ignore_ascii_case("yes")).unwrap_or(false) {
                    let start: i64 = row.text(7).and_then(|s| s.parse().ok()).unwrap_or(1);
                    let increment: i64 = row.text(8).and_then(|s| s.parse().ok()).unwrap_or(1);
                    let (start, increment) = if normalize::should_elide_identity_default(start, increment) {
                        (1, 1)
                    } else {
                        (start, increment)
                    };
                    schema.columns[column_id.index()].attrs.push(ColumnAttr::Identity { start, increment, last: None });
                }

                if row.text(9).map(|s| s.eq_ignore_ascii_case("always")).unwrap_or(false) {
                    if let Some(expr) = row.text(10) {
                        schema.columns[column_id.index()].attrs.push(ColumnAttr::GeneratedExpr {
                            expression: expr.to_string(),
                            storage: GeneratedStorage::Stored,
                        });
                    }
                }

                if let Some(comment) = comments.get(name) {
                    schema.columns[column_id.index()].attrs.push(ColumnAttr::Comment(comment.clone()));
                }
            }
        }

        // Pass 2: indexes (including the primary key) and foreign keys.
        for (table_name, &table_id) in table_ids.iter() {
            token.check()?;
            describe_indexes(executor, &mut schema, schema_name, table_name, table_id, token).await?;
            describe_foreign_keys(executor, &mut schema, schema_id, schema_name, table_name, table_id, token).await?;
        }

        describe_enums(executor, &mut schema, schema_id, schema_name, token).await?;

        schema.resolve_foreign_key_stubs();
        tracing::debug!(tables = schema.tables.len(), columns = schema.columns.len(), "described postgres schema");
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
        tracing::debug!(schema_count = names.len(), "describing postgres realm");

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

/// Table comments live in `pg_description`, keyed by the table's OID, not
/// in `information_schema` — fetched once per schema and matched back onto
/// the already-created tables by name.
async fn describe_table_comments(
    executor: &dyn Executor,
    schema: &mut SqlSchema,
    schema_name: &str,
    table_ids: &HashMap<String, crate::TableId>,
    token: &CancellationToken,
) -> ConnectorResult<()> {
    let rs = executor
        .query(
            &format!(
                "SELECT c.relname, obj_description(c.oid, 'pg_class') \
                 FROM pg_class c JOIN pg_namespace n ON n.oid = c.relnamespace \
                 WHERE n.nspname = '{schema_name}' AND c.relkind = 'r'"
            ),
            token,
        )
        .await?;

    for row in &rs.rows {
        let table_name = row.text(0).unwrap_or_default();
        let Some(comment) = row.text(1).filter(|c| !c.is_empty()) else { continue };
        if let Some(&table_id) = table_ids.get(table_name) {
            schema.tables[table_id.index()].comment = Some(comment.to_string());
        }
    }

    Ok(())
}

/// Column comments, keyed by `(table, column)`, read from `pg_description`
/// via `col_description(oid, attnum)` since `information_schema.columns`
/// exposes no comment column.
async fn describe_column_comments(
    executor: &dyn Executor,
    schema_name: &str,
    table_name: &str,
    token: &CancellationToken,
) -> ConnectorResult<HashMap<String, String>> {
    let rs = executor
        .query(
            &format!(
                "SELECT a.attname, col_description(c.oid, a.attnum) \
                 FROM pg_attribute a \
                 JOIN pg_class c ON c.oid = a.attrelid \
                 JOIN pg_namespace n ON n.oid = c.relnamespace \
                 WHERE n.nspname = '{schema_name}' AND c.relname = '{table_name}' \
                 AND a.attnum > 0 AND NOT a.attisdropped"
            ),
            token,
        )
        .await?;

    let mut out = HashMap::new();
    for row in &rs.rows {
        let column = row.text(0).unwrap_or_default().to_string();
        if let Some(comment) = row.text(1).filter(|c| !c.is_empty()) {
            out.insert(column, comment.to_string());
        }
    }
    Ok(out)
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
                "SELECT i.relname AS index_name, ix.indisunique, ix.indisprimary, a.attname \
                 FROM pg_index ix \
                 JOIN pg_class t ON t.oid = ix.indrelid \
                 JOIN pg_class i ON i.oid = ix.indexrelid \
                 JOIN pg_namespace n ON n.oid = t.relnamespace \
                 JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey) \
                 WHERE n.nspname = '{schema_name}' AND t.relname = '{table_name}' \
                 ORDER BY i.relname, array_position(ix.indkey, a.attnum)"
            ),
            token,
        )
        .await?;

    let mut by_index: Vec<(String, bool, bool, Vec<String>)> = Vec::new();
    for row in &rs.rows {
        let index_name = row.text(0).unwrap_or_default().to_string();
        let is_unique = row.boolean(1).unwrap_or(false);
        let is_primary = row.boolean(2).unwrap_or(false);
        let column_name = row.text(3).unwrap_or_default().to_string();

        match by_index.last_mut() {
            Some((name, _, _, cols)) if *name == index_name => cols.push(column_name),
            _ => by_index.push((index_name, is_unique, is_primary, vec![column_name])),
        }
    }

    for (name, is_unique, is_primary, columns) in by_index {
        let table = crate::walkers::Walker { schema: &*schema, id: table_id };
        let column_ids: Vec<_> = columns
            .iter()
            .filter_map(|col_name| table.column(col_name).map(|c| c.column_id()))
            .collect();
        if column_ids.is_empty() {
            continue;
        }
        if is_primary {
            schema.push_primary_key(table_id, name, column_ids);
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
                "SELECT tc.constraint_name, kcu.column_name, ccu.table_schema, ccu.table_name, ccu.column_name, \
                        rc.update_rule, rc.delete_rule \
                 FROM information_schema.table_constraints tc \
                 JOIN information_schema.key_column_usage kcu ON kcu.constraint_name = tc.constraint_name \
                 JOIN information_schema.constraint_column_usage ccu ON ccu.constraint_name = tc.constraint_name \
                 JOIN information_schema.referential_constraints rc ON rc.constraint_name = tc.constraint_name \
                 WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = '{schema_name}' \
                 AND tc.table_name = '{table_name}' ORDER BY tc.constraint_name, kcu.ordinal_position"
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

/// `"user-defined"` columns are tagged `ColumnTypeFamily::Enum(udt_name)`
/// by `column_type` above, but the enum's own value list lives in
/// `pg_enum`, not `information_schema.columns` — read separately so the
/// differ's enum-diffing
/// has something to compare against.
async fn describe_enums(
    executor: &dyn Executor,
    schema: &mut SqlSchema,
    schema_id: crate::SchemaId,
    schema_name: &str,
    token: &CancellationToken,
) -> ConnectorResult<()> {
    let rs = executor
        .query(
            &format!(
                "SELECT t.typname, e.enumlabel \
                 FROM pg_type t \
                 JOIN pg_enum e ON t.oid = e.enumtypid \
                 JOIN pg_namespace n ON n.oid = t.typnamespace \
                 WHERE n.nspname = '{schema_name}' \
                 ORDER BY t.typname, e.enumsortorder"
            ),
            token,
        )
        .await?;

    let mut by_name: Vec<(String, Vec<String>)> = Vec::new();
    for row in &rs.rows {
        let typname = row.text(0).unwrap_or_default().to_string();
        let label = row.text(1).unwrap_or_default().to_string();
        match by_name.last_mut() {
            Some((name, values)) if *name == typname => values.push(label),
            _ => by_name.push((typname, vec![label])),
        }
    }

    for (name, values) in by_name {
        if values.is_empty() {
            continue;
        }
        schema.push_enum(schema_id, name, values);
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
    fn column_type_classifies_user_defined_as_enum() {
        let describer = PostgresDescriber::new();
        let tpe = describer.column_type("USER-DEFINED", "mood");
        assert!(matches!(tpe.family, ColumnTypeFamily::Enum(name) if name == "mood"));
    }

    #[test]
    fn column_type_classifies_known_families() {
        let describer = PostgresDescriber::new();
        assert!(matches!(describer.column_type("bigint", "").family, ColumnTypeFamily::BigInt));
        assert!(matches!(describer.column_type("boolean", "").family, ColumnTypeFamily::Boolean));
    }
}
