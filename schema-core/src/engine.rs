//! The engine facade: wires the Inspector, Differ,
//! Planner, Migration Directory, and Lint analyzers behind one type so an
//! external CLI or JSON-RPC wire layer never has to
//! assemble those pieces itself.

use migration_directory::{DirectoryBackend, MigrationDirectory, MigrationFile, TemplateFormatter};
use schema_connector::revisions::{self, Revision, RevisionType};
use schema_connector::{CancellationToken, ConnectorError, ConnectorResult, Diagnostic, Executor};
use sql_schema_connector::{Change, PlanOptions, SqlSchemaConnector};
use sql_schema_describer::{InspectOptions, SqlSchema};
use std::collections::HashSet;
use std::time::Instant;

/// `Inspector → Differ → Planner → {Executor, Directory} and Lint`, one
/// dialect connector plus one migration directory at a time.
pub struct SchemaEngine<B: DirectoryBackend> {
    connector: SqlSchemaConnector,
    directory: MigrationDirectory<B>,
    formatter: TemplateFormatter,
}

impl<B: DirectoryBackend> SchemaEngine<B> {
    pub fn new(connector: SqlSchemaConnector, directory: MigrationDirectory<B>) -> Self {
        SchemaEngine {
            connector,
            directory,
            formatter: TemplateFormatter::new(),
        }
    }

    pub fn with_formatter(mut self, formatter: TemplateFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn connector(&self) -> &SqlSchemaConnector {
        &self.connector
    }

    pub fn directory(&self) -> &MigrationDirectory<B> {
        &self.directory
    }

    /// `InspectRealm(options) → Realm`, run against a live
    /// connection.
    pub async fn inspect(&self, executor: &dyn Executor, options: &InspectOptions, token: &CancellationToken) -> ConnectorResult<SqlSchema> {
        self.connector.inspect_realm(executor, options, token).await
    }

    /// `DiffSchemas(previous, next) → []Change`.
    pub fn diff(&self, previous: &SqlSchema, next: &SqlSchema) -> Vec<Change> {
        self.connector.diff(previous, next)
    }

    /// `Plan(changes, options) → Plan`.
    pub fn plan(
        &self,
        name: impl Into<String>,
        previous: &SqlSchema,
        next: &SqlSchema,
        changes: &[Change],
        options: &PlanOptions,
    ) -> ConnectorResult<schema_connector::Plan> {
        self.connector.plan(name, previous, next, changes, options)
    }

    /// Renders `plan` through the directory's formatter and writes it as
    /// a new migration file, then re-hashes the manifest.
    pub fn write_plan(&self, version: &str, plan: &schema_connector::Plan) -> ConnectorResult<MigrationFile> {
        let file = self.formatter.format(version, plan);
        self.directory.write_file(file.clone())?;
        self.directory.rehash()?;
        Ok(file)
    }

    /// Applies every not-yet-applied file in source order against
    /// `executor`. Refuses to run if the manifest doesn't match the
    /// directory's contents.
    ///
    /// Holds the connector's cluster-wide advisory lock for the whole
    /// run, so two hosts racing to migrate the same database never
    /// interleave. Each file's outcome — including a partial failure —
    /// is recorded as a row in the revisions table before `apply`
    /// returns, so a subsequent call resumes at the first file that
    /// didn't previously succeed rather than replaying from the start.
    #[tracing::instrument(skip_all)]
    pub async fn apply(&self, executor: &dyn Executor, token: &CancellationToken) -> ConnectorResult<()> {
        self.directory.validate()?;

        let lock_id = self.connector.advisory_lock_id();
        if !executor.try_advisory_lock(lock_id).await? {
            tracing::warn!(lock_id, "advisory lock unavailable, another migration may be in progress");
            return Err(ConnectorError::AdvisoryLockUnavailable(lock_id));
        }

        let result = self.apply_under_lock(executor, token).await;
        executor.advisory_unlock(lock_id).await?;
        result
    }

    async fn apply_under_lock(&self, executor: &dyn Executor, token: &CancellationToken) -> ConnectorResult<()> {
        executor.execute(&revisions::create_table_sql(), token).await?;

        let applied_versions = self.succeeded_versions(executor, token).await?;

        for file in self.directory.applicable_files() {
            if applied_versions.contains(file.version()) {
                continue;
            }
            token.check()?;
            self.apply_file(executor, &file, token).await?;
        }

        Ok(())
    }

    async fn succeeded_versions(&self, executor: &dyn Executor, token: &CancellationToken) -> ConnectorResult<HashSet<String>> {
        let result = executor.query(&revisions::select_succeeded_versions_sql(), token).await?;
        Ok(result.rows.iter().filter_map(|row| row.text(0).map(str::to_string)).collect())
    }

    /// Runs one file's statements in order, recording a revisions row
    /// whether it succeeds or stops partway through. The row's
    /// `applied`/`total`/`partial_hashes` fields are what a resumed
    /// run — or an operator reading the table directly — uses to see
    /// exactly where a failed file stopped.
    async fn apply_file(&self, executor: &dyn Executor, file: &MigrationFile, token: &CancellationToken) -> ConnectorResult<()> {
        let stmts = file.stmts();
        let statement_texts: Vec<String> = stmts.iter().map(|s| s.text.clone()).collect();
        let (hash, partial_hashes) = revisions::hash_statements(&statement_texts);
        let kind = if file.is_baseline() { RevisionType::Baseline } else { RevisionType::Normal };

        let started = Instant::now();
        let mut applied = 0u32;
        let mut failure: Option<(ConnectorError, Option<String>)> = None;

        if file.is_baseline() {
            applied = stmts.len() as u32;
        } else {
            for stmt in &stmts {
                if let Err(err) = token.check() {
                    failure = Some((err, stmt.comment.clone()));
                    break;
                }
                match executor.execute(&stmt.text, token).await {
                    Ok(_) => applied += 1,
                    Err(err) => {
                        failure = Some((err, stmt.comment.clone()));
                        break;
                    }
                }
            }
        }

        let revision = Revision {
            version: file.version().to_string(),
            description: file.desc().to_string(),
            kind,
            applied,
            total: stmts.len() as u32,
            executed_at: revisions::now_millis().to_string(),
            execution_time_ms: started.elapsed().as_millis() as u64,
            error: failure.as_ref().map(|(err, _)| err.to_string()),
            error_stmt: failure.as_ref().and_then(|(_, comment)| comment.clone()),
            hash,
            partial_hashes,
            operator_version: env!("CARGO_PKG_VERSION").to_string(),
        };

        executor.execute(&revisions::insert_revision_sql(&revision), token).await?;

        match failure {
            Some((err, _)) => Err(err),
            None => Ok(()),
        }
    }

    /// Replays every applicable file against `executor` (an ephemeral dev
    /// database, per the GLOSSARY), inspects the result, and runs the
    /// lint analyzers over each file's own statements (component G).
    pub async fn replay_and_lint(
        &self,
        executor: &dyn Executor,
        options: &InspectOptions,
        token: &CancellationToken,
    ) -> ConnectorResult<(SqlSchema, Vec<Diagnostic>)> {
        let schema = schema_lint::replay::replay_and_inspect(executor, &self.connector, &self.directory, options, token).await?;

        let diagnostics = self
            .directory
            .applicable_files()
            .iter()
            .flat_map(schema_lint::lint_file)
            .collect();

        Ok((schema, diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration_directory::open_mem_dir;

    #[cfg(feature = "sqlite")]
    #[test]
    fn write_plan_then_rehash_round_trips() {
        let handle = open_mem_dir("schema_core_engine_test_dir");
        let engine = SchemaEngine::new(SqlSchemaConnector::sqlite(), MigrationDirectory::new(handle.backend()));
        let plan = schema_connector::Plan::new(
            "create_users",
            vec![schema_connector::PlanItem::new("CREATE TABLE users (id integer)").with_reverse("DROP TABLE users")],
        );

        let file = engine.write_plan("1", &plan).unwrap();
        assert_eq!(file.name, "1_create_users.sql");
        assert!(engine.directory().validate().is_ok());
        handle.close();
    }
}
