//! Dev-database replay: applies
//! a migration directory's applicable files to an empty, ephemeral
//! database so the lint analyzers have real statement text to scan and
//! the round-trip property has a real inspected schema
//! to compare against. Baseline files are already excluded by
//! [`MigrationDirectory::applicable_files`].

use migration_directory::{DirectoryBackend, MigrationDirectory, MigrationFile};
use schema_connector::{CancellationToken, ConnectorResult, Executor};
use sql_schema_connector::SqlSchemaConnector;
use sql_schema_describer::{InspectOptions, SqlSchema};

/// Executes one file's statements in source order, returning their text
/// so a caller can run static analysis over the same statements without
/// re-splitting the file.
#[tracing::instrument(skip(executor, file, token), fields(file = %file.name))]
pub async fn apply_file(executor: &dyn Executor, file: &MigrationFile, token: &CancellationToken) -> ConnectorResult<Vec<String>> {
    let mut statements = Vec::new();
    for stmt in file.stmts() {
        token.check()?;
        executor.execute(&stmt.text, token).await?;
        statements.push(stmt.text);
    }
    Ok(statements)
}

/// Replays every applicable file in `dir` against `executor`, then
/// inspects the resulting realm through `connector`.
#[tracing::instrument(skip_all)]
pub async fn replay_and_inspect<B: DirectoryBackend>(
    executor: &dyn Executor,
    connector: &SqlSchemaConnector,
    dir: &MigrationDirectory<B>,
    options: &InspectOptions,
    token: &CancellationToken,
) -> ConnectorResult<SqlSchema> {
    let files = dir.applicable_files();
    tracing::debug!(files = files.len(), "replaying migration directory");
    for file in files {
        apply_file(executor, &file, token).await?;
    }
    connector.inspect_realm(executor, options, token).await
}
