//! The per-dialect connector (components C, D, and the dialect half of B/E):
//! wires a [`SqlFlavour`] to the matching [`SchemaDescriber`], the Differ,
//! the Planner, and the SQL parser bridge behind one [`SqlSchemaConnector`]
//! facade so `schema-core` never has to match on dialect itself.

pub mod differ;
pub mod flavour;
pub mod rename;
pub mod sql_renderer;

pub use differ::{Change, ColumnChangeKind, ColumnChanges, ForeignKeyChangeKind, ForeignKeyChanges, IndexChangeKind, IndexChanges};
pub use flavour::{advisory_lock_id, SqlFlavour};
pub use rename::{bridge, column_filled_before, create_view_after, detect_rename_hints, fuse_renames, split_statements, RenameHints};
pub use sql_renderer::{plan_changes, PlanMode, PlanOptions, SchemaQualifier};

use schema_connector::{CancellationToken, ConnectorResult, Dialect, Executor, Plan};
use sql_schema_describer::{InspectOptions, SchemaDescriber, SqlSchema};

#[cfg(feature = "mysql")]
use flavour::MysqlFlavour;
#[cfg(feature = "mysql")]
use sql_schema_describer::mysql::MysqlDescriber;

#[cfg(feature = "postgres")]
use flavour::PostgresFlavour;
#[cfg(feature = "postgres")]
use sql_schema_describer::postgres::PostgresDescriber;

#[cfg(feature = "sqlite")]
use flavour::SqliteFlavour;
#[cfg(feature = "sqlite")]
use sql_schema_describer::sqlite::SqliteDescriber;

/// One dialect's complete connector: inspection, diffing, and planning
/// behind a single type, so `schema-core` only ever holds a
/// `Box<dyn SqlSchemaConnector>` chosen once at startup from the
/// connection URL's driver.
pub struct SqlSchemaConnector {
    flavour: Box<dyn SqlFlavour>,
    describer: Box<dyn SchemaDescriber>,
}

impl SqlSchemaConnector {
    pub fn new(flavour: Box<dyn SqlFlavour>, describer: Box<dyn SchemaDescriber>) -> Self {
        SqlSchemaConnector { flavour, describer }
    }

    #[cfg(feature = "mysql")]
    pub fn mysql() -> Self {
        SqlSchemaConnector::new(Box::new(MysqlFlavour), Box::new(MysqlDescriber::new()))
    }

    #[cfg(feature = "postgres")]
    pub fn postgres() -> Self {
        SqlSchemaConnector::new(Box::new(PostgresFlavour), Box::new(PostgresDescriber::new()))
    }

    #[cfg(feature = "sqlite")]
    pub fn sqlite() -> Self {
        SqlSchemaConnector::new(Box::new(SqliteFlavour), Box::new(SqliteDescriber::new()))
    }

    pub fn dialect(&self) -> Dialect {
        self.flavour.dialect()
    }

    /// The advisory-lock id this connector's cluster-wide migration lock
    /// hashes to.
    pub fn advisory_lock_id(&self) -> u64 {
        advisory_lock_id("schema-engine-migrate")
    }

    pub async fn inspect_schema(
        &self,
        executor: &dyn Executor,
        schema_name: &str,
        options: &InspectOptions,
        token: &CancellationToken,
    ) -> ConnectorResult<SqlSchema> {
        self.describer.describe_schema(executor, schema_name, options, token).await
    }

    pub async fn inspect_realm(
        &self,
        executor: &dyn Executor,
        options: &InspectOptions,
        token: &CancellationToken,
    ) -> ConnectorResult<SqlSchema> {
        self.describer.describe_realm(executor, options, token).await
    }

    /// `DiffSchemas(previous, next) → []Change`, with no parser
    /// bridge applied — callers that have a hand-written SQL file to
    /// recover rename intent from should follow up with
    /// [`rename::bridge`].
    pub fn diff(&self, previous: &SqlSchema, next: &SqlSchema) -> Vec<Change> {
        differ::diff_schemas(previous, next)
    }

    /// `Plan(changes, options) → Plan`.
    pub fn plan(
        &self,
        name: impl Into<String>,
        previous: &SqlSchema,
        next: &SqlSchema,
        changes: &[Change],
        options: &PlanOptions,
    ) -> ConnectorResult<Plan> {
        sql_renderer::plan_changes(self.flavour.as_ref(), previous, next, changes, name, options)
    }
}
