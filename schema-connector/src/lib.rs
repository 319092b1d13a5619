//! Dialect-independent contracts shared by every other crate in the
//! workspace: the error taxonomy, the `Executor` capability,
//! cancellation, the `Pair<T>` helper the differ is built on,
//! the `Plan` shape the Planner produces, and the lint diagnostic
//! shape (component G). Nothing here knows about a concrete SQL dialect —
//! `sql-schema-connector` is where MySQL/PostgreSQL/SQLite quirks live.

mod cancellation;
mod diagnostics;
mod error;
mod executor;
mod pair;
pub mod revisions;

pub use cancellation::CancellationToken;
pub use diagnostics::{Diagnostic, DiagnosticCategory};
pub use error::{ConnectorError, ConnectorErrorKind, ConnectorResult};
pub use executor::{Dialect, DialectVariant, DialectVariants, Executor, ResultRow, ResultSet, Value};
pub use pair::Pair;
pub use revisions::{now_millis, Revision, RevisionType, REVISIONS_TABLE};

pub mod plan;
pub use plan::{Plan, PlanItem};
