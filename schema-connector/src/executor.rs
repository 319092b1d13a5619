use crate::cancellation::CancellationToken;
use crate::error::ConnectorResult;
use async_trait::async_trait;
use std::fmt;

/// The SQL dialect family. The engine normalizes MariaDB and CockroachDB
/// onto their closest upstream dialect and tracks the divergence as a
/// [`DialectVariant`] flag instead of inventing new top-level dialects —
/// the wire protocol and the bulk of the DDL grammar are shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Mysql,
    Postgres,
    Sqlite,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dialect::Mysql => "mysql",
            Dialect::Postgres => "postgresql",
            Dialect::Sqlite => "sqlite",
        };
        f.write_str(s)
    }
}

#[enumflags2::bitflags]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DialectVariant {
    MariaDb,
    CockroachDb,
    Vitess,
    Libsql,
}

pub type DialectVariants = enumflags2::BitFlags<DialectVariant>;

/// The minimal, dialect-agnostic value representation the engine needs to
/// bind parameters and read rows back. The real wire encoding lives behind
/// whatever [`Executor`] implementation the caller provides — this type
/// exists so `schema-connector` itself never has to depend on a driver
/// crate.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int64(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, Default)]
pub struct ResultRow {
    pub values: Vec<Value>,
}

impl ResultRow {
    pub fn text(&self, idx: usize) -> Option<&str> {
        match self.values.get(idx) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn int(&self, idx: usize) -> Option<i64> {
        match self.values.get(idx) {
            Some(Value::Int64(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn boolean(&self, idx: usize) -> Option<bool> {
        match self.values.get(idx) {
            Some(Value::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self, idx: usize) -> bool {
        matches!(self.values.get(idx), Some(Value::Null) | None)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<ResultRow>,
}

impl ResultSet {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// The capability the differ's live-check helpers, the Inspector, and the
/// Executor component all consume. Drivers' wire protocols are out
/// of scope; this trait is the seam where a real connection pool
/// plugs in.
#[async_trait]
pub trait Executor: Send + Sync {
    fn dialect(&self) -> Dialect;

    fn variants(&self) -> DialectVariants {
        DialectVariants::empty()
    }

    async fn query(&self, sql: &str, token: &CancellationToken) -> ConnectorResult<ResultSet>;

    /// Executes a single statement, returning the number of affected rows
    /// where the dialect reports one (0 otherwise, e.g. DDL).
    async fn execute(&self, sql: &str, token: &CancellationToken) -> ConnectorResult<u64>;

    /// Acquire a dialect-specific advisory lock named by a 64-bit id
    /// derived from a fixed string.
    /// Best-effort: returns `Ok(false)` rather than an error when another
    /// holder has the lock, so the caller can retry.
    async fn try_advisory_lock(&self, _lock_id: u64) -> ConnectorResult<bool> {
        Ok(true)
    }

    async fn advisory_unlock(&self, _lock_id: u64) -> ConnectorResult<()> {
        Ok(())
    }
}
