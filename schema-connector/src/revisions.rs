//! The revisions table (§6 "External Interfaces"): one row per applied
//! migration file, persisted in the target database so a run interrupted
//! mid-plan can resume at the failed statement instead of re-running
//! everything (§5 "Transactional discipline", §7 "Apply is best-effort").
//!
//! SQL generation lives here as plain functions rather than behind the
//! `Executor` trait itself, the way `migration-directory`'s checksum
//! format is plain functions over bytes — `schema-core::engine` is the
//! only caller that actually holds an `Executor` to run them against.

use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const REVISIONS_TABLE: &str = "_schema_engine_revisions";

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Distinguishes a baseline row (no statements executed, schema assumed
/// pre-existing) from an ordinary applied file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevisionType {
    Baseline,
    Normal,
}

impl RevisionType {
    fn code(self) -> i32 {
        match self {
            RevisionType::Baseline => 0,
            RevisionType::Normal => 1,
        }
    }
}

/// One row of the revisions table, matching §6's column list.
///
/// `executed_at` is milliseconds since the Unix epoch rendered as a
/// decimal string, rather than an RFC 3339 timestamp — the workspace's
/// `chrono` dependency only carries its `alloc` feature, not `clock`, so
/// `std::time::SystemTime` is what's available without widening that
/// dependency for every other crate that pulls it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub version: String,
    pub description: String,
    pub kind: RevisionType,
    pub applied: u32,
    pub total: u32,
    pub executed_at: String,
    pub execution_time_ms: u64,
    pub error: Option<String>,
    pub error_stmt: Option<String>,
    pub hash: String,
    pub partial_hashes: Vec<String>,
    pub operator_version: String,
}

/// Milliseconds since the Unix epoch, for `Revision::executed_at`.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl Revision {
    /// Whether this file ran to completion with no error — the `apply`
    /// resume check treats only these versions as already done.
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.applied == self.total
    }
}

fn escape(s: &str) -> String {
    s.replace('\'', "''")
}

fn sql_string(value: &str) -> String {
    format!("'{}'", escape(value))
}

fn sql_opt_string(value: Option<&str>) -> String {
    match value {
        Some(v) => sql_string(v),
        None => "NULL".to_string(),
    }
}

/// `CREATE TABLE IF NOT EXISTS` for the revisions table. Column types are
/// kept to the portable subset (`TEXT`/`INTEGER`) that MySQL, PostgreSQL,
/// and SQLite all accept without dialect-specific branching — `partial_hashes`
/// is stored as a JSON-encoded `TEXT` rather than a native `JSON` column for
/// the same reason.
pub fn create_table_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {REVISIONS_TABLE} (\
version TEXT NOT NULL, \
description TEXT NOT NULL, \
type INTEGER NOT NULL, \
applied INTEGER NOT NULL, \
total INTEGER NOT NULL, \
executed_at TEXT NOT NULL, \
execution_time INTEGER NOT NULL, \
error TEXT, \
error_stmt TEXT, \
hash TEXT NOT NULL, \
partial_hashes TEXT NOT NULL, \
operator_version TEXT NOT NULL\
)"
    )
}

/// Versions recorded as fully applied, used by `apply` to skip files it
/// has already run on a previous, successful pass.
pub fn select_succeeded_versions_sql() -> String {
    format!("SELECT version FROM {REVISIONS_TABLE} WHERE error IS NULL AND applied = total ORDER BY version")
}

pub fn insert_revision_sql(revision: &Revision) -> String {
    let partial_hashes_json = serde_json::to_string(&revision.partial_hashes).unwrap_or_else(|_| "[]".to_string());
    format!(
        "INSERT INTO {REVISIONS_TABLE} \
(version, description, type, applied, total, executed_at, execution_time, error, error_stmt, hash, partial_hashes, operator_version) \
VALUES ({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
        sql_string(&revision.version),
        sql_string(&revision.description),
        revision.kind.code(),
        revision.applied,
        revision.total,
        sql_string(&revision.executed_at),
        revision.execution_time_ms,
        sql_opt_string(revision.error.as_deref()),
        sql_opt_string(revision.error_stmt.as_deref()),
        sql_string(&revision.hash),
        sql_string(&partial_hashes_json),
        sql_string(&revision.operator_version),
    )
}

/// One SHA-256/base64 hash per statement, plus their aggregate, mirroring
/// `migration-directory::checksum`'s file-hash scheme one level down (per
/// statement instead of per file) so a resumed run can tell exactly which
/// statement it failed on.
pub fn hash_statements(statements: &[String]) -> (String, Vec<String>) {
    let partial: Vec<String> = statements
        .iter()
        .map(|s| {
            let mut hasher = Sha256::new();
            hasher.update(s.as_bytes());
            B64.encode(hasher.finalize())
        })
        .collect();

    let mut aggregate = Sha256::new();
    for hash in &partial {
        aggregate.update(hash.as_bytes());
    }
    (B64.encode(aggregate.finalize()), partial)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Revision {
        Revision {
            version: "0001".into(),
            description: "init".into(),
            kind: RevisionType::Normal,
            applied: 2,
            total: 2,
            executed_at: "2026-01-01T00:00:00Z".into(),
            execution_time_ms: 12,
            error: None,
            error_stmt: None,
            hash: "abc".into(),
            partial_hashes: vec!["a".into(), "b".into()],
            operator_version: "0.1.0".into(),
        }
    }

    #[test]
    fn succeeded_requires_no_error_and_full_apply_count() {
        assert!(sample().succeeded());
        let mut partial = sample();
        partial.applied = 1;
        assert!(!partial.succeeded());
        let mut failed = sample();
        failed.error = Some("boom".into());
        assert!(!failed.succeeded());
    }

    #[test]
    fn insert_sql_escapes_single_quotes() {
        let mut revision = sample();
        revision.description = "o'brien's migration".into();
        let sql = insert_revision_sql(&revision);
        assert!(sql.contains("o''brien''s migration"));
    }

    #[test]
    fn insert_sql_embeds_null_for_missing_error() {
        let sql = insert_revision_sql(&sample());
        assert!(sql.contains("NULL, NULL,"));
    }

    #[test]
    fn hash_statements_is_deterministic_and_sensitive_to_content() {
        let (agg1, parts1) = hash_statements(&["CREATE TABLE t (id int)".to_string()]);
        let (agg2, parts2) = hash_statements(&["CREATE TABLE t (id int)".to_string()]);
        assert_eq!(agg1, agg2);
        assert_eq!(parts1, parts2);

        let (agg3, _) = hash_statements(&["CREATE TABLE t (id bigint)".to_string()]);
        assert_ne!(agg1, agg3);
    }

    #[test]
    fn now_millis_is_nonzero_and_monotonic_enough() {
        let first = now_millis();
        let second = now_millis();
        assert!(first > 0);
        assert!(second >= first);
    }

    #[test]
    fn hash_statements_aggregate_depends_on_every_partial_hash() {
        let (agg_one, _) = hash_statements(&["SELECT 1".to_string()]);
        let (agg_two, _) = hash_statements(&["SELECT 1".to_string(), "SELECT 2".to_string()]);
        assert_ne!(agg_one, agg_two);
    }
}
