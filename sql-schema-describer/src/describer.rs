//! The Inspector contract.

use crate::SqlSchema;
use async_trait::async_trait;
use schema_connector::{CancellationToken, ConnectorResult, Executor};

#[enumflags2::bitflags]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ObjectKind {
    Tables,
    Enums,
    Sequences,
    Views,
}

pub type ObjectKinds = enumflags2::BitFlags<ObjectKind>;

/// Options selecting which named schemas to include, exclusion globs, and
/// object-kind filters.
#[derive(Debug, Clone)]
pub struct InspectOptions {
    pub schemas: Vec<String>,
    pub exclude: Vec<String>,
    pub kinds: ObjectKinds,
}

impl Default for InspectOptions {
    fn default() -> Self {
        InspectOptions {
            schemas: Vec::new(),
            exclude: Vec::new(),
            kinds: ObjectKinds::all(),
        }
    }
}

impl InspectOptions {
    /// Whether a catalog object named `name` survives the exclusion globs.
    /// Globs are single-`*`-wildcard prefixes/suffixes, e.g. `_litestream*`.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude.iter().any(|pattern| glob_match(pattern, name))
    }
}

fn glob_match(pattern: &str, name: &str) -> bool {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => name.starts_with(prefix) && name.ends_with(suffix),
        None => pattern == name,
    }
}

/// `InspectSchema(name, options) → Schema` and `InspectRealm(options) →
/// Realm`. Implemented once per dialect; each implementation owns
/// its own catalog queries and normalization rules.
#[async_trait]
pub trait SchemaDescriber: Send + Sync {
    /// Describes a single named schema/namespace, returning a `SqlSchema`
    /// containing only that schema's entities.
    async fn describe_schema(
        &self,
        executor: &dyn Executor,
        schema_name: &str,
        options: &InspectOptions,
        token: &CancellationToken,
    ) -> ConnectorResult<SqlSchema>;

    /// Describes every schema the connection can see (minus exclusions),
    /// producing one realm with all of them populated and foreign keys
    /// resolved across schema boundaries.
    async fn describe_realm(
        &self,
        executor: &dyn Executor,
        options: &InspectOptions,
        token: &CancellationToken,
    ) -> ConnectorResult<SqlSchema>;

    /// Lists the schema/namespace names visible on this connection,
    /// already filtered by `options.exclude`.
    async fn list_schema_names(&self, executor: &dyn Executor, token: &CancellationToken) -> ConnectorResult<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_prefix_matches() {
        let opts = InspectOptions {
            exclude: vec!["_litestream*".into()],
            ..Default::default()
        };
        assert!(opts.is_excluded("_litestream_seq"));
        assert!(!opts.is_excluded("users"));
    }

    #[test]
    fn exact_pattern_without_wildcard_matches_fully() {
        let opts = InspectOptions {
            exclude: vec!["schema_migrations".into()],
            ..Default::default()
        };
        assert!(opts.is_excluded("schema_migrations"));
        assert!(!opts.is_excluded("schema_migrations_old"));
    }
}
