//! The `atlas.sum` checksum manifest. Per-file hashes are
//! SHA-256 over `file_name || file_bytes`; the aggregate sum is SHA-256
//! over the concatenation of `name||hash` entries. Files carrying the
//! `atlas:sum ignore` directive are excluded entirely.

use crate::file::MigrationFile;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

fn hash_entry(name: &str, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(bytes);
    B64.encode(hasher.finalize())
}

/// One `<name> h1:<hash>` line's parsed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    pub name: String,
    pub hash: String,
}

/// The parsed `atlas.sum` contents: an aggregate sum plus one entry per
/// hashed file, in file order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Checksum {
    pub sum: String,
    pub entries: Vec<ChecksumEntry>,
}

impl Checksum {
    /// Computes the manifest for `files`, skipping any carrying
    /// `-- atlas:sum ignore`.
    pub fn compute(files: &[MigrationFile]) -> Checksum {
        let mut entries = Vec::new();
        let mut concatenated = String::new();
        for file in files {
            if file.is_sum_ignored() {
                continue;
            }
            let hash = hash_entry(&file.name, &file.bytes);
            concatenated.push_str(&file.name);
            concatenated.push_str(&hash);
            entries.push(ChecksumEntry { name: file.name.clone(), hash });
        }

        let mut aggregate_hasher = Sha256::new();
        aggregate_hasher.update(concatenated.as_bytes());
        let sum = B64.encode(aggregate_hasher.finalize());

        Checksum { sum, entries }
    }

    /// Renders the `h1:<sum>\n<file> h1:<hash>\n...` text format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        writeln!(out, "h1:{}", self.sum).unwrap();
        for entry in &self.entries {
            writeln!(out, "{} h1:{}", entry.name, entry.hash).unwrap();
        }
        out
    }

    /// Parses a previously written `atlas.sum`. Returns `None` (caller
    /// maps to `ErrChecksumFormat`) on any malformed line.
    pub fn parse(text: &str) -> Option<Checksum> {
        let mut lines = text.lines();
        let sum = lines.next()?.strip_prefix("h1:")?.to_string();

        let mut entries = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let (name, hash) = line.rsplit_once(' ')?;
            let hash = hash.strip_prefix("h1:")?;
            entries.push(ChecksumEntry {
                name: name.to_string(),
                hash: hash.to_string(),
            });
        }
        Some(Checksum { sum, entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_then_parse_round_trips() {
        let files = vec![
            MigrationFile::new("1_init.sql", b"CREATE TABLE t (id int);".to_vec()),
            MigrationFile::new("2_add_col.sql", b"ALTER TABLE t ADD COLUMN a int;".to_vec()),
        ];
        let checksum = Checksum::compute(&files);
        let rendered = checksum.render();
        let parsed = Checksum::parse(&rendered).unwrap();
        assert_eq!(parsed, checksum);
    }

    #[test]
    fn sum_ignore_directive_excludes_file_from_manifest() {
        let files = vec![
            MigrationFile::new("1_init.sql", b"CREATE TABLE t (id int);".to_vec()),
            MigrationFile::new("2_scratch.sql", b"-- atlas:sum ignore\n\nSELECT 1;".to_vec()),
        ];
        let checksum = Checksum::compute(&files);
        assert_eq!(checksum.entries.len(), 1);
        assert_eq!(checksum.entries[0].name, "1_init.sql");
    }

    #[test]
    fn changing_file_contents_changes_aggregate_sum() {
        let before = Checksum::compute(&[MigrationFile::new("1.sql", b"SELECT 1;".to_vec())]);
        let after = Checksum::compute(&[MigrationFile::new("1.sql", b"SELECT 2;".to_vec())]);
        assert_ne!(before.sum, after.sum);
    }

    #[test]
    fn parse_rejects_missing_h1_prefix() {
        assert!(Checksum::parse("not-a-sum-line\n").is_none());
    }
}
