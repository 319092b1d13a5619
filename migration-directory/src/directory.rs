//! The higher-level directory operations, generic over any
//! [`DirectoryBackend`] so the on-disk and in-memory implementations
//! share one code path for checksums, checkpoints, and archiving.

use crate::backend::DirectoryBackend;
use crate::checksum::Checksum;
use crate::file::MigrationFile;
use schema_connector::{ConnectorError, ConnectorResult};

pub const SUM_FILE_NAME: &str = "atlas.sum";

pub struct MigrationDirectory<B> {
    backend: B,
}

impl<B: DirectoryBackend> MigrationDirectory<B> {
    pub fn new(backend: B) -> Self {
        MigrationDirectory { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// All migration `.sql` files, lexicographically by name. The
    /// checksum manifest itself is never a migration file.
    pub fn files(&self) -> Vec<MigrationFile> {
        let mut names: Vec<String> = self
            .backend
            .list_names()
            .into_iter()
            .filter(|n| n.ends_with(".sql"))
            .collect();
        names.sort();
        names
            .into_iter()
            .filter_map(|name| {
                let bytes = self.backend.read(&name)?;
                Some(MigrationFile::new(name, bytes))
            })
            .collect()
    }

    #[tracing::instrument(skip(self, file), fields(name = %file.name))]
    pub fn write_file(&self, file: MigrationFile) -> ConnectorResult<()> {
        self.backend.write(&file.name, file.bytes)
    }

    /// Recomputes the manifest from the files currently on the backend.
    pub fn checksum(&self) -> Checksum {
        Checksum::compute(&self.files())
    }

    /// Writes the freshly computed manifest as `atlas.sum`. Used after
    /// `write_file` calls that add or remove migrations, and as the
    /// re-hash step `Validate` errors instruct the caller to run.
    #[tracing::instrument(skip(self))]
    pub fn rehash(&self) -> ConnectorResult<()> {
        let rendered = self.checksum().render();
        tracing::debug!(bytes = rendered.len(), "rehashed migration directory");
        self.backend.write(SUM_FILE_NAME, rendered.into_bytes())
    }

    /// Compares the on-disk manifest to the computed one.
    #[tracing::instrument(skip(self))]
    pub fn validate(&self) -> ConnectorResult<()> {
        let files = self.files();
        let computed = Checksum::compute(&files);

        let Some(raw) = self.backend.read(SUM_FILE_NAME) else {
            if files.is_empty() {
                return Ok(());
            }
            return Err(ConnectorError::ChecksumNotFound);
        };
        let text = String::from_utf8_lossy(&raw).into_owned();
        let stored = Checksum::parse(&text).ok_or_else(|| ConnectorError::ChecksumFormat(text.clone()))?;

        if stored == computed {
            Ok(())
        } else {
            tracing::warn!("migration directory checksum mismatch");
            Err(ConnectorError::ChecksumMismatch)
        }
    }

    /// Writes a checkpoint file: a snapshot with the `atlas:checkpoint`
    /// directive prepended, superseding all earlier files for new
    /// databases.
    pub fn write_checkpoint(&self, name: &str, tag: Option<&str>, body: &[u8]) -> ConnectorResult<()> {
        let directive = match tag {
            Some(tag) => format!("-- atlas:checkpoint {tag}\n\n"),
            None => "-- atlas:checkpoint\n\n".to_string(),
        };
        let mut bytes = directive.into_bytes();
        bytes.extend_from_slice(body);
        self.backend.write(name, bytes)
    }

    /// Files carrying the `atlas:checkpoint` directive, in file order.
    pub fn checkpoint_files(&self) -> Vec<MigrationFile> {
        self.files().into_iter().filter(|f| f.is_checkpoint()).collect()
    }

    /// Files from and including the named checkpoint. `name` matches the checkpoint file's own
    /// name, not its tag — tags disambiguate checkpoints sharing an
    /// informal label, names are the directory's actual ordering key.
    pub fn files_from_checkpoint(&self, name: &str) -> ConnectorResult<Vec<MigrationFile>> {
        let files = self.files();
        let position = files
            .iter()
            .position(|f| f.name == name && f.is_checkpoint())
            .ok_or_else(|| ConnectorError::CheckpointNotFound(name.to_string()))?;
        Ok(files[position..].to_vec())
    }

    /// The suffix of files after the latest checkpoint, or every file if
    /// none exists.
    pub fn files_from_last_checkpoint(&self) -> Vec<MigrationFile> {
        let files = self.files();
        match files.iter().rposition(|f| f.is_checkpoint()) {
            Some(position) => files[position..].to_vec(),
            None => files,
        }
    }

    /// Files a fresh-database `apply` would not re-execute: baselines
    /// describe pre-existing schema rather than changes to make.
    pub fn applicable_files(&self) -> Vec<MigrationFile> {
        self.files().into_iter().filter(|f| !f.is_baseline()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemBackend;

    fn dir_with(files: &[(&str, &[u8])]) -> MigrationDirectory<MemBackend> {
        let dir = MigrationDirectory::new(MemBackend::new());
        for (name, bytes) in files {
            dir.write_file(MigrationFile::new(*name, bytes.to_vec())).unwrap();
        }
        dir
    }

    #[test]
    fn files_are_returned_lexicographically() {
        let dir = dir_with(&[("2_b.sql", b"SELECT 2;"), ("1_a.sql", b"SELECT 1;")]);
        let names: Vec<_> = dir.files().iter().map(|f| f.name.clone()).collect();
        assert_eq!(names, vec!["1_a.sql".to_string(), "2_b.sql".to_string()]);
    }

    #[test]
    fn validate_succeeds_after_rehash() {
        let dir = dir_with(&[("1_a.sql", b"SELECT 1;")]);
        dir.rehash().unwrap();
        assert!(dir.validate().is_ok());
    }

    #[test]
    fn validate_fails_when_manifest_predates_later_files() {
        let dir = MigrationDirectory::new(MemBackend::new());
        dir.write_file(MigrationFile::new("1.sql", b"SELECT 1;".to_vec())).unwrap();
        let partial = Checksum::compute(&[MigrationFile::new("1.sql", b"SELECT 1;".to_vec())]);
        dir.backend().write(SUM_FILE_NAME, partial.render().into_bytes()).unwrap();
        dir.write_file(MigrationFile::new("2.sql", b"SELECT 2;".to_vec())).unwrap();

        let result = dir.validate();
        assert!(matches!(result, Err(ConnectorError::ChecksumMismatch)));
    }

    #[test]
    fn validate_fails_with_checksum_not_found_when_manifest_absent() {
        let dir = dir_with(&[("1.sql", b"SELECT 1;")]);
        assert!(matches!(dir.validate(), Err(ConnectorError::ChecksumNotFound)));
    }

    #[test]
    fn files_from_last_checkpoint_returns_suffix() {
        let dir = MigrationDirectory::new(MemBackend::new());
        dir.write_file(MigrationFile::new("1_init.sql", b"SELECT 1;".to_vec())).unwrap();
        dir.write_checkpoint("2_snap.sql", None, b"SELECT 2;").unwrap();
        dir.write_file(MigrationFile::new("3_add.sql", b"SELECT 3;".to_vec())).unwrap();

        let names: Vec<_> = dir.files_from_last_checkpoint().iter().map(|f| f.name.clone()).collect();
        assert_eq!(names, vec!["2_snap.sql".to_string(), "3_add.sql".to_string()]);
    }

    #[test]
    fn files_from_last_checkpoint_returns_all_when_none_exists() {
        let dir = dir_with(&[("1_init.sql", b"SELECT 1;")]);
        assert_eq!(dir.files_from_last_checkpoint().len(), 1);
    }

    #[test]
    fn files_from_checkpoint_by_name_errors_when_unknown() {
        let dir = dir_with(&[("1_init.sql", b"SELECT 1;")]);
        let result = dir.files_from_checkpoint("missing.sql");
        assert!(matches!(result, Err(ConnectorError::CheckpointNotFound(name)) if name == "missing.sql"));
    }

    #[test]
    fn baseline_files_are_excluded_from_applicable_files() {
        let dir = MigrationDirectory::new(MemBackend::new());
        dir.write_file(MigrationFile::new("1_baseline.sql", b"-- atlas:baseline\n\nSELECT 1;".to_vec()))
            .unwrap();
        dir.write_file(MigrationFile::new("2_add.sql", b"SELECT 2;".to_vec())).unwrap();
        let names: Vec<_> = dir.applicable_files().iter().map(|f| f.name.clone()).collect();
        assert_eq!(names, vec!["2_add.sql".to_string()]);
    }
}
