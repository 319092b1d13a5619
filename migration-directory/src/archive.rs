//! `ArchiveDir`/`UnarchiveDir`: pack a directory plus its
//! `atlas.sum` into a single tar stream for transport to a CI service,
//! and unpack it back into any [`DirectoryBackend`].

use crate::backend::DirectoryBackend;
use crate::directory::{MigrationDirectory, SUM_FILE_NAME};
use schema_connector::{ConnectorError, ConnectorResult};
use std::io::Read;

impl<B: DirectoryBackend> MigrationDirectory<B> {
    /// Packs every `.sql` file plus `atlas.sum` into a tar byte stream,
    /// header-preserving.
    pub fn archive(&self) -> ConnectorResult<Vec<u8>> {
        let mut builder = tar::Builder::new(Vec::new());

        for file in self.files() {
            append_entry(&mut builder, &file.name, &file.bytes)?;
        }
        if let Some(sum) = self.backend().read(SUM_FILE_NAME) {
            append_entry(&mut builder, SUM_FILE_NAME, &sum)?;
        }

        builder.into_inner().map_err(|e| ConnectorError::driver(e, None))
    }

    /// Unpacks a tar stream produced by [`MigrationDirectory::archive`]
    /// into this directory's backend, overwriting any file with the same
    /// name.
    pub fn unarchive(&self, bytes: &[u8]) -> ConnectorResult<()> {
        let mut archive = tar::Archive::new(bytes);
        for entry in archive.entries().map_err(|e| ConnectorError::driver(e, None))? {
            let mut entry = entry.map_err(|e| ConnectorError::driver(e, None))?;
            let path = entry.path().map_err(|e| ConnectorError::driver(e, None))?.into_owned();
            let name = path.to_string_lossy().into_owned();
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents).map_err(|e| ConnectorError::driver(e, None))?;
            self.backend().write(&name, contents)?;
        }
        Ok(())
    }
}

fn append_entry(builder: &mut tar::Builder<Vec<u8>>, name: &str, bytes: &[u8]) -> ConnectorResult<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, name, bytes)
        .map_err(|e| ConnectorError::driver(e, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemBackend;
    use crate::file::MigrationFile;

    #[test]
    fn archive_then_unarchive_round_trips_files_and_sum() {
        let source = MigrationDirectory::new(MemBackend::new());
        source.write_file(MigrationFile::new("1_init.sql", b"CREATE TABLE t (id int);".to_vec())).unwrap();
        source.rehash().unwrap();

        let bytes = source.archive().unwrap();

        let dest = MigrationDirectory::new(MemBackend::new());
        dest.unarchive(&bytes).unwrap();

        assert_eq!(dest.files().len(), 1);
        assert_eq!(dest.files()[0].name, "1_init.sql");
        assert!(dest.validate().is_ok());
    }
}
