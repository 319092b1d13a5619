//! The Migration Directory: an ordered collection of migration
//! files plus the checksum manifest, checkpoint, baseline, and archive
//! operations layered on top of it. Generic over [`DirectoryBackend`] so
//! the same code serves on-disk directories and the process-wide
//! in-memory registry used by embedding tools and tests.

mod archive;
mod backend;
mod checksum;
mod directory;
mod file;
mod formatter;
mod registry;

pub use backend::{DirectoryBackend, LocalBackend, MemBackend};
pub use checksum::{Checksum, ChecksumEntry};
pub use directory::{MigrationDirectory, SUM_FILE_NAME};
pub use file::{Directive, MigrationFile, Statement};
pub use formatter::TemplateFormatter;
pub use registry::{open_mem_dir, registered_count, MemDirHandle};
