//! The storage seam underneath [`crate::MigrationDirectory`]: a directory
//! is "an ordered collection of migration files" regardless of
//! whether the bytes live on disk or in a process-wide in-memory map.
//! Everything that isn't raw byte storage (checksums, checkpoints,
//! archiving) is generic over this trait in `directory.rs`.

use schema_connector::{ConnectorError, ConnectorResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub trait DirectoryBackend: Send + Sync {
    fn list_names(&self) -> Vec<String>;
    fn read(&self, name: &str) -> Option<Vec<u8>>;
    fn write(&self, name: &str, bytes: Vec<u8>) -> ConnectorResult<()>;
    fn remove(&self, name: &str) -> ConnectorResult<()>;
}

/// An on-disk directory: one file per migration plus `atlas.sum`, in a
/// single flat directory.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalBackend { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl DirectoryBackend for LocalBackend {
    fn list_names(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect()
    }

    fn read(&self, name: &str) -> Option<Vec<u8>> {
        fs::read(self.root.join(name)).ok()
    }

    fn write(&self, name: &str, bytes: Vec<u8>) -> ConnectorResult<()> {
        fs::create_dir_all(&self.root).map_err(|e| ConnectorError::driver(e, None))?;
        fs::write(self.root.join(name), bytes).map_err(|e| ConnectorError::driver(e, None))
    }

    fn remove(&self, name: &str) -> ConnectorResult<()> {
        fs::remove_file(self.root.join(name)).map_err(|e| ConnectorError::driver(e, None))
    }
}

/// The payload behind a named entry in the process-wide in-memory
/// registry. Shared
/// via `Arc<Mutex<_>>` so every `MemBackend` handle pointing at the same
/// name observes the same files, and writes can be mirrored to
/// registered sinks.
#[derive(Debug, Default)]
struct MemState {
    files: BTreeMap<String, Vec<u8>>,
    sinks: Vec<Box<dyn Fn(&str, &[u8]) + Send + Sync>>,
}

#[derive(Clone)]
pub struct MemBackend {
    state: Arc<Mutex<MemState>>,
}

impl std::fmt::Debug for MemBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemBackend").finish()
    }
}

impl MemBackend {
    pub(crate) fn new() -> Self {
        MemBackend {
            state: Arc::new(Mutex::new(MemState::default())),
        }
    }

    /// Registers a sync hook invoked with `(name, bytes)` every time a
    /// file is written to this in-memory directory.
    pub fn register_sink(&self, sink: impl Fn(&str, &[u8]) + Send + Sync + 'static) {
        self.state.lock().unwrap().sinks.push(Box::new(sink));
    }
}

impl DirectoryBackend for MemBackend {
    fn list_names(&self) -> Vec<String> {
        self.state.lock().unwrap().files.keys().cloned().collect()
    }

    fn read(&self, name: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(name).cloned()
    }

    fn write(&self, name: &str, bytes: Vec<u8>) -> ConnectorResult<()> {
        let mut state = self.state.lock().unwrap();
        for sink in &state.sinks {
            sink(name, &bytes);
        }
        state.files.insert(name.to_string(), bytes);
        Ok(())
    }

    fn remove(&self, name: &str) -> ConnectorResult<()> {
        self.state.lock().unwrap().files.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_backend_round_trips_bytes() {
        let backend = MemBackend::new();
        backend.write("1_init.sql", b"SELECT 1;".to_vec()).unwrap();
        assert_eq!(backend.read("1_init.sql"), Some(b"SELECT 1;".to_vec()));
        assert_eq!(backend.list_names(), vec!["1_init.sql".to_string()]);
    }

    #[test]
    fn mem_backend_sink_observes_writes() {
        let backend = MemBackend::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        backend.register_sink(move |name, bytes| {
            seen_clone.lock().unwrap().push((name.to_string(), bytes.to_vec()));
        });
        backend.write("1.sql", b"SELECT 1;".to_vec()).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
