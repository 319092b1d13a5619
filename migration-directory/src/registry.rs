//! The process-wide in-memory directory registry. A concurrent map guarded by a mutex, with
//! open/close operations adjusting a refcount per name; the entry is
//! dropped once its refcount reaches zero. Tests must open and close
//! directories in balanced pairs — the registry is process-owned, not
//! scoped to any one `MigrationDirectory`.

use crate::backend::MemBackend;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;

struct Entry {
    backend: MemBackend,
    refcount: usize,
}

static REGISTRY: Lazy<Mutex<HashMap<String, Entry>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// A handle to a named in-memory directory. Dropping it does not close
/// the registry entry — callers call [`MemDirHandle::close`] explicitly
/// rather than relying on `Drop` for a process-global side effect.
pub struct MemDirHandle {
    name: String,
    backend: MemBackend,
}

impl MemDirHandle {
    pub fn backend(&self) -> MemBackend {
        self.backend.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decrements this name's refcount, removing the entry at zero
    /// on close.
    pub fn close(self) {
        let mut registry = REGISTRY.lock().unwrap();
        if let Some(entry) = registry.get_mut(&self.name) {
            entry.refcount -= 1;
            if entry.refcount == 0 {
                registry.remove(&self.name);
            }
        }
    }
}

/// Opens (creating if absent) the named in-memory directory and
/// increments its refcount.
pub fn open_mem_dir(name: impl Into<String>) -> MemDirHandle {
    let name = name.into();
    let mut registry = REGISTRY.lock().unwrap();
    let entry = registry.entry(name.clone()).or_insert_with(|| Entry {
        backend: MemBackend::new(),
        refcount: 0,
    });
    entry.refcount += 1;
    MemDirHandle {
        name,
        backend: entry.backend.clone(),
    }
}

/// Number of distinct names currently registered — exposed for tests
/// that need to assert the registry returns to empty.
pub fn registered_count() -> usize {
    REGISTRY.lock().unwrap().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DirectoryBackend;

    #[test]
    fn opening_the_same_name_twice_shares_one_backend() {
        let name = "test_shared_backend_dir";
        let a = open_mem_dir(name);
        let b = open_mem_dir(name);
        a.backend().write("1.sql", b"SELECT 1;".to_vec()).unwrap();
        assert_eq!(b.backend().read("1.sql"), Some(b"SELECT 1;".to_vec()));
        a.close();
        b.close();
    }

    #[test]
    fn refcount_reaches_zero_only_after_every_handle_closes() {
        let name = "test_refcount_dir";
        let before = registered_count();
        let a = open_mem_dir(name);
        let b = open_mem_dir(name);
        assert_eq!(registered_count(), before + 1);
        a.close();
        assert_eq!(registered_count(), before + 1, "still held by b");
        b.close();
        assert_eq!(registered_count(), before);
    }
}
