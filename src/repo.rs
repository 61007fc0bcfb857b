//! Named index registry with dirty tracking and snapshot I/O.

use crate::error::{RepoError, SnapshotError};
use crate::index::Index;
use crate::path::safe_join;
use crate::snapshot;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Suffix of snapshot files under the data directory.
const SNAPSHOT_SUFFIX: &str = ".out";

/// A validated index id.
///
/// Ids become snapshot file names, so anything that could change the
/// resolved path is rejected up front: empty (after trimming) ids and ids
/// containing `/`, `\` or `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexId(String);

impl IndexId {
    pub fn new(id: impl Into<String>) -> Result<Self, RepoError> {
        let id = id.into();
        if id.trim().is_empty() || id.contains(['/', '\\', '.']) {
            return Err(RepoError::InvalidIndex { id });
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An index paired with its repository id.
#[derive(Debug)]
pub struct NamedIndex {
    id: IndexId,
    index: Index,
}

impl NamedIndex {
    pub const fn new(id: IndexId, index: Index) -> Self {
        Self { id, index }
    }

    pub const fn id(&self) -> &IndexId {
        &self.id
    }

    pub const fn index(&self) -> &Index {
        &self.index
    }
}

/// Concurrent registry of named indexes.
///
/// When a data directory is configured the repository also tracks which
/// indexes changed since their last snapshot and can write/restore the
/// `<id>.out` files.
#[derive(Debug, Default)]
pub struct IndexRepository {
    indexes: DashMap<String, Arc<NamedIndex>>,
    dirty: DashSet<String>,
    data_dir: Option<PathBuf>,
}

impl IndexRepository {
    /// Registry without persistence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry persisting snapshots under `data_dir`.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            indexes: DashMap::new(),
            dirty: DashSet::new(),
            data_dir: Some(data_dir),
        }
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Insert a new index, failing if the id is taken. The new index is
    /// marked dirty so the next export sweep persists it.
    pub fn create(&self, named: NamedIndex) -> Result<(), RepoError> {
        let key = named.id().as_str().to_string();
        match self.indexes.entry(key.clone()) {
            Entry::Occupied(_) => Err(RepoError::IndexAlreadyExists { id: key }),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(named));
                self.dirty.insert(key);
                Ok(())
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<NamedIndex>> {
        self.indexes.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// All registered indexes, in no particular order.
    pub fn list(&self) -> Vec<Arc<NamedIndex>> {
        self.indexes
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Remove an index, its dirty mark and its snapshot file (if any).
    pub fn delete(&self, id: &str) -> Result<(), RepoError> {
        self.indexes
            .remove(id)
            .ok_or_else(|| RepoError::IndexDoesNotExist { id: id.to_string() })?;
        self.dirty.remove(id);

        if let Some(dir) = &self.data_dir {
            match safe_join(dir, &format!("{id}{SNAPSHOT_SUFFIX}")) {
                Ok(path) => {
                    if let Err(err) = std::fs::remove_file(&path) {
                        if err.kind() != std::io::ErrorKind::NotFound {
                            tracing::warn!(index = id, error = %err, "Failed to remove snapshot");
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(index = id, error = %err, "Refusing to remove snapshot");
                }
            }
        }
        Ok(())
    }

    /// Record that an index mutated since its last snapshot. Document
    /// writes route through this so the export sweep knows which files to
    /// rewrite.
    pub fn mark_dirty(&self, id: &str) {
        if self.indexes.contains_key(id) {
            self.dirty.insert(id.to_string());
        }
    }

    /// Whether an index is awaiting a snapshot. Exposed for tests and the
    /// export sweep's logging.
    pub fn is_dirty(&self, id: &str) -> bool {
        self.dirty.contains(id)
    }

    /// Write a snapshot for every dirty index.
    ///
    /// Best-effort per index: a failing index is logged and skipped, the
    /// sweep continues, and the first error is reported at the end.
    /// Returns the number of snapshots written.
    pub fn export_dirty(&self) -> Result<usize, SnapshotError> {
        let Some(dir) = self.data_dir.clone() else {
            return Ok(0);
        };
        ensure_data_dir(&dir)?;

        let ids: Vec<String> = self.dirty.iter().map(|id| id.key().clone()).collect();
        let mut first_error = None;
        let mut exported = 0;

        for id in ids {
            // Clear the flag before the write: a mutation racing with the
            // export re-marks the index instead of being lost.
            self.dirty.remove(&id);
            let Some(named) = self.get(&id) else {
                continue;
            };

            match export_index(&dir, &named) {
                Ok(()) => {
                    tracing::debug!(index = %id, "Snapshot written");
                    exported += 1;
                }
                Err(err) => {
                    tracing::warn!(index = %id, error = %err, "Snapshot export failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(exported),
        }
    }

    /// Restore every `<id>.out` snapshot found in the data directory.
    ///
    /// Called once at startup. Unreadable or corrupt files are logged and
    /// skipped. Returns the number of indexes restored.
    pub fn import_snapshots(&self) -> Result<usize, SnapshotError> {
        let Some(dir) = self.data_dir.clone() else {
            return Ok(0);
        };
        if !dir.is_dir() {
            return Ok(0);
        }

        let mut imported = 0;
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(id) = name.strip_suffix(SNAPSHOT_SUFFIX) else {
                continue;
            };

            match import_index(&entry.path(), id) {
                Ok(named) => {
                    self.indexes
                        .insert(id.to_string(), Arc::new(named));
                    imported += 1;
                    tracing::info!(index = id, "Snapshot restored");
                }
                Err(err) => {
                    tracing::warn!(file = name, error = %err, "Skipping snapshot");
                }
            }
        }
        Ok(imported)
    }
}

fn ensure_data_dir(dir: &Path) -> Result<(), SnapshotError> {
    if dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

/// Encode one index and atomically replace its snapshot file.
fn export_index(dir: &Path, named: &NamedIndex) -> Result<(), SnapshotError> {
    let path = safe_join(dir, &format!("{}{}", named.id(), SNAPSHOT_SUFFIX))?;
    let bytes = snapshot::encode(named.index())?;

    let tmp = path.with_extension("out.tmp");
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, &path)?;
    Ok(())
}

fn import_index(path: &Path, id: &str) -> Result<NamedIndex, SnapshotError> {
    let id = IndexId::new(id)
        .map_err(|err| SnapshotError::corrupt(err.to_string()))?;
    let bytes = std::fs::read(path)?;
    let index = snapshot::decode(&bytes)?;
    Ok(NamedIndex::new(id, index))
}
