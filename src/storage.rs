use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

/// Current on-disk schema version. Bumped when partitions are added or
/// option keys are renamed; `Store::open` upgrades older layouts in place.
pub const SCHEMA_VERSION: u64 = 2;

/// Logical partitions every store carries after migration.
pub const PARTITIONS: &[&str] = &["credentials", "options", "misc", "hashes"];

/// Option keys renamed between schema v1 and v2. The old value is copied
/// forward and the old key deleted during upgrade.
const LEGACY_OPTION_RENAMES: &[(&str, &str)] = &[
    ("closeTabAfterSave", "closeTab"),
    ("showNotifications", "notifySuccess"),
];

const SCHEMA_IDENT: &str = "schema";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("partition '{0}' is corrupt: {1}")]
    Corrupt(String, serde_json::Error),

    #[error("store schema version {0} is newer than supported version {SCHEMA_VERSION}")]
    VersionMismatch(u64),
}

pub trait StorageBackend: Send + Sync {
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()>;
    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>>;
    fn exists(&self, ident: &str) -> bool;
    fn delete(&self, ident: &str) -> std::io::Result<()>;
    fn list(&self) -> Vec<String>;
}

/// File-per-ident backend. Writes go through a temp file and rename so a
/// crash mid-write never leaves a truncated partition behind.
#[derive(Clone)]
pub struct FileBackend {
    base_dir: PathBuf,
}

impl FileBackend {
    pub fn new(base_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(FileBackend { base_dir })
    }
}

impl StorageBackend for FileBackend {
    fn exists(&self, ident: &str) -> bool {
        std::fs::metadata(self.base_dir.join(ident)).is_ok()
    }

    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.base_dir.join(ident))
    }

    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        let temp_name = format!("{}-{ident}", rusty_ulid::generate_ulid_string());
        let temp_path = self.base_dir.join(temp_name);
        std::fs::write(&temp_path, data)?;
        std::fs::rename(&temp_path, self.base_dir.join(ident))
    }

    fn delete(&self, ident: &str) -> std::io::Result<()> {
        std::fs::remove_file(self.base_dir.join(ident))
    }

    fn list(&self) -> Vec<String> {
        std::fs::read_dir(&self.base_dir)
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .filter_map(|entry| {
                        let path = entry.path();
                        if path.is_file() {
                            path.file_name()
                                .and_then(|name| name.to_str())
                                .map(|s| s.to_string())
                        } else {
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Partitioned key/value store. Each partition is one JSON document of
/// independent key→value records; values overwrite per key, never as a
/// whole-partition blob from the caller's point of view.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn StorageBackend>,
}

impl Store {
    /// Open the store, creating missing partitions and running the
    /// version-gated schema upgrade. Open failures propagate; callers
    /// above this layer do not catch them.
    pub fn open(backend: Arc<dyn StorageBackend>) -> Result<Self, StoreError> {
        Self::open_with_partitions(backend, PARTITIONS)
    }

    /// Open with a caller-supplied partition set. Used by the cache-only
    /// store, whose partitions differ from the main layout.
    pub fn open_with_partitions(
        backend: Arc<dyn StorageBackend>,
        partitions: &[&str],
    ) -> Result<Self, StoreError> {
        let store = Store { backend };
        store.migrate(partitions)?;
        Ok(store)
    }

    fn migrate(&self, partitions: &[&str]) -> Result<(), StoreError> {
        let version = self.read_schema_version()?;

        if version > SCHEMA_VERSION {
            return Err(StoreError::VersionMismatch(version));
        }

        for partition in partitions {
            if !self.backend.exists(&partition_ident(partition)) {
                self.write_partition(partition, &serde_json::Map::new())?;
            }
        }

        if version < 2 && partitions.contains(&"options") {
            let mut options = self.read_partition("options")?;
            for (old, new) in LEGACY_OPTION_RENAMES {
                if let Some(value) = options.remove(*old) {
                    log::debug!("migrating option '{old}' to '{new}'");
                    options.entry(new.to_string()).or_insert(value);
                }
            }
            self.write_partition("options", &options)?;
        }

        if version != SCHEMA_VERSION {
            let schema = serde_json::json!({ "version": SCHEMA_VERSION });
            self.backend
                .write(SCHEMA_IDENT, schema.to_string().as_bytes())?;
        }

        Ok(())
    }

    fn read_schema_version(&self) -> Result<u64, StoreError> {
        match self.backend.read(SCHEMA_IDENT) {
            Ok(bytes) => {
                let schema: Value = serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Corrupt(SCHEMA_IDENT.to_string(), e))?;
                Ok(schema.get("version").and_then(Value::as_u64).unwrap_or(1))
            }
            // no schema record: either a fresh install or a v1 layout
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(1),
            Err(e) => Err(e.into()),
        }
    }

    fn read_partition(&self, partition: &str) -> Result<serde_json::Map<String, Value>, StoreError> {
        match self.backend.read(&partition_ident(partition)) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Corrupt(partition.to_string(), e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(serde_json::Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_partition(
        &self,
        partition: &str,
        records: &serde_json::Map<String, Value>,
    ) -> Result<(), StoreError> {
        let data = serde_json::to_vec(records)
            .map_err(|e| StoreError::Corrupt(partition.to_string(), e))?;
        self.backend.write(&partition_ident(partition), &data)?;
        Ok(())
    }

    /// Load the requested keys. Absent keys are simply absent from the
    /// returned map; a missing key is never an error.
    pub fn load(
        &self,
        partition: &str,
        keys: &[&str],
    ) -> Result<HashMap<String, Value>, StoreError> {
        let records = self.read_partition(partition)?;
        Ok(keys
            .iter()
            .filter_map(|key| records.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect())
    }

    /// Load a single key, `None` when absent.
    pub fn load_one(&self, partition: &str, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read_partition(partition)?.get(key).cloned())
    }

    /// Return every record in the partition. Best-effort: an unreadable
    /// partition yields an empty list rather than an error.
    pub fn load_all(&self, partition: &str) -> Vec<(String, Value)> {
        match self.read_partition(partition) {
            Ok(records) => records.into_iter().collect(),
            Err(e) => {
                log::warn!("load_all('{partition}') failed: {e}");
                Vec::new()
            }
        }
    }

    /// Persist each key/value pair as an independent record, overwriting
    /// prior values for the same key.
    pub fn store(&self, partition: &str, records: &[(&str, Value)]) -> Result<(), StoreError> {
        let mut existing = self.read_partition(partition)?;
        for (key, value) in records {
            existing.insert(key.to_string(), value.clone());
        }
        self.write_partition(partition, &existing)
    }

    /// Delete keys; a key that does not exist is not an error.
    pub fn delete(&self, partition: &str, keys: &[&str]) -> Result<(), StoreError> {
        let mut existing = self.read_partition(partition)?;
        let mut changed = false;
        for key in keys {
            changed |= existing.remove(*key).is_some();
        }
        if changed {
            self.write_partition(partition, &existing)?;
        }
        Ok(())
    }

    /// Drop every record in the partition.
    pub fn clear(&self, partition: &str) -> Result<(), StoreError> {
        self.write_partition(partition, &serde_json::Map::new())
    }

    /// Whether the partition exists at the backend level. Used by the
    /// cache pool's staleness check.
    pub fn has_partition(&self, partition: &str) -> bool {
        self.backend.exists(&partition_ident(partition))
    }
}

fn partition_ident(partition: &str) -> String {
    format!("{partition}.json")
}
