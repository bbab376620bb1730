use crate::app::ports::DocumentStorePort;
use crate::error::StoreError;
use crate::types::EventRecord;
use async_trait::async_trait;
use fs2::FileExt;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tracing::debug;

type Collection = BTreeMap<String, EventRecord>;

/// Rejects the batch if it repeats an id or collides with an existing document.
fn check_create_only(
    collection_name: &str,
    existing: &Collection,
    docs: &[(String, EventRecord)],
) -> Result<(), StoreError> {
    let mut seen = HashSet::new();
    for (id, _) in docs {
        if existing.contains_key(id) || !seen.insert(id.as_str()) {
            return Err(StoreError::Conflict {
                collection: collection_name.to_string(),
                id: id.clone(),
            });
        }
    }
    Ok(())
}

/// In-memory document store for development/testing
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: Mutex<HashMap<String, Collection>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<EventRecord> {
        let collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        collections.get(collection).and_then(|c| c.get(id)).cloned()
    }

    pub fn ids(&self, collection: &str) -> Vec<String> {
        let collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        collections
            .get(collection)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Seed a document directly, bypassing create-only checks.
    pub fn insert(&self, collection: &str, record: EventRecord) {
        let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(record.id.clone(), record);
    }
}

#[async_trait]
impl DocumentStorePort for InMemoryDocumentStore {
    async fn exists(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        Ok(collections
            .get(collection)
            .map(|c| c.contains_key(id))
            .unwrap_or(false))
    }

    async fn batch_create(
        &self,
        collection: &str,
        docs: Vec<(String, EventRecord)>,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        let target = collections.entry(collection.to_string()).or_default();
        check_create_only(collection, target, &docs)?;
        let count = docs.len();
        target.extend(docs);
        debug!("Created {} documents in '{}'", count, collection);
        Ok(())
    }
}

/// File-backed document store: one pretty-printed JSON object per collection at
/// `<data_dir>/<collection>.json`, replaced atomically (temp file + rename) on every batch.
///
/// Batches hold an exclusive advisory lock on `<collection>.json.lock` from load to rename,
/// so stores in other processes (or other instances in this one) serialize against it.
pub struct JsonFileDocumentStore {
    data_dir: PathBuf,
    // last parsed snapshot per collection, reused while the file is unchanged
    snapshots: Mutex<HashMap<String, Snapshot>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

struct Snapshot {
    stamp: FileStamp,
    docs: Arc<Collection>,
}

impl JsonFileDocumentStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.data_dir.join(format!("{collection}.json"))
    }

    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<EventRecord>, StoreError> {
        Ok(self.snapshot(collection).await?.get(id).cloned())
    }

    /// Parsed collection, re-read only when the file's mtime or length changed. Collections
    /// only grow, so every committed batch changes the length.
    ///
    /// A stale answer can only make `exists` report "absent"; the batch re-checks
    /// against the file under the lock.
    async fn snapshot(&self, collection: &str) -> Result<Arc<Collection>, StoreError> {
        let path = self.collection_path(collection);
        let stamp = match tokio::fs::metadata(&path).await {
            Ok(meta) => FileStamp {
                modified: meta
                    .modified()
                    .map_err(|e| StoreError::Backend(format!("no mtime for {:?}: {}", path, e)))?,
                len: meta.len(),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Arc::new(Collection::new()))
            }
            Err(e) => {
                return Err(StoreError::Backend(format!("failed to stat {:?}: {}", path, e)))
            }
        };

        {
            let snapshots = self.snapshots.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(hit) = snapshots.get(collection).filter(|s| s.stamp == stamp) {
                return Ok(hit.docs.clone());
            }
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Arc::new(Collection::new()))
            }
            Err(e) => {
                return Err(StoreError::Backend(format!("failed to read {:?}: {}", path, e)))
            }
        };
        let docs = Arc::new(parse_collection(&path, &bytes)?);
        debug!("Loaded {} documents from {:?}", docs.len(), path);
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                collection.to_string(),
                Snapshot {
                    stamp,
                    docs: docs.clone(),
                },
            );
        Ok(docs)
    }
}

fn parse_collection(path: &Path, bytes: &[u8]) -> Result<Collection, StoreError> {
    serde_json::from_slice(bytes)
        .map_err(|e| StoreError::Backend(format!("corrupt collection {:?}: {}", path, e)))
}

fn read_collection(path: &Path) -> Result<Collection, StoreError> {
    match std::fs::read(path) {
        Ok(bytes) => parse_collection(path, &bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Collection::new()),
        Err(e) => Err(StoreError::Backend(format!("failed to read {:?}: {}", path, e))),
    }
}

/// Load, check, write and rename while holding the collection's lock file.
fn commit_batch(
    data_dir: &Path,
    path: &Path,
    collection: &str,
    docs: Vec<(String, EventRecord)>,
) -> Result<(), StoreError> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| StoreError::Backend(format!("failed to create {:?}: {}", data_dir, e)))?;

    let lock_path = path.with_extension("json.lock");
    let lock = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| StoreError::Backend(format!("failed to open {:?}: {}", lock_path, e)))?;
    lock.lock_exclusive()
        .map_err(|e| StoreError::Backend(format!("failed to lock {:?}: {}", lock_path, e)))?;

    let result = replace_collection(path, collection, docs);
    FileExt::unlock(&lock)
        .map_err(|e| StoreError::Backend(format!("failed to unlock {:?}: {}", lock_path, e)))?;
    result
}

fn replace_collection(
    path: &Path,
    collection: &str,
    docs: Vec<(String, EventRecord)>,
) -> Result<(), StoreError> {
    let mut existing = read_collection(path)?;
    check_create_only(collection, &existing, &docs)?;

    existing.extend(docs);
    let body = serde_json::to_vec_pretty(&existing)
        .map_err(|e| StoreError::Backend(format!("failed to serialize '{}': {}", collection, e)))?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, body)
        .map_err(|e| StoreError::Backend(format!("failed to write {:?}: {}", tmp, e)))?;
    std::fs::rename(&tmp, path)
        .map_err(|e| StoreError::Backend(format!("failed to replace {:?}: {}", path, e)))?;
    Ok(())
}

#[async_trait]
impl DocumentStorePort for JsonFileDocumentStore {
    async fn exists(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        Ok(self.snapshot(collection).await?.contains_key(id))
    }

    async fn batch_create(
        &self,
        collection: &str,
        docs: Vec<(String, EventRecord)>,
    ) -> Result<(), StoreError> {
        let data_dir = self.data_dir.clone();
        let path = self.collection_path(collection);
        let name = collection.to_string();
        let count = docs.len();

        let task_path = path.clone();
        tokio::task::spawn_blocking(move || commit_batch(&data_dir, &task_path, &name, docs))
            .await
            .map_err(|e| StoreError::Backend(format!("batch task failed: {}", e)))??;

        debug!("Created {} documents in {:?}", count, path);
        Ok(())
    }
}
