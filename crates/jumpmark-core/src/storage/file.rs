//! File-backed store
//!
//! All top-level keys live in one JSON file (`jumpmarks.json` in the data
//! directory). Writes go through a uniquely named temporary file that is
//! synced and then renamed over the target, so the file is never left
//! half-written.
//!
//! There is no cross-process locking: two processes that read before either
//! writes will lose the first write. [`FileBackend::watch`] makes writes by
//! other processes visible to this instance's listeners.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::{Map, Value};
use tokio::fs;
use tracing::{debug, warn};

use crate::config::Config;
use crate::events::{Handler, HandlerId};
use crate::storage::backend::{
    check_quota, subscribe, ChangeBus, KeyValueBackend, StorageChange,
};
use crate::storage::error::{StorageError, StorageResult};

type Values = Map<String, Value>;

/// Backing store persisted as a JSON file
pub struct FileBackend {
    path: PathBuf,
    quota: Option<usize>,
    changes: Arc<ChangeBus>,
    /// File content as last seen, tracked only while watching
    known: Arc<Mutex<Option<Values>>>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl FileBackend {
    /// Create a backend for the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            quota: None,
            changes: Arc::new(ChangeBus::new()),
            known: Arc::new(Mutex::new(None)),
            watcher: Mutex::new(None),
        }
    }

    /// Create a backend using the configured store path and quota
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.store_path()).with_quota(config.quota_bytes)
    }

    /// Reject writes that would grow the file past `quota` bytes
    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the store file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Size of the store file on disk
    pub fn file_size(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    /// Announce changes that other writers make to the file
    ///
    /// Watches the directory holding the file, since every write replaces
    /// it. Each time the file changes, listeners of every top-level key
    /// whose value differs from the last seen content are called. Writes
    /// through this instance are still announced exactly once. Calling this
    /// again while watching does nothing.
    pub fn watch(&self) -> StorageResult<()> {
        let mut slot = lock(&self.watcher);
        if slot.is_some() {
            return Ok(());
        }

        let dir = parent_dir(&self.path);
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::write(e, dir.clone()))?;
        *lock(&self.known) = Some(read_values(&self.path).map(|(v, _)| v).unwrap_or_default());

        let path = self.path.clone();
        let known = Arc::clone(&self.known);
        let changes = Arc::clone(&self.changes);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let touches_store = matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) && event.paths.iter().any(|p| p.file_name() == path.file_name());

                if touches_store {
                    announce_external(&path, &known, &changes);
                }
            }
            Err(e) => warn!("Watch error on {:?}: {}", path, e),
        })
        .map_err(|source| StorageError::Watch {
            path: self.path.clone(),
            source,
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| StorageError::Watch {
                path: dir.clone(),
                source,
            })?;

        debug!("Watching {:?} for external changes", self.path);
        *slot = Some(watcher);
        Ok(())
    }

    async fn load(&self) -> StorageResult<Values> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| StorageError::read(e, self.path.clone()))?;
        parse_values(&self.path, &content)
    }
}

#[async_trait]
impl KeyValueBackend for FileBackend {
    async fn read(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.load().await?.remove(key))
    }

    async fn write(&self, key: &str, value: Value) -> StorageResult<()> {
        let mut values = self.load().await?;
        values.insert(key.to_string(), value);

        let bytes = serde_json::to_vec(&values)?;
        check_quota(bytes.len(), self.quota)?;

        // Recorded before the rename so the watcher sees nothing new
        let previous = lock(&self.known)
            .as_mut()
            .map(|known| std::mem::replace(known, values));
        if let Err(e) = atomic_write(&self.path, &bytes).await {
            if let (Some(previous), Some(known)) = (previous, lock(&self.known).as_mut()) {
                *known = previous;
            }
            return Err(e);
        }

        debug!("Wrote key {} to {:?} ({} bytes)", key, self.path, bytes.len());
        self.changes.emit(
            &key.to_string(),
            &StorageChange {
                key: key.to_string(),
                byte_len: bytes.len(),
            },
        );
        Ok(())
    }

    fn on_change(&self, key: &str, listener: Handler<StorageChange>) -> HandlerId {
        subscribe(&self.changes, key, listener)
    }

    fn remove_listener(&self, key: &str, id: HandlerId) -> bool {
        self.changes.off(&key.to_string(), id)
    }
}

/// Re-read the file after an outside change and announce the keys that differ
fn announce_external(path: &Path, known: &Mutex<Option<Values>>, changes: &ChangeBus) {
    let (current, byte_len) = match read_values(path) {
        Ok(read) => read,
        Err(e) => {
            debug!("Ignoring unreadable change to {:?}: {}", path, e);
            return;
        }
    };

    let changed = {
        let mut known = lock(known);
        let keys = changed_keys(known.as_ref().unwrap_or(&Map::new()), &current);
        *known = Some(current);
        keys
    };

    for key in changed {
        debug!("Key {} changed outside this instance", key);
        changes.emit(&key, &StorageChange { key: key.clone(), byte_len });
    }
}

/// Keys added, removed or replaced between two snapshots
fn changed_keys(before: &Values, after: &Values) -> Vec<String> {
    let mut keys: Vec<String> = after
        .iter()
        .filter(|(key, value)| before.get(*key) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect();
    keys.extend(before.keys().filter(|key| !after.contains_key(*key)).cloned());
    keys
}

/// Read the file synchronously, returning its values and size
fn read_values(path: &Path) -> StorageResult<(Values, usize)> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok((parse_values(path, &content)?, content.len())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok((Map::new(), 0)),
        Err(e) => Err(StorageError::read(e, path.to_path_buf())),
    }
}

fn parse_values(path: &Path, content: &str) -> StorageResult<Values> {
    if content.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str(content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StorageError::InvalidFormat {
            path: path.to_path_buf(),
            details: "top level is not an object".to_string(),
        }),
        Err(e) => Err(StorageError::InvalidFormat {
            path: path.to_path_buf(),
            details: e.to_string(),
        }),
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

async fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    let target = path.to_path_buf();
    let data = data.to_vec();
    let join_path = target.clone();
    tokio::task::spawn_blocking(move || replace_file(&target, &data))
        .await
        .map_err(|e| StorageError::write(io::Error::other(e), join_path))?
}

/// Write data to a file atomically
///
/// 1. Write to a uniquely named temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn replace_file(path: &Path, data: &[u8]) -> StorageResult<()> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(&dir).map_err(|e| StorageError::write(e, dir.clone()))?;

    let prefix = format!(
        ".{}.",
        path.file_name().map_or_else(|| "store".into(), |n| n.to_string_lossy())
    );
    let mut temp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(|e| StorageError::write(e, dir.clone()))?;

    temp.write_all(data)
        .map_err(|e| StorageError::write(e, temp.path().to_path_buf()))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| StorageError::write(e, temp.path().to_path_buf()))?;

    temp.persist(path)
        .map_err(|e| StorageError::AtomicWriteFailed {
            from: e.file.path().to_path_buf(),
            to: path.to_path_buf(),
            source: e.error,
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().join("jumpmarks.json"));

        assert!(!backend.exists());
        assert!(backend.read("jumpmarks").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("jumpmarks.json");

        FileBackend::new(&path)
            .write("jumpmarks", json!({"a.com": [1, 2]}))
            .await
            .unwrap();

        let reopened = FileBackend::new(&path);
        let value = reopened.read("jumpmarks").await.unwrap().unwrap();
        assert_eq!(value, json!({"a.com": [1, 2]}));
        assert!(reopened.file_size() > 0);
    }

    #[tokio::test]
    async fn test_write_keeps_other_keys() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().join("store.json"));

        backend.write("settings", json!({"theme": "dark"})).await.unwrap();
        backend.write("jumpmarks", json!({})).await.unwrap();

        assert_eq!(
            backend.read("settings").await.unwrap().unwrap(),
            json!({"theme": "dark"})
        );
    }

    #[tokio::test]
    async fn test_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a").join("b").join("jumpmarks.json");
        let backend = FileBackend::new(&path);

        backend.write("jumpmarks", json!({})).await.unwrap();
        assert!(path.exists());
        // No temporary file is left behind
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers_do_not_collide() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("jumpmarks.json");
        let first = Arc::new(FileBackend::new(&path));
        let second = Arc::new(FileBackend::new(&path));

        let mut writes = tokio::task::JoinSet::new();
        for n in 0..16 {
            let backend = if n % 2 == 0 { Arc::clone(&first) } else { Arc::clone(&second) };
            writes.spawn(async move { backend.write("jumpmarks", json!({ "n": n })).await });
        }
        while let Some(result) = writes.join_next().await {
            result.unwrap().unwrap();
        }

        assert!(first.read("jumpmarks").await.unwrap().is_some());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    async fn wait_for(calls: &AtomicUsize, expected: usize) {
        for _ in 0..100 {
            if calls.load(Ordering::SeqCst) >= expected {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    }

    #[tokio::test]
    async fn test_watch_announces_writes_from_another_instance() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("jumpmarks.json");

        let viewer = FileBackend::new(&path);
        viewer.watch().unwrap();
        viewer.watch().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let c = Arc::clone(&calls);
        let s = Arc::clone(&seen);
        viewer.on_change(
            "jumpmarks",
            Arc::new(move |change: &StorageChange| {
                s.lock().unwrap().push(change.clone());
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let writer = FileBackend::new(&path);
        writer.write("jumpmarks", json!({"a.com": []})).await.unwrap();
        wait_for(&calls, 1).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let change = seen.lock().unwrap()[0].clone();
        assert_eq!(change.key, "jumpmarks");
        assert_eq!(change.byte_len as u64, viewer.file_size());

        // Own writes are announced once, not again by the watcher
        viewer.write("jumpmarks", json!({"b.com": []})).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_changed_keys() {
        let before: Values = serde_json::from_value(json!({"a": 1, "b": 2, "c": 3})).unwrap();
        let after: Values = serde_json::from_value(json!({"a": 1, "b": 5, "d": 4})).unwrap();

        assert_eq!(changed_keys(&before, &after), vec!["b", "d", "c"]);
        assert!(changed_keys(&after, &after).is_empty());
    }

    #[tokio::test]
    async fn test_quota_rejects_write() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().join("jumpmarks.json")).with_quota(32);

        let err = backend
            .write("jumpmarks", json!("x".repeat(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert!(!backend.exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_invalid_format() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("jumpmarks.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = FileBackend::new(&path).read("jumpmarks").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidFormat { .. }));
    }

    #[tokio::test]
    async fn test_write_notifies_listeners() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().join("jumpmarks.json"));
        let calls = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&calls);
        backend.on_change(
            "jumpmarks",
            Arc::new(move |_: &StorageChange| {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );

        backend.write("jumpmarks", json!({})).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
