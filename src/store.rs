//! Durable booking-to-task mapping persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::Mutex;

use crate::errors::{SinkError, SinkResult};

/// A persisted booking-to-task association.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMapping {
    /// Todoist task id (opaque to this service)
    pub task_id: String,
    /// When the mapping was first persisted
    pub created_at: DateTime<Utc>,
}

/// Durable key-value persistence for booking uid to task id mappings.
///
/// The dispatcher has no other durable memory: every reconciliation rule
/// resolves its target task through this store.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Persist a mapping for a booking uid, replacing any existing entry.
    async fn save(&self, booking_uid: &str, task_id: &str) -> SinkResult<()>;

    /// Look up the task id mapped to a booking uid.
    async fn get(&self, booking_uid: &str) -> SinkResult<Option<String>>;

    /// Remove the mapping for a booking uid, if present.
    async fn delete(&self, booking_uid: &str) -> SinkResult<()>;
}

/// File-backed mapping store.
///
/// All mappings live in a single JSON document rewritten on every mutation
/// via write-then-rename. A process-local mutex serializes mutations; the
/// reconciliation rules stay idempotent, so cross-process races degrade to
/// redundant task-tracker calls rather than corrupted state.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Create a store backed by the given file path. The file is created on
    /// first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> SinkResult<HashMap<String, TaskMapping>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                SinkError::store(format!(
                    "failed to parse {}: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(SinkError::store(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn persist(&self, mappings: &HashMap<String, TaskMapping>) -> SinkResult<()> {
        let bytes = serde_json::to_vec_pretty(mappings)
            .map_err(|e| SinkError::store(format!("failed to serialize mappings: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await.map_err(|e| {
            SinkError::store(format!("failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            SinkError::store(format!("failed to rename {}: {e}", tmp.display()))
        })
    }
}

#[async_trait]
impl MappingStore for FileStore {
    async fn save(&self, booking_uid: &str, task_id: &str) -> SinkResult<()> {
        let _guard = self.lock.lock().await;
        let mut mappings = self.load().await?;
        mappings.insert(
            booking_uid.to_string(),
            TaskMapping {
                task_id: task_id.to_string(),
                created_at: Utc::now(),
            },
        );
        self.persist(&mappings).await
    }

    async fn get(&self, booking_uid: &str) -> SinkResult<Option<String>> {
        let _guard = self.lock.lock().await;
        let mappings = self.load().await?;
        Ok(mappings.get(booking_uid).map(|m| m.task_id.clone()))
    }

    async fn delete(&self, booking_uid: &str) -> SinkResult<()> {
        let _guard = self.lock.lock().await;
        let mut mappings = self.load().await?;
        if mappings.remove(booking_uid).is_some() {
            self.persist(&mappings).await?;
        }
        Ok(())
    }
}

/// In-memory mapping store for tests and local development.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, TaskMapping>>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MappingStore for MemoryStore {
    async fn save(&self, booking_uid: &str, task_id: &str) -> SinkResult<()> {
        self.inner.lock().await.insert(
            booking_uid.to_string(),
            TaskMapping {
                task_id: task_id.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get(&self, booking_uid: &str) -> SinkResult<Option<String>> {
        Ok(self
            .inner
            .lock()
            .await
            .get(booking_uid)
            .map(|m| m.task_id.clone()))
    }

    async fn delete(&self, booking_uid: &str) -> SinkResult<()> {
        self.inner.lock().await.remove(booking_uid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.json");
        let store = FileStore::new(&path);

        assert_eq!(store.get("abc123").await.unwrap(), None);

        store.save("abc123", "task-1").await.unwrap();
        assert_eq!(
            store.get("abc123").await.unwrap(),
            Some("task-1".to_string())
        );

        store.delete("abc123").await.unwrap();
        assert_eq!(store.get("abc123").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_overwrites_existing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("mappings.json"));

        store.save("abc123", "task-1").await.unwrap();
        store.save("abc123", "task-2").await.unwrap();
        assert_eq!(
            store.get("abc123").await.unwrap(),
            Some("task-2".to_string())
        );
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.json");

        {
            let store = FileStore::new(&path);
            store.save("abc123", "task-1").await.unwrap();
            store.save("def456", "task-2").await.unwrap();
        }

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get("abc123").await.unwrap(),
            Some("task-1".to_string())
        );
        assert_eq!(
            reopened.get("def456").await.unwrap(),
            Some("task-2".to_string())
        );
    }

    #[tokio::test]
    async fn test_file_store_delete_missing_key_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("mappings.json"));
        store.delete("never-saved").await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.save("abc123", "task-1").await.unwrap();
        assert_eq!(
            store.get("abc123").await.unwrap(),
            Some("task-1".to_string())
        );
        store.delete("abc123").await.unwrap();
        assert_eq!(store.get("abc123").await.unwrap(), None);
    }
}
