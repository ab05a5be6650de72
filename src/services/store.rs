//! File-backed entity store.
//!
//! Persists each entity as a directory holding a `facts.json` document and
//! a derived `summary.md` view. Saves are atomic (write to a temp file,
//! then rename) so a crash mid-write leaves either the old or the new
//! complete state, never a hybrid. Writers to the same entity are
//! serialized through an advisory lock file; a second writer that cannot
//! acquire the lock within the configured timeout gets `Error::Busy`
//! instead of corrupting data.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::fs;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{Entity, EntityKey, EntityType};

const FACTS_FILE: &str = "facts.json";
const SUMMARY_FILE: &str = "summary.md";
const LOCK_FILE: &str = ".lock";

/// Store for per-entity fact documents under a corpus directory.
pub struct EntityStore {
    para_dir: PathBuf,
    lock_timeout: Duration,
    lock_retry: Duration,
}

impl EntityStore {
    pub fn new(para_dir: impl Into<PathBuf>) -> Self {
        Self {
            para_dir: para_dir.into(),
            lock_timeout: Duration::from_millis(5000),
            lock_retry: Duration::from_millis(50),
        }
    }

    /// Override lock acquisition timing (timeout converts contention into
    /// `Busy`, retried on the next scheduled run).
    pub fn with_lock_timing(mut self, timeout: Duration, retry: Duration) -> Self {
        self.lock_timeout = timeout;
        self.lock_retry = retry.max(Duration::from_millis(1));
        self
    }

    pub fn para_dir(&self) -> &Path {
        &self.para_dir
    }

    pub fn entity_dir(&self, key: &EntityKey) -> PathBuf {
        key.storage_path(&self.para_dir)
    }

    pub fn facts_path(&self, key: &EntityKey) -> PathBuf {
        self.entity_dir(key).join(FACTS_FILE)
    }

    pub fn summary_path(&self, key: &EntityKey) -> PathBuf {
        self.entity_dir(key).join(SUMMARY_FILE)
    }

    /// Check whether an entity has been persisted.
    pub async fn exists(&self, key: &EntityKey) -> bool {
        fs::metadata(self.facts_path(key)).await.is_ok()
    }

    /// Load an entity's fact document.
    ///
    /// A missing file is `NotFound`; an unparseable one is `Corrupt`, which
    /// callers quarantine rather than letting it abort a whole run.
    pub async fn load(&self, key: &EntityKey) -> Result<Entity> {
        let path = self.facts_path(key);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map_err(|e| Error::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Load an entity if it exists.
    pub async fn try_load(&self, key: &EntityKey) -> Result<Option<Entity>> {
        match self.load(key).await {
            Ok(entity) => Ok(Some(entity)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Persist an entity's fact document atomically.
    pub async fn save(&self, key: &EntityKey, entity: &Entity) -> Result<()> {
        let path = self.facts_path(key);
        let content = serde_json::to_string_pretty(entity)
            .map_err(|e| Error::Internal(format!("Failed to serialize entity: {}", e)))?;
        write_atomic(&path, &content).await?;
        debug!(entity = %key, facts = entity.facts.len(), "saved entity");
        Ok(())
    }

    /// Persist an entity's regenerated summary view atomically.
    pub async fn save_summary(&self, key: &EntityKey, content: &str) -> Result<()> {
        write_atomic(&self.summary_path(key), content).await
    }

    pub async fn read_summary(&self, key: &EntityKey) -> Result<Option<String>> {
        match fs::read_to_string(self.summary_path(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List persisted entity keys in one type bucket.
    pub async fn list(&self, bucket: EntityType) -> Result<Vec<EntityKey>> {
        let type_dir = bucket.bucket_dir(&self.para_dir);

        let mut keys = Vec::new();
        let mut entries = match fs::read_dir(&type_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await.map_or(false, |t| t.is_dir()) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                let key = EntityKey::new(bucket, name);
                if self.exists(&key).await {
                    keys.push(key);
                }
            }
        }

        keys.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(keys)
    }

    /// List every persisted entity across all type buckets.
    pub async fn list_all(&self) -> Result<Vec<EntityKey>> {
        let mut keys = Vec::new();
        for bucket in EntityType::all() {
            keys.extend(self.list(*bucket).await?);
        }
        Ok(keys)
    }

    /// Acquire the per-entity write lock, waiting with backoff up to the
    /// configured timeout.
    pub async fn lock(&self, key: &EntityKey) -> Result<EntityLock> {
        let dir = self.entity_dir(key);
        fs::create_dir_all(&dir).await?;
        let lock_path = dir.join(LOCK_FILE);

        let start = Instant::now();
        loop {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
                .await
            {
                Ok(_) => {
                    return Ok(EntityLock {
                        path: lock_path,
                        released: false,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if start.elapsed() >= self.lock_timeout {
                        warn!(entity = %key, "lock acquisition timed out");
                        return Err(Error::Busy(key.to_string()));
                    }
                    tokio::time::sleep(self.lock_retry).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Write a file atomically: write to a sibling temp file, then rename.
pub(crate) async fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            Error::Internal(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)
        .await
        .map_err(|e| Error::Internal(format!("Failed to write {}: {}", temp_path.display(), e)))?;
    fs::rename(&temp_path, path)
        .await
        .map_err(|e| Error::Internal(format!("Failed to rename to {}: {}", path.display(), e)))?;

    Ok(())
}

/// Guard for an entity's advisory lock file. The lock is released on drop.
#[must_use = "the entity lock is released when this guard is dropped"]
pub struct EntityLock {
    path: PathBuf,
    released: bool,
}

impl EntityLock {
    /// Release the lock explicitly (also happens on drop).
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if !self.released {
            self.released = true;
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), "failed to remove lock file: {}", e);
                }
            }
        }
    }
}

impl Drop for EntityLock {
    fn drop(&mut self) {
        self.remove();
    }
}
