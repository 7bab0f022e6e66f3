//! Annotation store
//!
//! Per topology file the sidecar moves through unloaded → cached (fresh) →
//! cached (stale) and back to unloaded on [`AnnotationStore::clear_cache`].
//! Writes to one sidecar are queued in call order; [`AnnotationStore::modify`]
//! additionally holds a per-path lock across its whole read-apply-write.

use crate::error::{AnnotationError, Result};
use crate::model::TopologyAnnotations;
use crate::storage::Storage;
use dashmap::DashMap;
use moka::future::Cache;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Default sidecar suffix appended to the topology file name
pub const DEFAULT_SUFFIX: &str = ".annotations.json";

/// Default freshness window of a cached sidecar
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(1);

const CACHE_CAPACITY: u64 = 1_024;

/// Cached, locked and queued reader/writer of annotation sidecars
#[derive(Debug)]
pub struct AnnotationStore {
    storage: Arc<dyn Storage>,
    cache: Cache<PathBuf, Arc<TopologyAnnotations>>,
    /// Held across a whole `modify`
    modify_locks: DashMap<PathBuf, Arc<Mutex<()>>>,
    /// Held across one physical write; FIFO, so writes land in call order
    write_queues: DashMap<PathBuf, Arc<Mutex<()>>>,
    suffix: String,
}

impl AnnotationStore {
    /// Store with the default freshness window and suffix
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_freshness(storage, DEFAULT_FRESHNESS)
    }

    /// Store whose cached copies expire after `freshness`
    #[must_use]
    pub fn with_freshness(storage: Arc<dyn Storage>, freshness: Duration) -> Self {
        Self {
            storage,
            cache: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(freshness)
                .build(),
            modify_locks: DashMap::new(),
            write_queues: DashMap::new(),
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }

    /// With a sidecar suffix other than `.annotations.json`
    #[inline]
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Sidecar path of a topology file: the file name plus the suffix
    #[must_use]
    pub fn sidecar_path(&self, topology: &Path) -> PathBuf {
        let mut name = topology.file_name().unwrap_or_default().to_os_string();
        name.push(&self.suffix);
        topology.with_file_name(name)
    }

    /// Annotations of a topology file
    ///
    /// A cached copy younger than the freshness window is returned unless
    /// `skip_cache` is set. A missing sidecar reads as empty.
    ///
    /// # Errors
    /// `AnnotationError::Io` on a failed read, `AnnotationError::Json` on
    /// malformed content
    pub async fn load(&self, topology: &Path, skip_cache: bool) -> Result<TopologyAnnotations> {
        let path = self.sidecar_path(topology);
        if !skip_cache {
            if let Some(cached) = self.cache.get(&path).await {
                debug!(path = %path.display(), "annotation cache hit");
                return Ok((*cached).clone());
            }
        }

        let annotations = self.read(&path).await?;
        self.cache.insert(path, Arc::new(annotations.clone())).await;
        Ok(annotations)
    }

    async fn read(&self, path: &Path) -> Result<TopologyAnnotations> {
        let bytes = self.storage.read(path).await.map_err(|err| {
            error!(path = %path.display(), error = %err, "annotation read failed");
            AnnotationError::io(path, err)
        })?;
        match bytes {
            Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => {
                serde_json::from_slice(&bytes).map_err(|err| AnnotationError::json(path, err))
            }
            _ => Ok(TopologyAnnotations::default()),
        }
    }

    /// Write annotations unless the file already holds the same bytes
    ///
    /// Returns whether a physical write happened. The cache is refreshed
    /// either way.
    ///
    /// # Errors
    /// `AnnotationError::Io` if reading back or writing fails
    pub async fn save(&self, topology: &Path, annotations: &TopologyAnnotations) -> Result<bool> {
        let path = self.sidecar_path(topology);
        let mut content =
            serde_json::to_vec_pretty(annotations).map_err(|err| AnnotationError::json(&path, err))?;
        content.push(b'\n');

        let queue = Self::slot(&self.write_queues, &path);
        let written = {
            let _turn = queue.lock().await;
            self.write_if_changed(&path, &content).await
        };
        drop(queue);
        Self::release(&self.write_queues, &path);

        let written = written?;
        self.cache.insert(path, Arc::new(annotations.clone())).await;
        Ok(written)
    }

    async fn write_if_changed(&self, path: &Path, content: &[u8]) -> Result<bool> {
        let on_disk = self
            .storage
            .read(path)
            .await
            .map_err(|err| AnnotationError::io(path, err))?;
        let unchanged = on_disk.is_some_and(|bytes| blake3::hash(&bytes) == blake3::hash(content));
        if unchanged {
            debug!(path = %path.display(), "annotations unchanged, skipping write");
            return Ok(false);
        }
        self.storage.write(path, content).await.map_err(|err| {
            error!(path = %path.display(), error = %err, "annotation write failed");
            AnnotationError::io(path, err)
        })?;
        info!(path = %path.display(), bytes = content.len(), "annotations saved");
        Ok(true)
    }

    /// Atomic read-modify-write of a topology file's annotations
    ///
    /// Reads bypass the cache. Concurrent `modify` calls on the same file run
    /// one after another, so none of them loses another's change.
    ///
    /// # Errors
    /// Any load or save error; the sidecar is left as it was
    pub async fn modify<F>(&self, topology: &Path, apply: F) -> Result<TopologyAnnotations>
    where
        F: FnOnce(&mut TopologyAnnotations) + Send,
    {
        let path = self.sidecar_path(topology);
        let lock = Self::slot(&self.modify_locks, &path);
        let result = {
            let _guard = lock.lock().await;
            match self.load(topology, true).await {
                Ok(mut annotations) => {
                    apply(&mut annotations);
                    self.save(topology, &annotations).await.map(|_| annotations)
                }
                Err(err) => Err(err),
            }
        };
        drop(lock);
        Self::release(&self.modify_locks, &path);
        result
    }

    /// Forget the cached copy of one topology file, or of all of them
    pub async fn clear_cache(&self, topology: Option<&Path>) {
        match topology {
            Some(topology) => self.cache.invalidate(&self.sidecar_path(topology)).await,
            None => self.cache.invalidate_all(),
        }
    }

    fn slot(slots: &DashMap<PathBuf, Arc<Mutex<()>>>, path: &Path) -> Arc<Mutex<()>> {
        slots
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop a path's slot once nobody holds or waits on it
    fn release(slots: &DashMap<PathBuf, Arc<Mutex<()>>>, path: &Path) {
        slots.remove_if(path, |_, slot| Arc::strong_count(slot) == 1);
    }
}
