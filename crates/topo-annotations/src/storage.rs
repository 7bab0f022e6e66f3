//! Byte storage behind the annotation and topology files
//!
//! Implement [`Storage`] to put the files somewhere other than the local
//! filesystem. [`MemoryStorage`] keeps them in a map and counts writes.

use dashmap::DashMap;
use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Async file access
#[async_trait::async_trait]
pub trait Storage: Send + Sync + Debug {
    /// File content; `None` if the file does not exist
    async fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>>;

    /// Replace the file content, creating the file if needed
    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Whether the file exists
    async fn exists(&self, path: &Path) -> bool;
}

/// Local filesystem via `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

#[async_trait::async_trait]
impl Storage for FsStorage {
    async fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, data).await
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}

/// In-memory files; every call yields once so concurrent callers interleave
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: DashMap<PathBuf, Vec<u8>>,
    writes: AtomicUsize,
}

impl MemoryStorage {
    /// Empty storage
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without counting a write
    pub fn insert(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), data.into());
    }

    /// Current content of a file
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.get(path).map(|entry| entry.value().clone())
    }

    /// Number of writes performed
    #[inline]
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        tokio::task::yield_now().await;
        Ok(self.get(path))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        tokio::task::yield_now().await;
        self.files.insert(path.to_path_buf(), data.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fs_storage_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/a.json");
        assert_eq!(FsStorage.read(&path).await.unwrap(), None);
        assert!(!FsStorage.exists(&path).await);

        FsStorage.write(&path, b"{}").await.unwrap();
        assert_eq!(FsStorage.read(&path).await.unwrap(), Some(b"{}".to_vec()));
        assert!(FsStorage.exists(&path).await);
    }

    #[tokio::test]
    async fn memory_storage_counts_writes() {
        let storage = MemoryStorage::new();
        storage.insert("/a", "x");
        assert_eq!(storage.writes(), 0);
        storage.write(Path::new("/a"), b"y").await.unwrap();
        assert_eq!(storage.read(Path::new("/a")).await.unwrap(), Some(b"y".to_vec()));
        assert_eq!(storage.writes(), 1);
    }
}
