// src/storage.rs
use crate::error::AppResult;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Filesystem-backed store for rendered documents.
/// Paths handed out are relative to the root directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// Writes the bytes and returns the size on disk.
    pub async fn write(&self, path: &str, bytes: &[u8]) -> AppResult<u64> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&full, bytes).await?;
        let size = fs::metadata(&full).await?.len();
        tracing::debug!("Stored {} ({} bytes)", full.display(), size);
        Ok(size)
    }

    pub async fn read(&self, path: &str) -> AppResult<Vec<u8>> {
        Ok(fs::read(self.resolve(path)).await?)
    }

    pub async fn exists(&self, path: &str) -> bool {
        fs::try_exists(self.resolve(path)).await.unwrap_or(false)
    }

    pub async fn delete(&self, path: &str) -> AppResult<()> {
        fs::remove_file(self.resolve(path)).await?;
        tracing::debug!("Removed {}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_read_delete_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        let size = storage.write("letters/a.html", b"hello").await.unwrap();
        assert_eq!(size, 5);
        assert!(storage.exists("letters/a.html").await);
        assert_eq!(storage.read("letters/a.html").await.unwrap(), b"hello");

        storage.delete("letters/a.html").await.unwrap();
        assert!(!storage.exists("letters/a.html").await);
        assert!(storage.delete("letters/a.html").await.is_err());
    }
}
