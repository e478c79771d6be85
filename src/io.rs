//! Key/value storage underneath an N5 container

use crate::error::{N5Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Trait for the storage an N5 container lives in. Keys are `/`-separated
/// paths relative to the container root.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read the value at a key, `None` if it does not exist
    async fn read(&self, key: &str) -> Result<Option<Bytes>>;

    /// Write a value, creating intermediate levels as needed
    async fn write(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Check if a key or directory exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Create an empty directory level (N5 groups may have no attributes)
    async fn create_dir(&self, key: &str) -> Result<()>;

    /// Remove a key prefix and everything beneath it
    async fn erase(&self, key: &str) -> Result<()>;

    /// List the names of child directories under a prefix
    async fn list_dirs(&self, prefix: &str) -> Result<Vec<String>>;

    /// Human readable location, for logs
    fn location(&self) -> String;
}

/// File system store rooted at a container directory
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    base_path: PathBuf,
}

impl FileSystemStore {
    /// Create a new file system store
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Get the full path for a relative key
    fn full_path(&self, key: &str) -> PathBuf {
        let mut path = self.base_path.clone();
        for part in key.split('/').filter(|p| !p.is_empty() && *p != ".") {
            path.push(part);
        }
        path
    }
}

#[async_trait]
impl Store for FileSystemStore {
    async fn read(&self, key: &str) -> Result<Option<Bytes>> {
        match fs::read(self.full_path(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(N5Error::Io(e)),
        }
    }

    async fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(key);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&full_path).await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(fs::try_exists(self.full_path(key)).await?)
    }

    async fn create_dir(&self, key: &str) -> Result<()> {
        fs::create_dir_all(self.full_path(key)).await?;
        Ok(())
    }

    async fn erase(&self, key: &str) -> Result<()> {
        let full_path = self.full_path(key);
        match fs::metadata(&full_path).await {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&full_path).await?,
            Ok(_) => fs::remove_file(&full_path).await?,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(N5Error::Io(e)),
        }
        Ok(())
    }

    async fn list_dirs(&self, prefix: &str) -> Result<Vec<String>> {
        let full_path = self.full_path(prefix);
        let mut entries = Vec::new();

        let mut read_dir = match fs::read_dir(&full_path).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(N5Error::Io(e)),
        };

        while let Some(entry) = read_dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                entries.push(name.to_string());
            }
        }

        entries.sort();
        Ok(entries)
    }

    fn location(&self) -> String {
        self.base_path.display().to_string()
    }
}
