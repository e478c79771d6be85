//! N5 container - groups, attributes and datasets under one root directory

use crate::access::Dataset;
use crate::error::{N5Error, Result};
use crate::io::{FileSystemStore, Store};
use crate::metadata::{DatasetAttributes, N5Version, VERSION_KEY};
use crate::utils::{attributes_key, join_key};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// An N5 container on the local filesystem
#[derive(Clone)]
pub struct N5Container {
    root: PathBuf,
    store: Arc<dyn Store>,
}

impl std::fmt::Debug for N5Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("N5Container")
            .field("root", &self.root)
            .finish()
    }
}

impl N5Container {
    /// Open an existing container
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let store: Arc<dyn Store> = Arc::new(FileSystemStore::new(&root));
        if !store.exists("").await? {
            return Err(N5Error::NotFound(format!(
                "no N5 container at {}",
                root.display()
            )));
        }

        let container = Self { root, store };
        if let Some(version) = container.version().await? {
            if !version.is_supported() {
                return Err(N5Error::UnsupportedVersion(version.to_string()));
            }
        }
        Ok(container)
    }

    /// Open a container, creating it and its version attribute if needed
    pub async fn create(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let store: Arc<dyn Store> = Arc::new(FileSystemStore::new(&root));
        store.create_dir("").await?;

        let container = Self { root, store };
        match container.version().await? {
            Some(version) if !version.is_supported() => {
                return Err(N5Error::UnsupportedVersion(version.to_string()))
            }
            Some(_) => {}
            None => {
                let mut attrs = Map::new();
                attrs.insert(
                    VERSION_KEY.to_string(),
                    Value::String(N5Version::CURRENT.to_string()),
                );
                container.set_attributes("", attrs).await?;
            }
        }
        Ok(container)
    }

    /// Root directory of the container
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Version declared in the root attributes, if any
    pub async fn version(&self) -> Result<Option<N5Version>> {
        match self.attributes("").await?.get(VERSION_KEY) {
            Some(Value::String(v)) => Ok(Some(v.parse()?)),
            Some(other) => Err(N5Error::InvalidFormat(format!(
                "N5 version attribute is not a string: {}",
                other
            ))),
            None => Ok(None),
        }
    }

    /// Attributes of a group or dataset, empty if it has none
    pub async fn attributes(&self, path: &str) -> Result<Map<String, Value>> {
        let Some(bytes) = self.store.read(&attributes_key(path)).await? else {
            return Ok(Map::new());
        };
        match serde_json::from_slice(&bytes)? {
            Value::Object(map) => Ok(map),
            other => Err(N5Error::Metadata(format!(
                "attributes of {:?} are not an object: {}",
                path, other
            ))),
        }
    }

    /// Merge attributes into a group or dataset
    pub async fn set_attributes(&self, path: &str, attributes: Map<String, Value>) -> Result<()> {
        let mut merged = self.attributes(path).await?;
        merged.extend(attributes);
        let json = serde_json::to_vec_pretty(&Value::Object(merged))?;
        self.store.write(&attributes_key(path), &json).await
    }

    /// Check if a group or dataset exists
    pub async fn exists(&self, path: &str) -> Result<bool> {
        self.store.exists(path).await
    }

    /// Check if a path holds a dataset
    pub async fn is_dataset(&self, path: &str) -> Result<bool> {
        if !self.exists(path).await? {
            return Ok(false);
        }
        Ok(DatasetAttributes::is_dataset(&self.attributes(path).await?))
    }

    /// Create a group and its parents
    pub async fn create_group(&self, path: &str) -> Result<()> {
        self.store.create_dir(path).await
    }

    /// Remove a group or dataset and everything below it
    pub async fn remove(&self, path: &str) -> Result<()> {
        self.store.erase(path).await
    }

    /// Create a dataset, replacing the attributes of anything already there
    pub async fn create_dataset(&self, path: &str, attributes: DatasetAttributes) -> Result<Dataset> {
        let json = serde_json::to_vec_pretty(&attributes)?;
        self.store.write(&attributes_key(path), &json).await?;
        Dataset::new(Arc::clone(&self.store), path, attributes)
    }

    /// Open an existing dataset
    pub async fn open_dataset(&self, path: &str) -> Result<Dataset> {
        let raw = self.attributes(path).await?;
        if !DatasetAttributes::is_dataset(&raw) {
            return Err(N5Error::NotFound(format!(
                "no dataset {:?} in {}",
                path,
                self.root.display()
            )));
        }
        let attributes: DatasetAttributes = serde_json::from_value(Value::Object(raw))
            .map_err(|e| N5Error::Metadata(format!("{}: {}", path, e)))?;
        Dataset::new(Arc::clone(&self.store), path, attributes)
    }

    /// Names of the child groups/datasets of a group
    pub async fn list(&self, path: &str) -> Result<Vec<String>> {
        if self.is_dataset(path).await? {
            return Ok(Vec::new());
        }
        self.store.list_dirs(path).await
    }

    /// Paths of every dataset in the container, sorted
    pub async fn dataset_paths(&self) -> Result<Vec<String>> {
        let mut found = Vec::new();
        let mut pending = vec![String::new()];

        while let Some(group) = pending.pop() {
            for child in self.store.list_dirs(&group).await? {
                let path = join_key(&group, &child);
                if self.is_dataset(&path).await? {
                    found.push(path);
                } else {
                    pending.push(path);
                }
            }
        }

        found.sort();
        debug!("{} datasets in {}", found.len(), self.store.location());
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::CompressionMethod;
    use crate::types::DataType;
    use serde_json::json;
    use tempfile::TempDir;

    fn attrs(shape: [usize; 3]) -> DatasetAttributes {
        DatasetAttributes::new(shape, [2, 2, 2], DataType::Uint8, CompressionMethod::Raw).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_open_container() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.n5");

        let created = N5Container::create(&path).await.unwrap();
        assert_eq!(created.version().await.unwrap(), Some(N5Version::CURRENT));

        let opened = N5Container::open(&path).await.unwrap();
        assert_eq!(opened.root(), path.as_path());
        assert!(N5Container::open(dir.path().join("missing.n5")).await.is_err());
    }

    #[tokio::test]
    async fn test_unsupported_version() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("attributes.json"), r#"{"n5": "9.0.0"}"#).unwrap();
        let err = N5Container::open(dir.path()).await.unwrap_err();
        assert!(matches!(err, N5Error::UnsupportedVersion(_)));
    }

    #[tokio::test]
    async fn test_attributes_merge() {
        let dir = TempDir::new().unwrap();
        let container = N5Container::create(dir.path()).await.unwrap();
        container.create_group("data").await.unwrap();
        assert!(container.attributes("data").await.unwrap().is_empty());

        let first = json!({"downsamplingFactors": [2, 2, 2]});
        let second = json!({"resolution": [1, 1, 1]});
        container
            .set_attributes("data", first.as_object().unwrap().clone())
            .await
            .unwrap();
        container
            .set_attributes("data", second.as_object().unwrap().clone())
            .await
            .unwrap();

        let merged = container.attributes("data").await.unwrap();
        assert_eq!(merged["downsamplingFactors"], json!([2, 2, 2]));
        assert_eq!(merged["resolution"], json!([1, 1, 1]));
    }

    #[tokio::test]
    async fn test_datasets_and_listing() {
        let dir = TempDir::new().unwrap();
        let container = N5Container::create(dir.path()).await.unwrap();
        container.create_dataset("data/s0", attrs([4, 4, 4])).await.unwrap();
        container.create_dataset("data/s1", attrs([2, 2, 2])).await.unwrap();
        container.create_dataset("other/raw", attrs([3, 3, 3])).await.unwrap();

        let s1 = container.open_dataset("data/s1").await.unwrap();
        s1.write_block([0, 0, 0], vec![5; 8]).await.unwrap();

        assert_eq!(
            container.dataset_paths().await.unwrap(),
            vec!["data/s0", "data/s1", "other/raw"]
        );
        assert_eq!(container.list("data").await.unwrap(), vec!["s0", "s1"]);
        // block directories are not children of a dataset
        assert!(container.list("data/s1").await.unwrap().is_empty());

        assert!(container.is_dataset("data/s0").await.unwrap());
        assert!(!container.is_dataset("data").await.unwrap());
        assert!(!container.is_dataset("data/s9").await.unwrap());
        assert!(matches!(
            container.open_dataset("data").await,
            Err(N5Error::NotFound(_))
        ));
    }
}
