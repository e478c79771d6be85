//! Discovery of N5 containers under a data directory
//!
//! Containers are expected at `<root>/<project>/<name>/<file>.n5`. Each one is
//! published under `<name>`, the directory holding it.

use crate::container::N5Container;
use crate::error::{N5Error, Result};
use crate::metadata::DOWNSAMPLING_FACTORS_KEY;
use crate::precomputed::parse_level_name;
use crate::utils::join_key;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Extension of container directories
pub const CONTAINER_EXTENSION: &str = "n5";

/// A discovered container, as listed on the index page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetDescriptor {
    /// Public name, the first path segment(s) of every request for it
    pub name: String,
    /// Group inside the container holding the scale levels
    pub group: String,
    pub container_path: PathBuf,
    /// Every dataset in the container as `{container_path}/{dataset}`
    pub dataset_paths: Vec<String>,
    pub thumbnail: String,
    pub readme: String,
}

/// Scan `root` for containers and describe each one.
///
/// Containers that fail to open are logged and left out. When two
/// containers share a name the later one (in path order) is published as
/// `{grandparent}/{parent}`, or left out if that is taken too.
pub async fn discover(root: impl AsRef<Path>) -> Result<BTreeMap<String, DatasetDescriptor>> {
    let root = root.as_ref();
    let mut datasets = BTreeMap::new();

    for container_path in find_containers(root).await? {
        let Some((name, alternate)) = candidate_names(&container_path) else {
            continue;
        };
        let name = if !datasets.contains_key(&name) {
            name
        } else if !datasets.contains_key(&alternate) {
            warn!(
                "{} is already published, serving {} as {}",
                name,
                container_path.display(),
                alternate
            );
            alternate
        } else {
            warn!(
                "skipping {}: both {} and {} are taken",
                container_path.display(),
                name,
                alternate
            );
            continue;
        };

        match describe(&container_path, &name).await {
            Ok(descriptor) => {
                info!(
                    "found {} at {} ({} arrays)",
                    name,
                    container_path.display(),
                    descriptor.dataset_paths.len()
                );
                datasets.insert(name, descriptor);
            }
            Err(e) => warn!("skipping {}: {}", container_path.display(), e),
        }
    }

    Ok(datasets)
}

/// Paths matching `<root>/*/*/*.n5`, sorted.
///
/// Symlinked directories are followed; names starting with `.` are skipped.
pub async fn find_containers(root: &Path) -> Result<Vec<PathBuf>> {
    if !is_directory(root).await {
        return Err(N5Error::NotFound(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut found = Vec::new();
    for project in subdirectories(root).await? {
        for parent in subdirectories(&project).await? {
            for candidate in subdirectories(&parent).await? {
                if candidate.extension().is_some_and(|ext| ext == CONTAINER_EXTENSION) {
                    found.push(candidate);
                }
            }
        }
    }
    found.sort();
    Ok(found)
}

async fn is_directory(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

async fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        if is_directory(&path).await {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// `(parent, grandparent/parent)` directory names of a container path
fn candidate_names(container_path: &Path) -> Option<(String, String)> {
    let parent = container_path.parent()?;
    let name = parent.file_name()?.to_string_lossy().into_owned();
    let grandparent = parent.parent()?.file_name()?.to_string_lossy().into_owned();
    Some((name.clone(), format!("{}/{}", grandparent, name)))
}

async fn describe(container_path: &Path, name: &str) -> Result<DatasetDescriptor> {
    let container = N5Container::open(container_path).await?;
    let group = container_path
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let arrays = container.dataset_paths().await?;
    for array in foreign_levels(&container, &arrays).await? {
        warn!(
            "{} in {} is not a scale level name and will not be served",
            array,
            container_path.display()
        );
    }

    let prefix = container_path.to_string_lossy();
    Ok(DatasetDescriptor {
        name: name.to_string(),
        group,
        container_path: container_path.to_path_buf(),
        dataset_paths: arrays.iter().map(|a| format!("{}/{}", prefix, a)).collect(),
        thumbnail: format!("{}/thumbnail.png", name),
        readme: format!("{}/README.md", name),
    })
}

/// Children of multiscale groups holding arrays that are not named `s<N>`
async fn foreign_levels(container: &N5Container, arrays: &[String]) -> Result<Vec<String>> {
    let groups: BTreeSet<&str> = arrays
        .iter()
        .map(|a| a.rsplit_once('/').map_or("", |(group, _)| group))
        .collect();

    let mut foreign = Vec::new();
    for group in groups {
        if !container
            .attributes(group)
            .await?
            .contains_key(DOWNSAMPLING_FACTORS_KEY)
        {
            continue;
        }
        for child in container.list(group).await? {
            if parse_level_name(&child).is_none() {
                foreign.push(join_key(group, &child));
            }
        }
    }
    Ok(foreign)
}
