//! Synthetic multiscale test data

use crate::config::GeneratorConfig;
use crate::container::N5Container;
use crate::error::Result;
use crate::metadata::{DatasetAttributes, DOWNSAMPLING_FACTORS_KEY, RESOLUTION_KEY};
use crate::precomputed::level_name;
use crate::pyramid::{pyramid_gaussian, random_volume, to_u8};
use crate::types::DataType;
use crate::utils::{format_bytes, join_key};
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Map};
use tracing::info;

/// Random `(size, size, size)` volume and its Gaussian pyramid, as bytes.
///
/// CPU bound; run it off the async executor.
pub fn build_pyramid(size: usize, seed: Option<u64>) -> Vec<Array3<u8>> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    pyramid_gaussian(random_volume(size, &mut rng))
        .iter()
        .map(to_u8)
        .collect()
}

/// Write a pyramid as `{group}/s0..s{n}` into the configured container.
///
/// The container is created when missing; an existing group of the same
/// name is replaced.
pub async fn save_pyramid(config: &GeneratorConfig, pyramid: &[Array3<u8>]) -> Result<N5Container> {
    config.validate()?;

    let container = N5Container::create(&config.path).await?;
    let group = config.group.trim_matches('/');
    if container.exists(group).await? {
        container.remove(group).await?;
    }
    container.create_group(group).await?;

    let mut attributes = Map::new();
    attributes.insert(
        DOWNSAMPLING_FACTORS_KEY.to_string(),
        json!(config.downsampling_factors),
    );
    attributes.insert(RESOLUTION_KEY.to_string(), json!(config.resolution));
    container.set_attributes(group, attributes).await?;

    for (level, data) in pyramid.iter().enumerate() {
        let shape = [data.shape()[0], data.shape()[1], data.shape()[2]];
        let path = join_key(group, &level_name(level as u32));
        let dataset_attributes = DatasetAttributes::new(
            shape,
            config.block_shape,
            DataType::Uint8,
            config.compression.clone(),
        )?;

        let dataset = container.create_dataset(&path, dataset_attributes).await?;
        dataset.write_array(data.view()).await?;
        info!(
            "wrote {}: {} ({})",
            path,
            dataset.grid().summary(),
            format_bytes(data.len())
        );
    }

    Ok(container)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::CompressionMethod;
    use crate::layout::Bounds;
    use tempfile::TempDir;

    #[test]
    fn test_seeded_pyramid_is_deterministic() {
        let a = build_pyramid(8, Some(11));
        let b = build_pyramid(8, Some(11));
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
        assert_eq!(a[3].shape(), &[1, 1, 1]);
    }

    #[tokio::test]
    async fn test_save_pyramid_layout() {
        let dir = TempDir::new().unwrap();
        let config = GeneratorConfig {
            path: dir.path().join("sample.n5"),
            size: 12,
            seed: Some(5),
            block_shape: [5, 5, 5],
            compression: CompressionMethod::gzip(),
            ..Default::default()
        };
        let pyramid = build_pyramid(config.size, config.seed);
        let container = save_pyramid(&config, &pyramid).await.unwrap();

        let attrs = container.attributes("data").await.unwrap();
        assert_eq!(attrs["downsamplingFactors"], json!([2, 2, 2]));
        assert_eq!(attrs["resolution"], json!([1, 1, 1]));
        assert_eq!(container.list("data").await.unwrap(), vec!["s0", "s1", "s2", "s3", "s4"]);

        let s1 = container.open_dataset("data/s1").await.unwrap();
        assert_eq!(s1.shape(), [6, 6, 6]);
        let back = s1.read_array(&s1.grid().full_bounds()).await.unwrap();
        assert_eq!(back, pyramid[1]);

        let corner = s1.read_array(&Bounds::new([0, 0, 0], [1, 1, 1])).await.unwrap();
        assert_eq!(corner[[0, 0, 0]], pyramid[1][[0, 0, 0]]);
    }

    #[tokio::test]
    async fn test_save_replaces_existing_group() {
        let dir = TempDir::new().unwrap();
        let config = GeneratorConfig {
            path: dir.path().join("sample.n5"),
            size: 8,
            seed: Some(1),
            ..Default::default()
        };
        save_pyramid(&config, &build_pyramid(8, Some(1))).await.unwrap();

        let smaller = GeneratorConfig { size: 2, ..config };
        let container = save_pyramid(&smaller, &build_pyramid(2, Some(1))).await.unwrap();
        assert_eq!(container.list("data").await.unwrap(), vec!["s0", "s1"]);
    }
}
