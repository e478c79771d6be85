//! End-to-end tests of test data generation

use n5ng::compression::CompressionMethod;
use n5ng::generate::{build_pyramid, save_pyramid};
use n5ng::{Bounds, GeneratorConfig, N5Container};
use std::fs;
use tempfile::TempDir;

fn config(dir: &TempDir, size: usize) -> GeneratorConfig {
    GeneratorConfig {
        path: dir.path().join("sample.n5"),
        size,
        seed: Some(42),
        ..Default::default()
    }
}

#[test]
fn test_levels_strictly_decrease_to_one_voxel() {
    for size in [1, 2, 7, 20, 33] {
        let pyramid = build_pyramid(size, Some(0));
        let edges: Vec<usize> = pyramid.iter().map(|level| level.shape()[0]).collect();

        assert_eq!(edges[0], size);
        assert_eq!(*edges.last().unwrap(), 1);
        assert!(edges.windows(2).all(|w| w[1] < w[0]), "{:?}", edges);
        for level in &pyramid {
            let s = level.shape();
            assert!(s[0] == s[1] && s[1] == s[2]);
        }
    }
}

#[tokio::test]
async fn test_level_zero_round_trip() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, 20);
    let pyramid = build_pyramid(config.size, config.seed);
    save_pyramid(&config, &pyramid).await.unwrap();

    let container = N5Container::open(&config.path).await.unwrap();
    let s0 = container.open_dataset("data/s0").await.unwrap();
    assert_eq!(s0.shape(), [20, 20, 20]);
    assert_eq!(s0.block_shape(), [100, 100, 100]);

    let full = s0.read_array(&s0.grid().full_bounds()).await.unwrap();
    assert_eq!(full, pyramid[0]);
    // level 0 is the unsmoothed random volume, drawn from [0, 255)
    assert!(full.iter().all(|&v| v < 255));

    let levels = container.list("data").await.unwrap();
    assert_eq!(levels, vec!["s0", "s1", "s2", "s3", "s4", "s5"]);
    let s5 = container.open_dataset("data/s5").await.unwrap();
    assert_eq!(s5.shape(), [1, 1, 1]);
}

#[tokio::test]
async fn test_on_disk_format() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, 4);
    save_pyramid(&config, &build_pyramid(4, Some(3))).await.unwrap();

    let root: serde_json::Value =
        serde_json::from_slice(&fs::read(config.path.join("attributes.json")).unwrap()).unwrap();
    assert_eq!(root["n5"], "2.0.0");

    let s0: serde_json::Value = serde_json::from_slice(
        &fs::read(config.path.join("data/s0/attributes.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(s0["dimensions"], serde_json::json!([4, 4, 4]));
    assert_eq!(s0["blockSize"], serde_json::json!([100, 100, 100]));
    assert_eq!(s0["dataType"], "uint8");
    assert_eq!(s0["compression"]["type"], "raw");

    // mode 0, three dimensions, 4x4x4, then 64 raw bytes
    let block = fs::read(config.path.join("data/s0/0/0/0")).unwrap();
    assert_eq!(&block[..4], &[0, 0, 0, 3]);
    assert_eq!(&block[4..16], &[0, 0, 0, 4, 0, 0, 0, 4, 0, 0, 0, 4]);
    assert_eq!(block.len(), 16 + 64);
}

#[tokio::test]
async fn test_compressed_pyramids() {
    for compression in [CompressionMethod::gzip(), CompressionMethod::zstd()] {
        let dir = TempDir::new().unwrap();
        let config = GeneratorConfig {
            compression: compression.clone(),
            block_shape: [6, 6, 6],
            ..config(&dir, 16)
        };
        let pyramid = build_pyramid(config.size, config.seed);
        let container = save_pyramid(&config, &pyramid).await.unwrap();

        for (level, expected) in pyramid.iter().enumerate() {
            let dataset = container
                .open_dataset(&format!("data/s{}", level))
                .await
                .unwrap();
            assert_eq!(dataset.attributes().compression, compression);
            let back = dataset.read_array(&dataset.grid().full_bounds()).await.unwrap();
            assert_eq!(&back, expected);
        }

        let s0 = container.open_dataset("data/s0").await.unwrap();
        let window = s0
            .read_array(&Bounds::new([5, 5, 5], [7, 8, 9]))
            .await
            .unwrap();
        assert_eq!(window[[1, 2, 3]], pyramid[0][[6, 7, 8]]);
    }
}
