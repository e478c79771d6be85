//! Runtime configuration for the generator and the tile server

use crate::compression::CompressionMethod;
use crate::error::{N5Error, Result};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Fixed block shape of generated arrays, array order
pub const DEFAULT_BLOCK_SHAPE: [usize; 3] = [100, 100, 100];

/// Settings for `make-test-data`
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Container to write
    pub path: PathBuf,
    /// Edge length of the level 0 cube
    pub size: usize,
    /// Seed for the random volume; drawn from the OS when `None`
    pub seed: Option<u64>,
    /// Multiscale group holding the levels
    pub group: String,
    pub block_shape: [usize; 3],
    pub compression: CompressionMethod,
    /// Written to the group's `downsamplingFactors`
    pub downsampling_factors: [u32; 3],
    /// Written to the group's `resolution`
    pub resolution: [u32; 3],
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("sample.n5"),
            size: 128,
            seed: None,
            group: "data".to_string(),
            block_shape: DEFAULT_BLOCK_SHAPE,
            compression: CompressionMethod::Raw,
            downsampling_factors: [2, 2, 2],
            resolution: [1, 1, 1],
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(N5Error::Configuration(
                "edge length must be positive".to_string(),
            ));
        }
        if self.group.trim_matches('/').is_empty() {
            return Err(N5Error::Configuration("group name is empty".to_string()));
        }
        if self.block_shape.iter().any(|&b| b == 0) {
            return Err(N5Error::Configuration(format!(
                "block shape {:?} has a zero extent",
                self.block_shape
            )));
        }
        Ok(())
    }
}

/// Settings for the tile server
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Directory scanned for `*/*/*.n5` containers
    pub root: PathBuf,
    pub bind: IpAddr,
    pub port: u16,
    /// Address the viewer uses to reach this server
    pub public_url: String,
    /// Address of the Neuroglancer client
    pub viewer_url: String,
    /// Voxel size of level 0 when no attribute says otherwise, wire order
    pub base_resolution: [f64; 3],
    /// Levels `s0..s{max_scale_levels - 1}` are probed for each dataset
    pub max_scale_levels: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
            public_url: "http://localhost:5000".to_string(),
            viewer_url: "http://localhost:8080".to_string(),
            base_resolution: [1.0, 1.0, 1.0],
            max_scale_levels: 8,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub async fn validate(&self) -> Result<()> {
        let is_dir = tokio::fs::metadata(&self.root)
            .await
            .is_ok_and(|m| m.is_dir());
        if !is_dir {
            return Err(N5Error::Configuration(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        for url in [&self.public_url, &self.viewer_url] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(N5Error::Configuration(format!(
                    "{:?} is not an http(s) URL",
                    url
                )));
            }
        }
        if self.max_scale_levels == 0 {
            return Err(N5Error::Configuration(
                "at least one scale level must be probed".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.path, PathBuf::from("sample.n5"));
        assert_eq!(config.size, 128);
        assert_eq!(config.block_shape, [100, 100, 100]);
        assert!(config.validate().is_ok());

        let bad = GeneratorConfig {
            size: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[tokio::test]
    async fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:5000");
        assert!(config.validate().await.is_ok());

        let bad = ServerConfig {
            viewer_url: "localhost:8080".to_string(),
            ..Default::default()
        };
        assert!(bad.validate().await.is_err());

        let missing = ServerConfig {
            root: PathBuf::from("/definitely/not/here"),
            ..Default::default()
        };
        assert!(missing.validate().await.is_err());
    }
}
