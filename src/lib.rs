//! n5ng - N5 volumes for Neuroglancer
//!
//! Serves multiscale N5 containers to the Neuroglancer viewer over its
//! "precomputed" HTTP protocol, and generates synthetic test pyramids.
//!
//! # Features
//!
//! - Pure Rust N5 reader and writer (raw, gzip and zstd blocks)
//! - Gaussian pyramid generation for test volumes
//! - Discovery of containers laid out as `<root>/*/*/*.n5`
//! - axum tile server with `info` and chunk endpoints and gzip negotiation
//! - Shareable viewer links per dataset
//!
//! # Example
//!
//! ```rust,ignore
//! use n5ng::{Bounds, N5Container};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let container = N5Container::open("/data/lab/fly/sample.n5").await?;
//! let s0 = container.open_dataset("fly/s0").await?;
//!
//! // z, y, x
//! let bytes = s0.read_box(&Bounds::new([0, 0, 0], [10, 64, 64])).await?;
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod block;
pub mod compression;
pub mod config;
pub mod container;
pub mod error;
pub mod generate;
pub mod index;
pub mod io;
pub mod layout;
pub mod link;
pub mod metadata;
pub mod precomputed;
pub mod pyramid;
pub mod server;
pub mod types;
pub mod utils;

// Re-exports
pub use access::Dataset;
pub use compression::{CompressionMethod, Compressor};
pub use config::{GeneratorConfig, ServerConfig};
pub use container::N5Container;
pub use error::{N5Error, Result};
pub use index::DatasetDescriptor;
pub use io::{FileSystemStore, Store};
pub use layout::{BlockGrid, Bounds};
pub use metadata::{DatasetAttributes, N5Version, ScaleAttributes};
pub use precomputed::{PrecomputedInfo, ScaleInfo};
pub use types::DataType;

/// Version of n5ng
pub const N5NG_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!N5NG_VERSION.is_empty());
    }
}
