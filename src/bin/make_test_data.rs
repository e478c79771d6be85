use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use n5ng::config::{GeneratorConfig, DEFAULT_BLOCK_SHAPE};
use n5ng::generate::{build_pyramid, save_pyramid};
use n5ng::CompressionMethod;
use tracing::info;

/// Write a random multiscale test volume into an N5 container
#[derive(Parser, Debug)]
#[command(name = "make-test-data", version)]
struct Args {
    /// Name of the N5 container
    #[arg(short = 'f', long = "file", default_value = "sample.n5")]
    file: PathBuf,
    /// Length of each axis of the 3D volume
    #[arg(short = 's', long = "size", default_value_t = 128)]
    size: usize,
    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
    /// Block compression: raw, gzip or zstd
    #[arg(long, default_value = "raw")]
    compression: String,
    /// Group holding the scale levels
    #[arg(long, default_value = "data")]
    group: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let args = Args::parse();
    let compression = CompressionMethod::from_name(&args.compression)
        .ok_or_else(|| anyhow!("unknown compression {:?}", args.compression))?;
    let config = GeneratorConfig {
        path: args.file,
        size: args.size,
        seed: args.seed,
        group: args.group,
        block_shape: DEFAULT_BLOCK_SHAPE,
        compression,
        ..Default::default()
    };
    config.validate()?;

    info!("building {}^3 pyramid", config.size);
    let (size, seed) = (config.size, config.seed);
    let pyramid = tokio::task::spawn_blocking(move || build_pyramid(size, seed))
        .await
        .context("pyramid generation panicked")?;

    save_pyramid(&config, &pyramid)
        .await
        .with_context(|| format!("writing {}", config.path.display()))?;
    info!(
        "wrote {} levels to {}",
        pyramid.len(),
        config.path.display()
    );
    Ok(())
}
