use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use n5ng::config::ServerConfig;
use tracing::info;

/// Serve N5 containers found under a directory to Neuroglancer
#[derive(Parser, Debug)]
#[command(name = "n5ng", version)]
struct Args {
    /// Directory to search for `*/*/*.n5` containers
    #[arg(short = 'd', long = "dir", env = "N5NG_DIR")]
    dir: Option<PathBuf>,
    #[arg(long, env = "N5NG_BIND", default_value = "0.0.0.0")]
    bind: IpAddr,
    #[arg(long, env = "N5NG_PORT", default_value_t = 5000)]
    port: u16,
    /// Address the viewer uses to reach this server
    #[arg(long, env = "N5NG_PUBLIC_URL", default_value = "http://localhost:5000")]
    public_url: String,
    /// Address of the Neuroglancer client
    #[arg(long, env = "N5NG_VIEWER_URL", default_value = "http://localhost:8080")]
    viewer_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let args = Args::parse();
    let Some(root) = args.dir else {
        info!("Nothing to do without a -d argument.");
        return Ok(());
    };

    let config = ServerConfig {
        root,
        bind: args.bind,
        port: args.port,
        public_url: args.public_url,
        viewer_url: args.viewer_url,
        ..Default::default()
    };
    n5ng::server::serve(config)
        .await
        .context("tile server failed")?;
    Ok(())
}
