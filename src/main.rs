use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use gltf_viewer::{config::ViewerConfig, flow};

#[derive(Parser, Debug)]
#[command(name = "gltf-viewer")]
#[command(about = "Interactive glTF viewer with sun, ambient and spot lighting")]
struct Cli {
    /// Path to a .gltf or .glb file
    path: Option<PathBuf>,

    /// TOML file with window, camera and lighting settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only redraw on input instead of continuously
    #[arg(long)]
    still: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(path) = cli.path {
        config.model = Some(path);
    }
    if cli.still {
        config.animated = false;
    }

    flow::run(config)
}
