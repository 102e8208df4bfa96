use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::Level;

use stereo_replay::preprocess::resize_folder;

/// Resize a folder of sequence images for replay
#[derive(Parser, Debug)]
#[command(name = "preprocess")]
struct Args {
    /// Folder with the original images
    input: PathBuf,

    /// Target width in pixels
    width: u32,

    /// Target height in pixels
    height: u32,

    /// Folder receiving the resized images
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
    let args = Args::parse();

    let summary = resize_folder(&args.input, &args.output, args.width, args.height)?;
    println!(
        "Resized {} images to {}x{} in {} ({} skipped)",
        summary.written,
        args.width,
        args.height,
        args.output.display(),
        summary.skipped
    );
    Ok(())
}
