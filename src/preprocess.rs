//! Batch resizing of sequence images before replay.
//!
//! Sequences are replayed from `image_resized_{0,1}` folders; this fills
//! them from full-resolution captures.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use image::imageops::FilterType;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeSummary {
    pub written: usize,
    pub skipped: usize,
}

/// Resize every image in `input` to `width` x `height` (bilinear) and save
/// it under the same file name in `output`. Files that do not decode are
/// skipped.
pub fn resize_folder(input: &Path, output: &Path, width: u32, height: u32) -> Result<ResizeSummary> {
    if width == 0 || height == 0 {
        bail!("Target size must be positive, got {}x{}", width, height);
    }
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let mut paths = fs::read_dir(input)
        .with_context(|| format!("Failed to read {}", input.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();

    let mut summary = ResizeSummary::default();
    for path in paths.iter().filter(|p| p.is_file()) {
        let Some(name) = path.file_name() else {
            continue;
        };
        let img = match image::open(path) {
            Ok(img) => img,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                summary.skipped += 1;
                continue;
            }
        };

        let resized = img.resize_exact(width, height, FilterType::Triangle);
        let target = output.join(name);
        resized
            .save(&target)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        debug!("{} -> {}", path.display(), target.display());
        summary.written += 1;
    }

    Ok(summary)
}
