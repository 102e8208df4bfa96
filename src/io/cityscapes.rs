//! Loader for resized Cityscapes stereo sequences.
//!
//! Layout:
//! ```text
//! <seq>/times.txt                               one timestamp (s) per line
//! <seq>/frames.txt                              one frame id per line
//! <seq>/image_resized_0/<id>_leftImg8bit.png
//! <seq>/image_resized_1/<id>_rightImg8bit.png
//! ```
//! Masks, when given, follow the same relative layout under their own root.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use csv::ReaderBuilder;
use tracing::debug;

use super::manifest::{FrameEntry, Manifest, MaskPaths};

const TIMES_FILE: &str = "times.txt";
const FRAMES_FILE: &str = "frames.txt";
const LEFT_DIR: &str = "image_resized_0";
const RIGHT_DIR: &str = "image_resized_1";
const LEFT_SUFFIX: &str = "_leftImg8bit.png";
const RIGHT_SUFFIX: &str = "_rightImg8bit.png";

/// Build a manifest for `sequence`, optionally pairing each frame with masks
/// found under `mask_root`.
pub fn load_sequence<P: AsRef<Path>>(sequence: P, mask_root: Option<&Path>) -> Result<Manifest> {
    let root = sequence.as_ref();
    let timestamps = load_timestamps(root.join(TIMES_FILE))?;
    let frame_ids = load_frame_ids(root.join(FRAMES_FILE))?;

    if frame_ids.len() != timestamps.len() {
        bail!(
            "{} lists {} frames but {} has {} timestamps",
            FRAMES_FILE,
            frame_ids.len(),
            TIMES_FILE,
            timestamps.len()
        );
    }

    let frames = frame_ids
        .iter()
        .zip(timestamps)
        .map(|(id, timestamp)| {
            let (left_image, right_image) = stereo_paths(root, id);
            let masks = mask_root.map(|mask_root| {
                let (left, right) = stereo_paths(mask_root, id);
                MaskPaths { left, right }
            });
            FrameEntry {
                left_image,
                right_image,
                timestamp,
                masks,
            }
        })
        .collect::<Vec<_>>();

    debug!("Loaded {} frames from {}", frames.len(), root.display());
    Ok(Manifest::new(frames))
}

fn stereo_paths(root: &Path, id: &str) -> (PathBuf, PathBuf) {
    (
        root.join(LEFT_DIR).join(format!("{id}{LEFT_SUFFIX}")),
        root.join(RIGHT_DIR).join(format!("{id}{RIGHT_SUFFIX}")),
    )
}

fn load_timestamps(path: PathBuf) -> Result<Vec<f64>> {
    let mut timestamps = Vec::new();
    for (line, field) in read_first_column(&path)? {
        let ts: f64 = field
            .parse()
            .with_context(|| format!("Bad timestamp {:?} at {}:{}", field, path.display(), line))?;
        timestamps.push(ts);
    }
    Ok(timestamps)
}

fn load_frame_ids(path: PathBuf) -> Result<Vec<String>> {
    Ok(read_first_column(&path)?
        .into_iter()
        .map(|(_, field)| field)
        .collect())
}

/// First whitespace-separated token of every non-empty line, with its line number.
fn read_first_column(path: &Path) -> Result<Vec<(u64, String)>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec.with_context(|| format!("Failed to read {}", path.display()))?;
        let line = rec.position().map(|p| p.line()).unwrap_or_default();
        let Some(token) = rec.get(0).and_then(|f| f.split_whitespace().next()) else {
            continue;
        };
        out.push((line, token.to_string()));
    }
    Ok(out)
}
