//! Loader for EuRoC MAV stereo sequences (`mav0` directories).
//!
//! Each camera has a `data.csv` listing `timestamp_ns,filename` rows and a
//! `data/` directory with the images. Masks are looked up under the mask
//! root with the same `camX/data/<filename>` layout.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use csv::ReaderBuilder;
use tracing::warn;

use super::manifest::{FrameEntry, Manifest, MaskPaths};

#[derive(Debug, Clone)]
struct ImageEntry {
    timestamp_ns: u64,
    filename: String,
}

pub fn load_sequence<P: AsRef<Path>>(sequence: P, mask_root: Option<&Path>) -> Result<Manifest> {
    let root = sequence.as_ref();
    let cam0_entries = load_image_list(root.join("cam0/data.csv"))?;
    let cam1_entries = load_image_list(root.join("cam1/data.csv"))?;

    if cam0_entries.len() != cam1_entries.len() {
        bail!(
            "cam0 and cam1 have different number of frames ({} vs {})",
            cam0_entries.len(),
            cam1_entries.len()
        );
    }

    let mut frames = Vec::with_capacity(cam0_entries.len());
    for (left, right) in cam0_entries.iter().zip(&cam1_entries) {
        // Left camera timestamp drives the replay clock.
        if left.timestamp_ns != right.timestamp_ns {
            warn!(
                "Unsynchronized stereo pair: cam0 {} ns, cam1 {} ns",
                left.timestamp_ns, right.timestamp_ns
            );
        }

        let masks = mask_root.map(|mask_root| MaskPaths {
            left: camera_image(mask_root, "cam0", &left.filename),
            right: camera_image(mask_root, "cam1", &right.filename),
        });

        frames.push(FrameEntry {
            left_image: camera_image(root, "cam0", &left.filename),
            right_image: camera_image(root, "cam1", &right.filename),
            timestamp: left.timestamp_ns as f64 * 1e-9,
            masks,
        });
    }

    Ok(Manifest::new(frames))
}

fn camera_image(root: &Path, camera: &str, filename: &str) -> PathBuf {
    root.join(camera).join("data").join(filename)
}

fn load_image_list(csv_path: PathBuf) -> Result<Vec<ImageEntry>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .from_path(&csv_path)
        .with_context(|| format!("Failed to open {}", csv_path.display()))?;

    let mut entries = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        if rec.len() < 2 {
            continue;
        }
        let ts: u64 = rec[0]
            .trim()
            .parse()
            .with_context(|| format!("Bad timestamp {:?} in {}", &rec[0], csv_path.display()))?;
        let filename = rec[1].trim().to_string();
        entries.push(ImageEntry {
            timestamp_ns: ts,
            filename,
        });
    }
    Ok(entries)
}
