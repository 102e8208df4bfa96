//! Dataset access: frame manifests and image decoding.

pub mod cityscapes;
pub mod euroc;
pub mod images;
pub mod manifest;

use std::path::Path;

use anyhow::Result;

pub use images::{DiskLoader, FrameLoader};
pub use manifest::{FrameEntry, Manifest, MaskPaths};

/// On-disk layout of a recorded sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceLayout {
    /// `times.txt` + `frames.txt` with `image_resized_{0,1}` folders.
    #[default]
    Cityscapes,
    /// EuRoC MAV `cam0`/`cam1` folders with `data.csv` lists.
    Euroc,
}

/// Load the manifest of `sequence`, pairing frames with masks under `mask_root` if given.
pub fn load_manifest(
    layout: SequenceLayout,
    sequence: &Path,
    mask_root: Option<&Path>,
) -> Result<Manifest> {
    match layout {
        SequenceLayout::Cityscapes => cityscapes::load_sequence(sequence, mask_root),
        SequenceLayout::Euroc => euroc::load_sequence(sequence, mask_root),
    }
}
