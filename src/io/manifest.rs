//! Frame manifest: the ordered list of stereo frames to replay.

use std::path::PathBuf;

/// Paths of the precomputed region masks for one frame pair.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskPaths {
    pub left: PathBuf,
    pub right: PathBuf,
}

/// One stereo frame of a recorded sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameEntry {
    pub left_image: PathBuf,
    pub right_image: PathBuf,
    /// Capture time in seconds.
    pub timestamp: f64,
    /// None when the sequence is replayed without masks.
    pub masks: Option<MaskPaths>,
}

/// Ordered frame list. Index position defines replay order.
///
/// Timestamps are expected to be non-decreasing but this is not checked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub frames: Vec<FrameEntry>,
}

impl Manifest {
    pub fn new(frames: Vec<FrameEntry>) -> Self {
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn timestamps(&self) -> Vec<f64> {
        self.frames.iter().map(|f| f.timestamp).collect()
    }

    /// True if at least one frame carries mask paths.
    pub fn has_masks(&self) -> bool {
        self.frames.iter().any(|f| f.masks.is_some())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameEntry> {
        self.frames.iter()
    }
}
