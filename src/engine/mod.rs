//! Tracking engine interface and the bundled recording engine.

pub mod recorder;
pub mod settings;

use std::path::Path;

use anyhow::Result;
use image::DynamicImage;

use crate::masking::MaskPair;

pub use recorder::{DeliveryRecord, RecordingEngine};
pub use settings::EngineSettings;

/// A visual tracking engine driven synchronously, one stereo frame at a time.
pub trait TrackingEngine {
    /// Track one stereo pair. `masks` is `Some` only for frames that have
    /// region masks; the engine then ignores zero-valued pixels.
    fn track_stereo(
        &mut self,
        left: &DynamicImage,
        right: &DynamicImage,
        masks: Option<&MaskPair>,
        timestamp: f64,
    ) -> Result<()>;

    /// Stop all internal activity. Must be safe to call more than once.
    fn shutdown(&mut self);

    /// Persist the estimated trajectory to `path`.
    fn save_trajectory(&mut self, path: &Path) -> Result<()>;
}

impl<E: TrackingEngine + ?Sized> TrackingEngine for Box<E> {
    fn track_stereo(
        &mut self,
        left: &DynamicImage,
        right: &DynamicImage,
        masks: Option<&MaskPair>,
        timestamp: f64,
    ) -> Result<()> {
        (**self).track_stereo(left, right, masks, timestamp)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }

    fn save_trajectory(&mut self, path: &Path) -> Result<()> {
        (**self).save_trajectory(path)
    }
}
