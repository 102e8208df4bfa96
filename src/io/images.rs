//! Image and mask decoding.

use std::path::Path;

use anyhow::{Context, Result, bail};
use image::{DynamicImage, GrayImage};

/// Source of decoded frame buffers.
///
/// The replay loop only talks to this trait so it can run against
/// in-memory frames as well as files on disk.
pub trait FrameLoader {
    /// Decode a camera image as stored, without colour conversion.
    fn load_image(&self, path: &Path) -> Result<DynamicImage>;

    /// Decode a region mask as a single 8-bit channel.
    fn load_mask(&self, path: &Path) -> Result<GrayImage>;
}

/// Decodes frames from the filesystem with the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskLoader;

impl FrameLoader for DiskLoader {
    fn load_image(&self, path: &Path) -> Result<DynamicImage> {
        let img = image::open(path)
            .with_context(|| format!("Failed to load image at: {}", path.display()))?;
        if img.width() == 0 || img.height() == 0 {
            bail!("Failed to load image at: {} (empty image)", path.display());
        }
        Ok(img)
    }

    fn load_mask(&self, path: &Path) -> Result<GrayImage> {
        let img = self.load_image(path)?;
        Ok(match img {
            DynamicImage::ImageLuma8(mask) => mask,
            other => other.to_luma8(),
        })
    }
}

/// Fraction of non-zero pixels in a mask, 0.0 for an empty buffer.
pub fn active_fraction(mask: &GrayImage) -> f64 {
    let total = mask.width() as usize * mask.height() as usize;
    if total == 0 {
        return 0.0;
    }
    active_pixels(mask) as f64 / total as f64
}

/// Number of non-zero pixels in a mask.
pub fn active_pixels(mask: &GrayImage) -> usize {
    mask.as_raw().iter().filter(|&&v| v != 0).count()
}
