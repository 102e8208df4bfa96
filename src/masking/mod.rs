//! Region mask preprocessing.
//!
//! Masks mark pixels the tracker should ignore: zero (black) is excluded,
//! non-zero is usable. Eroding a mask therefore shrinks the usable area and
//! grows the excluded one, giving a safety margin around masked objects.

pub mod erosion;

use anyhow::Result;
use image::GrayImage;

pub use erosion::{StructuringElement, erode};

/// Left/right masks attached to one stereo frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskPair {
    pub left: GrayImage,
    pub right: GrayImage,
}

/// Turns raw masks into the masks handed to the tracking engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskPreprocessor {
    element: Option<StructuringElement>,
}

impl MaskPreprocessor {
    pub fn new(element: Option<StructuringElement>) -> Self {
        Self { element }
    }

    /// Erode both masks independently, or pass them through when no
    /// structuring element is configured. `None` in gives `None` out.
    pub fn process(&self, raw: Option<MaskPair>) -> Result<Option<MaskPair>> {
        let Some(raw) = raw else {
            return Ok(None);
        };
        Ok(Some(match self.element {
            Some(element) => MaskPair {
                left: erode(&raw.left, element)?,
                right: erode(&raw.right, element)?,
            },
            None => raw,
        }))
    }
}
