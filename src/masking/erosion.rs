//! Grayscale erosion with a square structuring element.

use anyhow::{Context, Result, bail};
use image::GrayImage;
use opencv::core::{BORDER_CONSTANT, Mat, Point, Size};
use opencv::imgproc;
use opencv::prelude::*;

/// Square structuring element of side `size`, anchored at its centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuringElement {
    size: u32,
}

impl StructuringElement {
    pub fn square(size: u32) -> Result<Self> {
        if size == 0 {
            bail!("Structuring element size must be positive");
        }
        Ok(Self { size })
    }

    /// Kernel size as given on the command line; zero or absent means no filtering.
    pub fn from_kernel_size(size: Option<u32>) -> Option<Self> {
        size.filter(|&s| s > 0).map(|size| Self { size })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Rectangular OpenCV kernel, anchored at `(size / 2, size / 2)`.
    fn kernel(&self) -> Result<Mat> {
        let side = self.size as i32;
        Ok(imgproc::get_structuring_element(
            imgproc::MORPH_RECT,
            Size::new(side, side),
            Point::new(-1, -1),
        )?)
    }
}

/// Erode `src`: every output pixel is the minimum under the kernel.
///
/// Uses OpenCV's default morphology border, so pixels outside the image
/// never erode the mask edge.
pub fn erode(src: &GrayImage, element: StructuringElement) -> Result<GrayImage> {
    if element.size() == 1 || src.width() == 0 || src.height() == 0 {
        return Ok(src.clone());
    }

    let (w, h) = src.dimensions();
    let input = Mat::new_rows_cols_with_data(h as i32, w as i32, src.as_raw())?;
    let kernel = element.kernel()?;

    let mut eroded = Mat::default();
    imgproc::erode(
        &*input,
        &mut eroded,
        &kernel,
        Point::new(-1, -1),
        1,
        BORDER_CONSTANT,
        imgproc::morphology_default_border_value()?,
    )?;

    GrayImage::from_raw(w, h, eroded.data_bytes()?.to_vec())
        .context("Eroded mask does not match source dimensions")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    use crate::io::images::active_pixels;

    fn mask_from(rows: &[&[u8]]) -> GrayImage {
        let h = rows.len() as u32;
        let w = rows[0].len() as u32;
        GrayImage::from_raw(w, h, rows.concat()).unwrap()
    }

    #[test]
    fn test_kernel_size_zero_disables() {
        assert!(StructuringElement::from_kernel_size(None).is_none());
        assert!(StructuringElement::from_kernel_size(Some(0)).is_none());
        assert_eq!(
            StructuringElement::from_kernel_size(Some(5)).unwrap().size(),
            5
        );
        assert!(StructuringElement::square(0).is_err());
    }

    #[test]
    fn test_unit_kernel_is_identity() {
        let mask = mask_from(&[&[0, 255, 0], &[255, 0, 255], &[0, 0, 255]]);
        let k = StructuringElement::square(1).unwrap();
        assert_eq!(erode(&mask, k).unwrap(), mask);
    }

    #[test]
    fn test_3x3_removes_isolated_pixel() {
        let mut mask = GrayImage::from_pixel(5, 5, Luma([255]));
        mask.put_pixel(2, 2, Luma([0]));
        let eroded = erode(&mask, StructuringElement::square(3).unwrap()).unwrap();

        // Excluded pixel grows to its 3x3 neighbourhood.
        for y in 0..5 {
            for x in 0..5 {
                let inside = (1..=3).contains(&x) && (1..=3).contains(&y);
                let expected = if inside { 0 } else { 255 };
                assert_eq!(eroded.get_pixel(x, y)[0], expected, "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn test_border_is_not_eroded() {
        let mask = GrayImage::from_pixel(4, 4, Luma([200]));
        let eroded = erode(&mask, StructuringElement::square(3).unwrap()).unwrap();
        assert_eq!(eroded, mask);
    }

    #[test]
    fn test_even_kernel_anchor() {
        // size 2, anchor 1: window covers [x-1, x].
        let mask = mask_from(&[&[255, 0, 255, 255]]);
        let eroded = erode(&mask, StructuringElement::square(2).unwrap()).unwrap();
        assert_eq!(eroded.as_raw(), &vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_grayscale_minimum() {
        let mask = mask_from(&[&[10, 20, 30], &[40, 50, 60], &[70, 80, 90]]);
        let eroded = erode(&mask, StructuringElement::square(3).unwrap()).unwrap();
        assert_eq!(eroded.get_pixel(1, 1)[0], 10);
        assert_eq!(eroded.get_pixel(2, 2)[0], 50);
        assert_eq!(eroded.get_pixel(0, 2)[0], 40);
    }

    #[test]
    fn test_active_region_shrinks_with_kernel_size() {
        let mut mask = GrayImage::new(32, 24);
        for y in 0..24u32 {
            for x in 0..32u32 {
                if (x * 7 + y * 3) % 11 < 7 || (8..20).contains(&x) {
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
        }

        let mut previous = active_pixels(&mask);
        for size in 1..=9 {
            let eroded = erode(&mask, StructuringElement::square(size).unwrap()).unwrap();
            let active = active_pixels(&eroded);
            assert!(active <= previous, "size {size}: {active} > {previous}");
            previous = active;
        }
    }
}
