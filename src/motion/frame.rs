//! Video frames and the grayscale preprocessing applied before analysis.

use glam::Vec2;
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};

use crate::error::{SourceError, SourceResult};

/// An RGB8 video frame
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Wrap an interleaved RGB8 buffer (`width * height * 3` bytes)
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> SourceResult<Self> {
        let len = pixels.len();
        let bad = || SourceError::BadDimensions { width, height, len };
        if width == 0 || height == 0 || len != width as usize * height as usize * 3 {
            return Err(bad());
        }
        RgbImage::from_raw(width, height, pixels)
            .map(|image| Self { image })
            .ok_or_else(bad)
    }

    /// Wrap an already-decoded image (must be non-empty)
    pub fn from_image(image: RgbImage) -> SourceResult<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(SourceError::BadDimensions {
                width: image.width(),
                height: image.height(),
                len: 0,
            });
        }
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }
}

/// Resize to the processing resolution, convert to grayscale, and blur
pub(crate) fn preprocess(frame: &Frame, width: u32, height: u32, sigma: f32) -> GrayImage {
    let gray = if frame.width() == width && frame.height() == height {
        imageops::grayscale(frame.as_image())
    } else {
        let resized = imageops::resize(frame.as_image(), width, height, FilterType::Triangle);
        imageops::grayscale(&resized)
    };
    imageops::blur(&gray, sigma)
}

/// Intensity-weighted centroid of the thresholded frame difference
///
/// Pixels whose absolute difference exceeds `threshold` get weight 255,
/// all others 0. Returns `None` when no pixel passes (zero mass).
pub(crate) fn difference_centroid(prev: &GrayImage, curr: &GrayImage, threshold: u8) -> Option<Vec2> {
    if prev.dimensions() != curr.dimensions() {
        return None;
    }

    let mut m00 = 0.0f64;
    let mut m10 = 0.0f64;
    let mut m01 = 0.0f64;

    for ((x, y, current), previous) in curr.enumerate_pixels().zip(prev.pixels()) {
        if current.0[0].abs_diff(previous.0[0]) > threshold {
            m00 += 255.0;
            m10 += 255.0 * x as f64;
            m01 += 255.0 * y as f64;
        }
    }

    if m00 > 0.0 {
        Some(Vec2::new((m10 / m00) as f32, (m01 / m00) as f32))
    } else {
        None
    }
}
