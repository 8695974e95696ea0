use std::path::Path;

use image::{imageops::FilterType, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AnalysisError;

/// Longest side allowed into the detector and the geometry stages.
pub const MAX_IMAGE_SIDE: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn of(img: &RgbImage) -> Self {
        Self { width: img.width(), height: img.height() }
    }
}

/// Output of [`preprocess`]. Detector boxes live in `working` coordinates;
/// `original` is what gets reported to callers.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub image: RgbImage,
    pub original: ImageDimensions,
    pub working: ImageDimensions,
}

impl Preprocessed {
    pub fn was_resized(&self) -> bool {
        self.original != self.working
    }
}

pub fn load(path: &Path) -> Result<RgbImage, AnalysisError> {
    let bytes = std::fs::read(path).map_err(|source| AnalysisError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&bytes)
}

pub fn decode(bytes: &[u8]) -> Result<RgbImage, AnalysisError> {
    let img = image::load_from_memory(bytes)?;
    let rgb = img.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(AnalysisError::InvalidDimensions { width: rgb.width(), height: rgb.height() });
    }
    Ok(rgb)
}

/// Shrink so the longer side is at most [`MAX_IMAGE_SIDE`], keeping aspect.
pub fn preprocess(image: RgbImage) -> Preprocessed {
    let original = ImageDimensions::of(&image);
    let longest = original.width.max(original.height);
    if longest <= MAX_IMAGE_SIDE {
        return Preprocessed { image, original, working: original };
    }

    let scale = MAX_IMAGE_SIDE as f64 / longest as f64;
    let w = ((original.width as f64 * scale) as u32).max(1);
    let h = ((original.height as f64 * scale) as u32).max(1);
    let resized = image::imageops::resize(&image, w, h, FilterType::Triangle);
    debug!("preprocess: {}x{} -> {}x{}", original.width, original.height, w, h);

    Preprocessed { image: resized, original, working: ImageDimensions { width: w, height: h } }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn small_images_pass_through() {
        let img = RgbImage::from_pixel(800, 600, Rgb([10, 20, 30]));
        let p = preprocess(img);
        assert!(!p.was_resized());
        assert_eq!(p.working, ImageDimensions { width: 800, height: 600 });
        assert_eq!(p.image.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn exactly_max_side_is_untouched() {
        let p = preprocess(RgbImage::new(1024, 300));
        assert!(!p.was_resized());
    }

    #[test]
    fn large_images_shrink_proportionally() {
        let p = preprocess(RgbImage::new(3000, 2000));
        assert_eq!(p.original, ImageDimensions { width: 3000, height: 2000 });
        assert_eq!(p.working, ImageDimensions { width: 1024, height: 682 });
        assert_eq!(p.image.dimensions(), (1024, 682));
    }

    #[test]
    fn portrait_images_shrink_on_height() {
        let p = preprocess(RgbImage::new(1500, 4000));
        assert_eq!(p.working, ImageDimensions { width: 384, height: 1024 });
    }

    #[test]
    fn undecodable_bytes_are_a_decode_error() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load(Path::new("/nonexistent/shelf.jpg")).unwrap_err();
        assert!(matches!(err, AnalysisError::Read { .. }));
    }
}
