mod detection;
mod error;
pub mod cluster;
pub mod config;
pub mod doctor;
pub mod pipeline;
pub mod preprocess;
pub mod recorded;
pub mod render;
pub mod segment;
pub mod stats;

use anyhow::Result;
use image::RgbImage;

pub use config::AnalyzerConfig;
pub use detection::{collect_detections, Detection, DetectionFilter, RawDetection};
pub use error::AnalysisError;
pub use pipeline::{AnalysisResult, ShelfAnalyzer};
pub use preprocess::ImageDimensions;
pub use segment::Shelf;
pub use stats::Statistics;

/// The object detector, treated as a black box. Implementations receive the
/// preprocessed image and return boxes in its coordinate space.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &RgbImage, confidence_threshold: f32) -> Result<Vec<RawDetection>>;
}
