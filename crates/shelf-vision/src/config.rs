use std::path::PathBuf;

use serde::Deserialize;

use crate::detection::DetectionFilter;

/// Settings for one [`crate::pipeline::ShelfAnalyzer`]. Read once, never
/// mutated afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Handed to the detector as its own cut-off.
    pub confidence_threshold: f32,
    /// Second cut-off applied to what the detector returns.
    pub min_confidence: f32,
    /// Detector classes that count as books. Empty accepts everything.
    pub class_ids: Vec<i32>,
    /// Where annotated images are written.
    pub output_dir: PathBuf,
    /// TrueType font for overlay labels. The bundled DejaVu Sans is used
    /// when unset.
    pub font_path: Option<PathBuf>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            min_confidence: 0.3,
            class_ids: Vec::new(),
            output_dir: PathBuf::from("static/uploads/processed"),
            font_path: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn detection_filter(&self) -> DetectionFilter {
        DetectionFilter {
            min_confidence: self.min_confidence,
            class_ids: self.class_ids.clone(),
        }
    }
}
