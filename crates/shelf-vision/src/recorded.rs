use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;
use tracing::debug;

use crate::{Detector, RawDetection};

/// Detector backend that replays detections computed elsewhere, e.g. a JSON
/// dump of a YOLO run over the same (resized) image.
#[derive(Debug, Clone, Default)]
pub struct RecordedDetections {
    raws: Vec<RawDetection>,
}

impl RecordedDetections {
    pub fn new(raws: Vec<RawDetection>) -> Self {
        Self { raws }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let raws: Vec<RawDetection> = serde_json::from_str(s).context("parse detections json")?;
        Ok(Self { raws })
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read detections {}", path.display()))?;
        Self::from_json(&s)
    }

    pub fn len(&self) -> usize {
        self.raws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raws.is_empty()
    }
}

impl Detector for RecordedDetections {
    fn detect(&self, _image: &RgbImage, confidence_threshold: f32) -> Result<Vec<RawDetection>> {
        let out: Vec<RawDetection> = self
            .raws
            .iter()
            .filter(|r| r.confidence >= confidence_threshold)
            .copied()
            .collect();
        debug!("recorded: {}/{} above {:.2}", out.len(), self.raws.len(), confidence_threshold);
        Ok(out)
    }
}
