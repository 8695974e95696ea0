use std::path::{Path, PathBuf};
use std::time::Instant;

use image::RgbImage;
use serde::Serialize;
use shelf_proto::AnalysisRecord;
use tracing::{info, warn};

use crate::config::AnalyzerConfig;
use crate::detection::{collect_detections, Detection};
use crate::error::AnalysisError;
use crate::preprocess::{self, ImageDimensions};
use crate::render::Renderer;
use crate::segment::{self, Shelf};
use crate::stats::{self, Statistics};
use crate::Detector;

/// Everything one analysis produces. On failure only `success`, `error` and
/// `processing_time` are meaningful.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub detections: Vec<Detection>,
    pub shelves: Vec<Shelf>,
    pub statistics: Option<Statistics>,
    pub visualization_path: Option<PathBuf>,
    /// Seconds.
    pub processing_time: f64,
    pub image_dimensions: Option<ImageDimensions>,
}

impl AnalysisResult {
    pub fn failed(err: &AnalysisError, processing_time: f64) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            detections: Vec::new(),
            shelves: Vec::new(),
            statistics: None,
            visualization_path: None,
            processing_time,
            image_dimensions: None,
        }
    }

    /// Persistence subset. `None` for failed analyses.
    pub fn to_record(&self) -> Option<AnalysisRecord> {
        let stats = self.statistics.as_ref().filter(|_| self.success)?;
        let dims = self.image_dimensions?;
        Some(AnalysisRecord {
            total_books: stats.total_books,
            shelf_count: stats.shelf_count,
            fill_percentages: AnalysisRecord::encode_fills(&stats.fill_percentages),
            average_fill: stats.average_fill,
            processing_time: self.processing_time,
            image_width: dims.width,
            image_height: dims.height,
            visualization_path: self.visualization_path.as_ref().map(|p| p.display().to_string()),
        })
    }
}

/// Single-pass analysis: preprocess, detect, segment, measure, render.
/// Holds no state between calls beyond its config and detector handle.
pub struct ShelfAnalyzer<D: Detector> {
    cfg: AnalyzerConfig,
    detector: D,
    renderer: Renderer,
}

impl<D: Detector> ShelfAnalyzer<D> {
    pub fn new(cfg: AnalyzerConfig, detector: D) -> Self {
        let renderer = Renderer::from_config(&cfg);
        Self { cfg, detector, renderer }
    }

    pub fn with_renderer(cfg: AnalyzerConfig, detector: D, renderer: Renderer) -> Self {
        Self { cfg, detector, renderer }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.cfg
    }

    pub fn analyze(&self, image_path: &Path) -> AnalysisResult {
        let started = Instant::now();
        match self.try_analyze(image_path) {
            Ok(res) => res,
            Err(e) => {
                warn!("analyze: {} failed: {}", image_path.display(), e);
                AnalysisResult::failed(&e, started.elapsed().as_secs_f64())
            }
        }
    }

    pub fn try_analyze(&self, image_path: &Path) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        info!("analyze: {}", image_path.display());
        let image = preprocess::load(image_path)?;
        let mut res = self.analyze_image(image_path, image)?;
        res.processing_time = started.elapsed().as_secs_f64();
        Ok(res)
    }

    /// Analyze an already decoded image. `source_path` only names the output
    /// file and serves as the fallback visualization path.
    pub fn analyze_image(
        &self,
        source_path: &Path,
        image: RgbImage,
    ) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        let pre = preprocess::preprocess(image);
        let dims = pre.working;
        if pre.was_resized() {
            info!(
                "analyze: image {}x{} downscaled to {}x{}",
                pre.original.width, pre.original.height, dims.width, dims.height
            );
        } else {
            info!("analyze: image {}x{}", dims.width, dims.height);
        }

        let raws = self
            .detector
            .detect(&pre.image, self.cfg.confidence_threshold)
            .map_err(AnalysisError::Detector)?;
        let detections = collect_detections(&raws, dims, &self.cfg.detection_filter());
        info!("analyze: {} books ({} raw)", detections.len(), raws.len());

        let shelves = segment::segment(&detections, dims.height);
        let statistics = stats::compute(&detections, &shelves, dims.width, dims.height)?;
        info!(
            "analyze: {} shelves, avg fill {}%, density {}%",
            statistics.shelf_count, statistics.average_fill, statistics.density_percentage
        );

        let visualization_path = self.renderer.render_and_save(
            source_path,
            &pre.image,
            &detections,
            &shelves,
            &statistics,
            &self.cfg.output_dir,
        );

        let processing_time = started.elapsed().as_secs_f64();
        info!("analyze: done in {:.2}s", processing_time);
        Ok(AnalysisResult {
            success: true,
            error: None,
            detections,
            shelves,
            statistics: Some(statistics),
            visualization_path: Some(visualization_path),
            processing_time,
            image_dimensions: Some(pre.original),
        })
    }
}
