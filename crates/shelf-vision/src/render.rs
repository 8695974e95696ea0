use std::path::{Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use time::{macros::format_description, OffsetDateTime};
use tracing::{info, warn};

use crate::config::AnalyzerConfig;
use crate::detection::Detection;
use crate::segment::Shelf;
use crate::stats::Statistics;

/// DejaVu Sans, see fonts/LICENSE-DejaVu.
pub const BUNDLED_FONT: &[u8] = include_bytes!("../fonts/DejaVuSans.ttf");

pub const DETECTION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const SHELF_PALETTE: [Rgb<u8>; 6] = [
    Rgb([0, 0, 255]),
    Rgb([255, 0, 0]),
    Rgb([0, 255, 0]),
    Rgb([0, 255, 255]),
    Rgb([255, 0, 255]),
    Rgb([255, 255, 0]),
];
pub const SUMMARY_FG: Rgb<u8> = Rgb([255, 255, 255]);
pub const SUMMARY_SHADOW: Rgb<u8> = Rgb([0, 0, 0]);
const LINE_THICKNESS: u32 = 2;

pub fn shelf_color(index: usize) -> Rgb<u8> {
    SHELF_PALETTE[index.saturating_sub(1) % SHELF_PALETTE.len()]
}

pub fn bundled_font() -> Result<FontArc> {
    FontArc::try_from_slice(BUNDLED_FONT)
        .map_err(|e| anyhow::anyhow!("parse bundled font: {}", e))
}

pub fn load_font(path: &Path) -> Result<FontArc> {
    let bytes = std::fs::read(path).with_context(|| format!("read font {}", path.display()))?;
    FontArc::try_from_vec(bytes)
        .map_err(|e| anyhow::anyhow!("parse font {}: {}", path.display(), e))
}

/// Draws the analysis overlay onto a copy of the working image.
pub struct Renderer {
    font: Option<FontArc>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::from_config(&AnalyzerConfig::default())
    }
}

impl Renderer {
    pub fn new(font: FontArc) -> Self {
        Self { font: Some(font) }
    }

    /// Uses `font_path` when set and readable, the bundled font otherwise.
    pub fn from_config(cfg: &AnalyzerConfig) -> Self {
        if let Some(p) = &cfg.font_path {
            match load_font(p) {
                Ok(f) => return Self::new(f),
                Err(e) => warn!("render: {:#}; using bundled font", e),
            }
        }
        match bundled_font() {
            Ok(f) => Self::new(f),
            Err(e) => {
                warn!("render: {:#}; labels disabled", e);
                Self { font: None }
            }
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn render(
        &self,
        image: &RgbImage,
        detections: &[Detection],
        shelves: &[Shelf],
        stats: &Statistics,
    ) -> RgbImage {
        let mut canvas = image.clone();
        let (width, _) = canvas.dimensions();

        for d in detections {
            draw_box(&mut canvas, d.x_min(), d.y_min(), d.width(), d.height(), DETECTION_COLOR);
            let (x, y) = (d.x_min() as i32, d.y_min() as i32 - 14);
            self.text(&mut canvas, DETECTION_COLOR, x, y, 14.0, &detection_label(d));
        }

        let mut ordered: Vec<&Shelf> = shelves.iter().collect();
        ordered.sort_by_key(|s| s.index);
        for shelf in ordered {
            let color = shelf_color(shelf.index);
            draw_box(&mut canvas, 0, shelf.y_top, width, shelf.height(), color);
            let fill = shelf.index.checked_sub(1).and_then(|i| stats.fill_percentages.get(i));
            if let Some(&fill) = fill {
                let y = shelf.y_top as i32 + 10;
                self.text(&mut canvas, color, 10, y, 20.0, &shelf_label(shelf, fill));
            }
        }

        // white pass, then black 1px up-left, readable on any background
        let x = width as i32 - 300;
        for (i, line) in summary_lines(stats).iter().enumerate() {
            let y = 36 + 30 * i as i32;
            self.text(&mut canvas, SUMMARY_FG, x, y, 18.0, line);
            self.text(&mut canvas, SUMMARY_SHADOW, x - 1, y - 1, 18.0, line);
        }
        canvas
    }

    /// Render and write next to other outputs. Any failure is logged and the
    /// untouched source path comes back instead.
    pub fn render_and_save(
        &self,
        source: &Path,
        image: &RgbImage,
        detections: &[Detection],
        shelves: &[Shelf],
        stats: &Statistics,
        out_dir: &Path,
    ) -> PathBuf {
        match self.save(source, image, detections, shelves, stats, out_dir) {
            Ok(p) => {
                info!("render: wrote {}", p.display());
                p
            }
            Err(e) => {
                warn!("render: {:#}; keeping source image", e);
                source.to_path_buf()
            }
        }
    }

    fn save(
        &self,
        source: &Path,
        image: &RgbImage,
        detections: &[Detection],
        shelves: &[Shelf],
        stats: &Statistics,
        out_dir: &Path,
    ) -> Result<PathBuf> {
        let canvas = self.render(image, detections, shelves, stats);
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let path = output_path(source, out_dir, now)?;
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("create output dir {}", out_dir.display()))?;
        canvas.save(&path).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    fn text(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, size: f32, text: &str) {
        if let Some(font) = &self.font {
            draw_text_mut(canvas, color, x, y, PxScale::from(size), font, text);
        }
    }
}

/// `<stem>_analyzed_<YYYYMMDD_HHMMSS><.ext>` inside `out_dir`.
pub fn output_path(source: &Path, out_dir: &Path, at: OffsetDateTime) -> Result<PathBuf> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("no file name in {}", source.display()))?;
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    let stamp = at
        .format(format_description!("[year][month][day]_[hour][minute][second]"))
        .context("format timestamp")?;
    Ok(out_dir.join(format!("{}_analyzed_{}{}", stem, stamp, ext)))
}

pub fn detection_label(d: &Detection) -> String {
    format!("Book: {:.2}", d.confidence())
}

pub fn shelf_label(shelf: &Shelf, fill: f64) -> String {
    format!("Shelf {}: {}% ({} books)", shelf.index, format_pct(fill), shelf.book_count())
}

pub fn summary_lines(stats: &Statistics) -> [String; 4] {
    [
        format!("Total books: {}", stats.total_books),
        format!("Shelves: {}", stats.shelf_count),
        format!("Average fill: {}%", format_pct(stats.average_fill)),
        format!("Density: {}%", format_pct(stats.density_percentage)),
    ]
}

// 20 -> "20.0", 33.33 -> "33.33"
fn format_pct(v: f64) -> String {
    let s = format!("{:.2}", v);
    let trimmed = s.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}

fn draw_box(canvas: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    for t in 0..LINE_THICKNESS {
        if w <= 2 * t || h <= 2 * t {
            break;
        }
        let rect = Rect::at((x + t) as i32, (y + t) as i32).of_size(w - 2 * t, h - 2 * t);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}
