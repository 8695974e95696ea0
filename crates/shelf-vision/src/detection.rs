use serde::{Deserialize, Serialize};

use crate::preprocess::ImageDimensions;

/// One triple exactly as the external detector hands it over. Coordinates are
/// `[x_min, y_min, x_max, y_max]` in working-buffer pixels and may lie outside
/// the image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub bbox: [f32; 4],
    pub confidence: f32,
    pub class_id: i32,
}

/// A validated detection. Only obtainable through [`Detection::from_raw`], so
/// every instance satisfies `0 <= x_min < x_max <= width-1` (same for y).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    bbox: [u32; 4],
    confidence: f32,
    class_id: i32,
    width: u32,
    height: u32,
    area: u64,
}

impl Detection {
    pub fn from_raw(raw: &RawDetection, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        if !(raw.confidence > 0.0 && raw.confidence <= 1.0) {
            return None;
        }
        let [x1, y1, x2, y2] = raw.bbox;
        if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
            return None;
        }

        let x_min = clamp_coord(x1, width);
        let y_min = clamp_coord(y1, height);
        let x_max = clamp_coord(x2, width);
        let y_max = clamp_coord(y2, height);
        if x_max <= x_min || y_max <= y_min {
            return None;
        }

        let w = x_max - x_min;
        let h = y_max - y_min;
        Some(Self {
            bbox: [x_min, y_min, x_max, y_max],
            confidence: raw.confidence,
            class_id: raw.class_id,
            width: w,
            height: h,
            area: w as u64 * h as u64,
        })
    }

    pub fn bbox(&self) -> [u32; 4] {
        self.bbox
    }

    pub fn x_min(&self) -> u32 {
        self.bbox[0]
    }

    pub fn y_min(&self) -> u32 {
        self.bbox[1]
    }

    pub fn x_max(&self) -> u32 {
        self.bbox[2]
    }

    pub fn y_max(&self) -> u32 {
        self.bbox[3]
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn class_id(&self) -> i32 {
        self.class_id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn area(&self) -> u64 {
        self.area
    }

    pub fn y_center(&self) -> f64 {
        (self.y_min() as f64 + self.y_max() as f64) / 2.0
    }
}

// Truncate toward zero, then clamp into [0, limit-1].
fn clamp_coord(v: f32, limit: u32) -> u32 {
    let max = (limit - 1) as f32;
    v.trunc().clamp(0.0, max) as u32
}

/// Which detector triples count as books.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionFilter {
    /// Triples at or below this confidence are dropped.
    pub min_confidence: f32,
    /// Allowed classes; empty means every class.
    pub class_ids: Vec<i32>,
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self { min_confidence: 0.3, class_ids: Vec::new() }
    }
}

impl DetectionFilter {
    pub fn accepts(&self, raw: &RawDetection) -> bool {
        let class_ok = self.class_ids.is_empty() || self.class_ids.contains(&raw.class_id);
        class_ok && raw.confidence > self.min_confidence
    }
}

/// Filter raw detector output and turn survivors into validated detections.
pub fn collect_detections(
    raws: &[RawDetection],
    dims: ImageDimensions,
    filter: &DetectionFilter,
) -> Vec<Detection> {
    raws.iter()
        .filter(|r| filter.accepts(r))
        .filter_map(|r| Detection::from_raw(r, dims.width, dims.height))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(bbox: [f32; 4], confidence: f32, class_id: i32) -> RawDetection {
        RawDetection { bbox, confidence, class_id }
    }

    #[test]
    fn clamps_into_image_bounds() {
        let d = Detection::from_raw(&raw([-20.0, -5.0, 1500.0, 900.0], 0.9, 0), 1000, 800).unwrap();
        assert_eq!(d.bbox(), [0, 0, 999, 799]);
        assert_eq!(d.width(), 999);
        assert_eq!(d.height(), 799);
        assert_eq!(d.area(), 999 * 799);
    }

    #[test]
    fn truncates_fractional_coordinates() {
        let d = Detection::from_raw(&raw([10.9, 20.2, 110.7, 70.99], 0.5, 3), 1000, 800).unwrap();
        assert_eq!(d.bbox(), [10, 20, 110, 70]);
        assert_eq!(d.y_center(), 45.0);
    }

    #[test]
    fn rejects_degenerate_geometry() {
        // collapses to x_min == x_max once clamped
        let off_right = raw([1200.0, 10.0, 1300.0, 50.0], 0.9, 0);
        assert!(Detection::from_raw(&off_right, 1000, 800).is_none());
        assert!(Detection::from_raw(&raw([10.0, 50.0, 40.0, 50.0], 0.9, 0), 1000, 800).is_none());
        assert!(Detection::from_raw(&raw([40.0, 10.0, 10.0, 50.0], 0.9, 0), 1000, 800).is_none());
    }

    #[test]
    fn rejects_bad_confidence_and_nan() {
        assert!(Detection::from_raw(&raw([0.0, 0.0, 10.0, 10.0], 0.0, 0), 100, 100).is_none());
        assert!(Detection::from_raw(&raw([0.0, 0.0, 10.0, 10.0], 1.5, 0), 100, 100).is_none());
        assert!(Detection::from_raw(&raw([f32::NAN, 0.0, 10.0, 10.0], 0.9, 0), 100, 100).is_none());
        assert!(Detection::from_raw(&raw([0.0, 0.0, 10.0, 10.0], 1.0, 0), 100, 100).is_some());
    }

    #[test]
    fn filter_applies_class_set_and_confidence_floor() {
        let dims = ImageDimensions { width: 200, height: 200 };
        let filter = DetectionFilter { min_confidence: 0.3, class_ids: vec![73] };
        let raws = [
            raw([0.0, 0.0, 10.0, 10.0], 0.9, 73),
            raw([0.0, 0.0, 10.0, 10.0], 0.9, 1),
            raw([0.0, 0.0, 10.0, 10.0], 0.3, 73),
            raw([0.0, 0.0, 0.0, 10.0], 0.9, 73),
        ];
        let kept = collect_detections(&raws, dims, &filter);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].class_id(), 73);

        let open = DetectionFilter::default();
        assert_eq!(collect_detections(&raws, dims, &open).len(), 2);
    }
}
