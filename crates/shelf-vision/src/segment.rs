use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cluster::{Cluster1d, ClusterError, Lloyd1d};
use crate::detection::Detection;

/// Vertical bin size used to guess how many shelves a photo shows.
pub const SHELF_BIN_PX: f64 = 50.0;
pub const MIN_SHELVES: usize = 2;
pub const MAX_SHELVES: usize = 6;
/// Band padding above and below member boxes, as a fraction of image height.
pub const SHELF_PADDING_FRACTION: f64 = 0.05;

/// A horizontal band of the photo. `y_bottom > y_top` always holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shelf {
    pub index: usize,
    pub y_top: u32,
    pub y_bottom: u32,
    pub detections: Vec<Detection>,
}

impl Shelf {
    pub fn height(&self) -> u32 {
        self.y_bottom - self.y_top
    }

    pub fn book_count(&self) -> usize {
        self.detections.len()
    }
}

pub fn segment(detections: &[Detection], image_height: u32) -> Vec<Shelf> {
    segment_with(&Lloyd1d::default(), detections, image_height)
}

/// Group detections into shelves. Too few detections, or a clustering
/// failure, yields a single shelf over the whole image.
pub fn segment_with<C: Cluster1d>(
    clusterer: &C,
    detections: &[Detection],
    image_height: u32,
) -> Vec<Shelf> {
    if detections.len() < 2 {
        debug!("segment: {} detection(s), single shelf", detections.len());
        return whole_image(detections, image_height);
    }

    match cluster_shelves(clusterer, detections, image_height) {
        Ok(shelves) if !shelves.is_empty() => {
            debug!("segment: {} shelves", shelves.len());
            shelves
        }
        Ok(_) => {
            warn!("segment: clustering produced no shelves, using whole image");
            whole_image(detections, image_height)
        }
        Err(e) => {
            warn!("segment: clustering failed ({}), using whole image", e);
            whole_image(detections, image_height)
        }
    }
}

/// Number of distinct 50px bins hit by the centers, clamped to [2, 6].
pub fn shelf_count_hint(centers: &[f64]) -> usize {
    let bins: BTreeSet<i64> = centers.iter().map(|c| (c / SHELF_BIN_PX).floor() as i64).collect();
    bins.len().clamp(MIN_SHELVES, MAX_SHELVES)
}

fn cluster_shelves<C: Cluster1d>(
    clusterer: &C,
    detections: &[Detection],
    image_height: u32,
) -> Result<Vec<Shelf>, ClusterError> {
    let centers: Vec<f64> = detections.iter().map(Detection::y_center).collect();
    let k = shelf_count_hint(&centers);
    let labels = clusterer.assign(&centers, k)?;

    let mut groups: Vec<Vec<Detection>> = vec![Vec::new(); k];
    for (det, &label) in detections.iter().zip(&labels) {
        // a label outside 0..k is a broken clusterer, not a shelf
        let group = groups.get_mut(label).ok_or(ClusterError::Diverged(label))?;
        group.push(*det);
    }

    let padding = image_height as f64 * SHELF_PADDING_FRACTION;
    let mut shelves: Vec<Shelf> = groups
        .into_iter()
        .filter(|g| !g.is_empty())
        .filter_map(|members| {
            let top = members.iter().map(Detection::y_min).min()?;
            let bottom = members.iter().map(Detection::y_max).max()?;
            let y_top = (top as f64 - padding).max(0.0) as u32;
            let y_bottom = ((bottom as f64 + padding) as u32).min(image_height);
            Some(Shelf { index: 0, y_top, y_bottom, detections: members })
        })
        .collect();

    shelves.sort_by_key(|s| s.y_top);
    for (i, s) in shelves.iter_mut().enumerate() {
        s.index = i + 1;
    }
    Ok(shelves)
}

fn whole_image(detections: &[Detection], image_height: u32) -> Vec<Shelf> {
    vec![Shelf {
        index: 1,
        y_top: 0,
        y_bottom: image_height,
        detections: detections.to_vec(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::RawDetection;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32, w: u32, h: u32) -> Detection {
        let raw = RawDetection { bbox: [x1, y1, x2, y2], confidence: 0.9, class_id: 73 };
        Detection::from_raw(&raw, w, h).unwrap()
    }

    // centered on `cy`, 20px tall
    fn around(cy: f32, x: f32) -> Detection {
        det(x, cy - 10.0, x + 100.0, cy + 10.0, 1200, 900)
    }

    struct Failing;
    impl Cluster1d for Failing {
        fn assign(&self, _: &[f64], _: usize) -> Result<Vec<usize>, ClusterError> {
            Err(ClusterError::Diverged(0))
        }
    }

    struct OutOfRange;
    impl Cluster1d for OutOfRange {
        fn assign(&self, values: &[f64], k: usize) -> Result<Vec<usize>, ClusterError> {
            Ok(vec![k; values.len()])
        }
    }

    #[test]
    fn no_detections_gives_one_empty_shelf() {
        let shelves = segment(&[], 800);
        assert_eq!(shelves.len(), 1);
        assert_eq!((shelves[0].index, shelves[0].y_top, shelves[0].y_bottom), (1, 0, 800));
        assert!(shelves[0].detections.is_empty());
    }

    #[test]
    fn single_detection_spans_whole_image() {
        let d = det(100.0, 100.0, 300.0, 150.0, 1000, 800);
        let shelves = segment(&[d], 800);
        assert_eq!(shelves.len(), 1);
        assert_eq!((shelves[0].y_top, shelves[0].y_bottom), (0, 800));
        assert_eq!(shelves[0].detections, vec![d]);
    }

    #[test]
    fn hint_counts_bins_and_clamps() {
        assert_eq!(shelf_count_hint(&[10.0, 20.0]), 2);
        assert_eq!(shelf_count_hint(&[55.0, 65.0, 410.0, 420.0, 430.0, 760.0, 770.0, 780.0]), 3);
        let many: Vec<f64> = (0..20).map(|i| i as f64 * 60.0).collect();
        assert_eq!(shelf_count_hint(&many), 6);
    }

    #[test]
    fn three_bands_become_three_padded_shelves() {
        let centers = [55.0, 65.0, 410.0, 420.0, 430.0, 760.0, 770.0, 780.0];
        let dets: Vec<Detection> =
            centers.iter().enumerate().map(|(i, &c)| around(c, i as f32 * 120.0)).collect();
        let shelves = segment(&dets, 900);

        assert_eq!(shelves.len(), 3);
        assert_eq!(shelves.iter().map(|s| s.index).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(shelves.iter().map(Shelf::book_count).collect::<Vec<_>>(), vec![2, 3, 3]);
        // members span 45..75, 400..440, 750..790; padding is 45px
        assert_eq!((shelves[0].y_top, shelves[0].y_bottom), (0, 120));
        assert_eq!((shelves[1].y_top, shelves[1].y_bottom), (355, 485));
        assert_eq!((shelves[2].y_top, shelves[2].y_bottom), (705, 835));
    }

    #[test]
    fn bottom_padding_clamps_to_image_height() {
        let dets = vec![around(40.0, 0.0), around(880.0, 200.0)];
        let shelves = segment(&dets, 900);
        assert_eq!(shelves.len(), 2);
        assert_eq!(shelves[1].y_bottom, 900);
        assert!(shelves.windows(2).all(|w| w[0].y_top < w[1].y_top));
    }

    #[test]
    fn empty_groups_are_dropped() {
        // two identical centers still ask for 2 groups; one stays empty
        let dets = vec![around(300.0, 0.0), around(300.0, 300.0)];
        let shelves = segment(&dets, 900);
        assert_eq!(shelves.len(), 1);
        assert_eq!(shelves[0].book_count(), 2);
        assert_eq!((shelves[0].y_top, shelves[0].y_bottom), (245, 355));
    }

    #[test]
    fn segmentation_is_deterministic() {
        let dets: Vec<Detection> = [120.0, 130.0, 300.0, 310.0, 520.0, 515.0, 700.0]
            .iter()
            .enumerate()
            .map(|(i, &c)| around(c, i as f32 * 50.0))
            .collect();
        assert_eq!(segment(&dets, 900), segment(&dets, 900));
    }

    #[test]
    fn clustering_failure_falls_back_to_whole_image() {
        let dets = vec![around(100.0, 0.0), around(600.0, 0.0)];
        for shelves in [segment_with(&Failing, &dets, 900), segment_with(&OutOfRange, &dets, 900)] {
            assert_eq!(shelves.len(), 1);
            assert_eq!((shelves[0].y_top, shelves[0].y_bottom), (0, 900));
            assert_eq!(shelves[0].book_count(), 2);
        }
    }
}
