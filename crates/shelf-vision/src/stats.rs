use serde::Serialize;

use crate::detection::Detection;
use crate::error::AnalysisError;
use crate::segment::Shelf;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookDistribution {
    pub shelf_counts: Vec<usize>,
    pub fill_percentages: Vec<f64>,
}

/// Occupancy figures for one photo. `fill_percentages`, `shelf_counts` and
/// the shelves they came from share one order and one length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total_books: usize,
    pub shelf_count: usize,
    pub fill_percentages: Vec<f64>,
    pub average_fill: f64,
    /// Summed box area over image area. Not capped: overlapping boxes can
    /// push this past 100.
    pub density_percentage: f64,
    pub book_distribution: BookDistribution,
    pub image_area: u64,
    pub total_book_area: u64,
}

const FULL: u64 = 100 * 100;

/// `100 * num / den` in hundredths of a percent, rounded half-up.
/// Exact, so `1.005` really becomes `1.01`.
pub fn percent_hundredths(num: u64, den: u64) -> u64 {
    if den == 0 {
        return 0;
    }
    let (num, den) = (num as u128, den as u128);
    ((num * 2 * FULL as u128 + den) / (2 * den)) as u64
}

fn from_hundredths(h: u64) -> f64 {
    h as f64 / 100.0
}

fn fill_hundredths(shelf: &Shelf, image_width: u32) -> u64 {
    let covered: u64 = shelf.detections.iter().map(|d| d.width() as u64).sum();
    percent_hundredths(covered, image_width as u64).min(FULL)
}

pub fn fill_percentage(shelf: &Shelf, image_width: u32) -> f64 {
    from_hundredths(fill_hundredths(shelf, image_width))
}

pub fn compute(
    detections: &[Detection],
    shelves: &[Shelf],
    image_width: u32,
    image_height: u32,
) -> Result<Statistics, AnalysisError> {
    if image_width == 0 || image_height == 0 {
        return Err(AnalysisError::InvalidDimensions {
            width: image_width,
            height: image_height,
        });
    }

    let fills: Vec<u64> = shelves.iter().map(|s| fill_hundredths(s, image_width)).collect();
    let shelf_counts: Vec<usize> = shelves.iter().map(Shelf::book_count).collect();

    // mean of already-rounded fills, half-up
    let average_fill = match fills.len() as u64 {
        0 => 0.0,
        n => from_hundredths((2 * fills.iter().sum::<u64>() + n) / (2 * n)),
    };

    let image_area = image_width as u64 * image_height as u64;
    let total_book_area: u64 = detections.iter().map(Detection::area).sum();
    let density_percentage = from_hundredths(percent_hundredths(total_book_area, image_area));
    let fill_percentages: Vec<f64> = fills.into_iter().map(from_hundredths).collect();

    Ok(Statistics {
        total_books: detections.len(),
        shelf_count: shelves.len(),
        fill_percentages: fill_percentages.clone(),
        average_fill,
        density_percentage,
        book_distribution: BookDistribution { shelf_counts, fill_percentages },
        image_area,
        total_book_area,
    })
}
