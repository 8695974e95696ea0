use serde::{Deserialize, Serialize};

/// Subset of an analysis that a storage layer keeps per photograph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub total_books: usize,
    pub shelf_count: usize,
    // JSON array text, e.g. "[20.0,35.5]"
    pub fill_percentages: String,
    pub average_fill: f64,
    pub processing_time: f64,
    pub image_width: u32,
    pub image_height: u32,
    pub visualization_path: Option<String>,
}

impl AnalysisRecord {
    pub fn encode_fills(fills: &[f64]) -> String {
        serde_json::to_string(fills).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn fills(&self) -> serde_json::Result<Vec<f64>> {
        serde_json::from_str(&self.fill_percentages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_survive_text_encoding() {
        let rec = AnalysisRecord {
            total_books: 3,
            shelf_count: 2,
            fill_percentages: AnalysisRecord::encode_fills(&[20.0, 33.33]),
            average_fill: 26.67,
            processing_time: 0.12,
            image_width: 1000,
            image_height: 800,
            visualization_path: None,
        };
        assert_eq!(rec.fill_percentages, "[20.0,33.33]");
        assert_eq!(rec.fills().unwrap(), vec![20.0, 33.33]);
    }

    #[test]
    fn garbage_fill_text_is_an_error() {
        let rec = AnalysisRecord {
            total_books: 0,
            shelf_count: 1,
            fill_percentages: "not json".into(),
            average_fill: 0.0,
            processing_time: 0.0,
            image_width: 1,
            image_height: 1,
            visualization_path: None,
        };
        assert!(rec.fills().is_err());
    }
}
