use std::path::PathBuf;

/// Precondition failures. Anything here makes the whole analysis fail with
/// `success=false`; recoverable stage problems never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("read image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("detector: {0:#}")]
    Detector(anyhow::Error),
}
