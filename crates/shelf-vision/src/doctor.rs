use anyhow::Result;

use crate::config::AnalyzerConfig;

pub fn check_thresholds(cfg: &AnalyzerConfig) -> Result<()> {
    anyhow::ensure!(
        cfg.confidence_threshold > 0.0 && cfg.confidence_threshold <= 1.0,
        "analyzer.confidence_threshold must be in (0, 1]"
    );
    anyhow::ensure!(
        (0.0..1.0).contains(&cfg.min_confidence),
        "analyzer.min_confidence must be in [0, 1)"
    );
    Ok(())
}

pub fn check_output_dir(cfg: &AnalyzerConfig) -> Result<()> {
    let p = &cfg.output_dir;
    anyhow::ensure!(!p.as_os_str().is_empty(), "analyzer.output_dir is empty");
    if p.exists() {
        anyhow::ensure!(p.is_dir(), "analyzer.output_dir is not a dir: {}", p.display());
        let meta = std::fs::metadata(p)?;
        anyhow::ensure!(
            !meta.permissions().readonly(),
            "analyzer.output_dir is read-only: {}",
            p.display()
        );
    }
    Ok(())
}

/// The configured override must parse; without one the bundled font must.
pub fn check_font(cfg: &AnalyzerConfig) -> Result<()> {
    match &cfg.font_path {
        Some(p) => crate::render::load_font(p).map(drop),
        None => crate::render::bundled_font().map(drop),
    }
}
