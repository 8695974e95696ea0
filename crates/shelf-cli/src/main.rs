use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use shelf_vision::recorded::RecordedDetections;
use shelf_vision::{doctor, AnalyzerConfig, ShelfAnalyzer};

#[derive(Debug, Parser)]
#[command(
    name = "shelfscan",
    version,
    about = "shelfscan - shelf layout and occupancy from book detections"
)]
struct Cli {
    #[arg(long)]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check config values, output dir and font.
    Doctor,
    /// Analyze one photo using a JSON dump of detector output.
    Analyze {
        #[arg(long)]
        image: PathBuf,
        /// JSON array of {"bbox": [x1,y1,x2,y2], "confidence": f, "class_id": n}
        #[arg(long)]
        detections: PathBuf,
        /// Print only the persistence subset.
        #[arg(long)]
        record: bool,
    },
}

#[derive(Debug, Default, serde::Deserialize)]
struct Config {
    #[serde(default)]
    analyzer: AnalyzerConfig,
}

fn load_config(path: &Path) -> Result<Config> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    toml::from_str(&s).context("parse config toml")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => run_doctor(&cfg),
        Command::Analyze { image, detections, record } => analyze(cfg, &image, &detections, record),
    }
}

fn run_doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");
    doctor::check_thresholds(&cfg.analyzer)?;
    doctor::check_output_dir(&cfg.analyzer)?;
    doctor::check_font(&cfg.analyzer)?;
    info!("doctor: OK");
    Ok(())
}

fn analyze(cfg: Config, image: &Path, detections: &Path, record: bool) -> Result<()> {
    doctor::check_thresholds(&cfg.analyzer)?;
    let detector = RecordedDetections::from_json_file(detections)?;
    info!("analyze: {} recorded detections", detector.len());

    let analyzer = ShelfAnalyzer::new(cfg.analyzer, detector);
    let res = analyzer.analyze(image);

    let out = if record {
        let rec = res.to_record();
        serde_json::to_string_pretty(&rec).context("encode record")?
    } else {
        serde_json::to_string_pretty(&res).context("encode result")?
    };
    println!("{}", out);

    let reason = res.error.as_deref().unwrap_or("unknown error");
    anyhow::ensure!(res.success, "analysis failed: {}", reason);
    Ok(())
}
