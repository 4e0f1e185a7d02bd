//! Command-line interface

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Road Guardian: drowsiness detection
#[derive(Parser, Debug, Clone)]
#[command(name = "road-guardian", version)]
#[command(about = "Road Guardian: drowsiness and yawn detection from a face camera", long_about = None)]
pub struct Cli {
    /// Path to the 68-point facial landmark model (ONNX)
    #[arg(long)]
    pub shape_predictor: PathBuf,

    /// Camera source: device index, stream URL or image-sequence directory [default: 0]
    #[arg(long)]
    pub source: Option<String>,

    /// Disable low-light contrast enhancement
    #[arg(long)]
    pub no_clahe: bool,

    /// EAR threshold [default: 0.23]
    #[arg(long)]
    pub ear: Option<f64>,

    /// MAR threshold [default: 0.7]
    #[arg(long)]
    pub mar: Option<f64>,

    /// Endpoint for GPS/IP lookup [default: https://ipinfo.io/json]
    #[arg(long)]
    pub gps_endpoint: Option<String>,

    /// TOML settings file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Replay rate for image-sequence sources [default: 30]
    #[arg(long)]
    pub fps: Option<f64>,

    /// Write annotated frames and overlay records to this directory
    #[arg(long)]
    pub record_dir: Option<PathBuf>,

    /// Emit per-frame debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}
