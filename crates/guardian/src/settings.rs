//! Layered settings: defaults, TOML file, environment, CLI flags

use crate::cli::Cli;
use anyhow::Context;
use camera_capture::CameraConfig;
use dms::{DetectionConfig, DmsConfig, LandmarkScheme, DEFAULT_FACE_SCORE_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix, e.g. `ROAD_GUARDIAN_DETECTION__EAR_THRESHOLD`
pub const ENV_PREFIX: &str = "ROAD_GUARDIAN";

/// Frame capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Device index, stream URL or image-sequence directory
    pub source: String,
    pub width: u32,
    pub height: u32,
    /// Replay rate for image sequences
    pub fps: f64,
    pub low_light_enhancement: bool,
    pub face_absent_alert_frames: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            source: "0".to_string(),
            width: 640,
            height: 480,
            fps: 30.0,
            low_light_enhancement: true,
            face_absent_alert_frames: 30,
        }
    }
}

/// Location lookup settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSettings {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://ipinfo.io/json".to_string(),
            timeout_secs: 5,
        }
    }
}

impl LocationSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Landmark model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub path: Option<PathBuf>,
    /// Square input side in pixels
    pub input_size: u32,
    /// Landmarks regressed per face
    pub point_count: usize,
    /// Minimum model face score for a frame to contain a face
    pub face_score_threshold: f32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: None,
            input_size: 112,
            point_count: 68,
            face_score_threshold: DEFAULT_FACE_SCORE_THRESHOLD,
        }
    }
}

/// Complete session settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub detection: DetectionConfig,
    pub landmarks: LandmarkScheme,
    pub capture: CaptureSettings,
    pub location: LocationSettings,
    pub model: ModelSettings,
    /// Annotated-frame output (CLI only)
    #[serde(skip)]
    pub record_dir: Option<PathBuf>,
}

impl Settings {
    /// Resolve settings for `cli`: defaults < file < environment < flags
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut settings = Self::from_sources(cli.config.as_deref(), Some(ENV_PREFIX))?;
        settings.apply_cli(cli);
        settings.validate()?;
        Ok(settings)
    }

    /// Merge an optional TOML file and environment variables over the defaults
    pub fn from_sources(file: Option<&Path>, env_prefix: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        if let Some(prefix) = env_prefix {
            builder = builder.add_source(
                config::Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        builder
            .build()
            .and_then(|merged| merged.try_deserialize::<Settings>())
            .with_context(|| match file {
                Some(path) => format!("failed to load settings from {}", path.display()),
                None => "failed to load settings from environment".to_string(),
            })
    }

    /// Apply command-line overrides
    pub fn apply_cli(&mut self, cli: &Cli) {
        self.model.path = Some(cli.shape_predictor.clone());
        if let Some(source) = &cli.source {
            self.capture.source = source.clone();
        }
        if cli.no_clahe {
            self.capture.low_light_enhancement = false;
        }
        if let Some(ear) = cli.ear {
            self.detection.ear_threshold = ear;
        }
        if let Some(mar) = cli.mar {
            self.detection.mar_threshold = mar;
        }
        if let Some(endpoint) = &cli.gps_endpoint {
            self.location.endpoint = endpoint.clone();
        }
        if let Some(fps) = cli.fps {
            self.capture.fps = fps;
        }
        if let Some(dir) = &cli.record_dir {
            self.record_dir = Some(dir.clone());
        }
    }

    /// Check the detection invariants and that a model path is set
    pub fn validate(&self) -> anyhow::Result<()> {
        self.dms_config().validate().context("invalid detection settings")?;
        if self.model.path.is_none() {
            anyhow::bail!("landmark model path is required");
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            anyhow::bail!("capture size must be positive");
        }
        if !(self.capture.fps.is_finite() && self.capture.fps > 0.0) {
            anyhow::bail!("capture fps must be positive, got {}", self.capture.fps);
        }
        if !(0.0..=1.0).contains(&self.model.face_score_threshold) {
            anyhow::bail!(
                "face score threshold must lie in [0, 1], got {}",
                self.model.face_score_threshold
            );
        }
        Ok(())
    }

    pub fn dms_config(&self) -> DmsConfig {
        DmsConfig {
            detection: self.detection.clone(),
            landmarks: self.landmarks.clone(),
            low_light_enhancement: self.capture.low_light_enhancement,
            face_absent_alert_frames: self.capture.face_absent_alert_frames,
        }
    }

    pub fn camera_config(&self) -> CameraConfig {
        CameraConfig {
            source: self.capture.source.clone(),
            width: self.capture.width,
            height: self.capture.height,
            fps: self.capture.fps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["road-guardian", "--shape-predictor", "model.onnx"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_builtin_defaults() {
        let settings = Settings::from_sources(None, None).unwrap();
        assert_eq!(settings.detection, DetectionConfig::default());
        assert_eq!(settings.detection.ear_threshold, 0.23);
        assert_eq!(settings.detection.mar_threshold, 0.7);
        assert_eq!(settings.location.endpoint, "https://ipinfo.io/json");
        assert_eq!(settings.location.timeout(), Duration::from_secs(5));
        assert_eq!(settings.capture.source, "0");
        assert!(settings.capture.low_light_enhancement);
    }

    #[test]
    fn test_file_then_cli_precedence() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[detection]
ear_threshold = 0.25
ear_consec_frames = 12
alert_repeat_count = 2

[location]
endpoint = "http://geo.fleet.local/json"

[landmarks]
mouth = {{ start = 48, end = 60 }}
"#
        )
        .unwrap();

        let mut settings = Settings::from_sources(Some(file.path()), None).unwrap();
        assert_eq!(settings.detection.ear_threshold, 0.25);
        assert_eq!(settings.detection.ear_consec_frames, 12);
        assert_eq!(settings.detection.mar_consec_frames, 15);
        assert_eq!(settings.landmarks.mouth, 48..60);
        assert_eq!(settings.landmarks.left_eye, 42..48);

        settings.apply_cli(&cli(&["--ear", "0.21", "--no-clahe", "--source", "/tmp/frames"]));
        assert_eq!(settings.detection.ear_threshold, 0.21);
        assert_eq!(settings.location.endpoint, "http://geo.fleet.local/json");
        assert!(!settings.capture.low_light_enhancement);
        assert_eq!(settings.capture.source, "/tmp/frames");
        assert_eq!(settings.model.path, Some(PathBuf::from("model.onnx")));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(Settings::from_sources(Some(Path::new("/nonexistent/guardian.toml")), None).is_err());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut settings = Settings::default();
        settings.apply_cli(&cli(&["--ear", "0"]));
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_invalid_fps_rejected() {
        for fps in ["0", "NaN", "inf"] {
            let mut settings = Settings::default();
            settings.apply_cli(&cli(&["--fps", fps]));
            assert!(settings.validate().is_err(), "fps {}", fps);
        }
    }

    #[test]
    fn test_face_threshold_from_environment() {
        std::env::set_var("GUARDIAN_TEST_MODEL__FACE_SCORE_THRESHOLD", "0.65");
        let settings = Settings::from_sources(None, Some("GUARDIAN_TEST")).unwrap();
        std::env::remove_var("GUARDIAN_TEST_MODEL__FACE_SCORE_THRESHOLD");
        assert!((settings.model.face_score_threshold - 0.65).abs() < 1e-6);

        let mut settings = Settings::default();
        settings.apply_cli(&cli(&[]));
        settings.model.face_score_threshold = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_model_path_required() {
        assert!(Settings::default().validate().is_err());
    }
}
