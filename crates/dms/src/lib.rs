//! Driver Monitoring System (DMS)
//!
//! Real-time drowsiness monitoring from facial landmarks:
//! - Eye aspect ratio (eye closure) and mouth aspect ratio (yawning)
//! - Debounced drowsiness alarm and yawn detection
//! - Repeated-drowsiness notification over a sliding time window

pub mod analysis;
pub mod config;
pub mod detector;
pub mod drowsiness;
pub mod geometry;
pub mod state;

pub use analysis::{DmsAlert, DmsAnalysis};
pub use config::{DetectionConfig, DmsConfig, LandmarkScheme};
pub use detector::{FaceLandmarks, LandmarkDetector, OnnxLandmarkDetector, DEFAULT_FACE_SCORE_THRESHOLD};
pub use drowsiness::{AlarmStatus, DrowsinessDetector};
pub use geometry::{eye_aspect_ratio, measure, mouth_aspect_ratio, Measurement, Point};
pub use state::DetectorState;

use alerting::Notify;
use camera_capture::{enhance_low_light, VideoFrame};
use thiserror::Error;
use tracing::debug;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Keypoints missing for feature calculation")]
    KeypointsMissing,

    #[error("Degenerate landmark geometry (zero horizontal distance)")]
    DegenerateGeometry,
}

/// Driver monitoring module: frame -> landmarks -> ratios -> alert state
pub struct DmsModule {
    config: DmsConfig,
    landmark_detector: Box<dyn LandmarkDetector + Send>,
    detector: DrowsinessDetector,
    face_absent_frames: u32,
    faces_skipped: u64,
}

impl DmsModule {
    /// Create a new DMS module with configuration
    pub fn new(
        config: DmsConfig,
        landmark_detector: Box<dyn LandmarkDetector + Send>,
        notifier: Box<dyn Notify + Send>,
    ) -> Result<Self, DmsError> {
        config.validate()?;
        Ok(Self {
            detector: DrowsinessDetector::new(config.detection.clone(), notifier)?,
            landmark_detector,
            config,
            face_absent_frames: 0,
            faces_skipped: 0,
        })
    }

    /// Analyze a single frame for driver state
    pub fn analyze(&mut self, frame: &VideoFrame) -> Result<DmsAnalysis, DmsError> {
        let mut gray = frame.to_grayscale();
        if self.config.low_light_enhancement {
            gray = enhance_low_light(&gray);
        }

        let faces = self.landmark_detector.detect(&gray)?;
        if faces.len() > 1 {
            debug!("{} faces on frame {}, monitoring the first", faces.len(), frame.sequence);
        }

        match faces.into_iter().next() {
            Some(face) => Ok(self.analyze_landmarks(face, frame.timestamp_secs())),
            None => Ok(self.face_absent()),
        }
    }

    /// Run the alert state machine on one face's landmarks taken at `now`
    pub fn analyze_landmarks(&mut self, face: FaceLandmarks, now: f64) -> DmsAnalysis {
        self.face_absent_frames = 0;

        let measurement = match measure(&face.points, &self.config.landmarks) {
            Ok(m) => m,
            Err(e) => {
                // Skip this face for this frame; state is left untouched
                self.faces_skipped += 1;
                debug!("Skipping face at {:.2}s: {}", now, e);
                return DmsAnalysis {
                    face_detected: true,
                    landmarks: Some(face),
                    ..self.held_analysis()
                };
            }
        };

        let status = self.detector.update(measurement.ear, measurement.mar, now);
        debug!(
            "EAR {:.3} MAR {:.3} -> alarm={} yawning={}",
            measurement.ear, measurement.mar, status.alarm_active, status.yawning
        );

        DmsAnalysis {
            face_detected: true,
            landmarks: Some(face),
            ear: Some(measurement.ear),
            mar: Some(measurement.mar),
            alarm_active: status.alarm_active,
            yawning: status.yawning,
            rising_edge: status.rising_edge,
            alerts: alerts_for(status.alarm_active, status.yawning),
            notification: status.notification,
        }
    }

    fn face_absent(&mut self) -> DmsAnalysis {
        self.face_absent_frames = self.face_absent_frames.saturating_add(1);
        let mut analysis = self.held_analysis();
        if self.face_absent_frames > self.config.face_absent_alert_frames {
            analysis.alerts.push(DmsAlert::FaceNotVisible);
        }
        analysis
    }

    /// Alarm and yawn flags carried over unchanged from the last measured frame
    fn held_analysis(&self) -> DmsAnalysis {
        let state = self.detector.state();
        let yawning = state.mar_counter >= self.config.detection.mar_consec_frames;
        DmsAnalysis {
            alarm_active: state.alarm_active,
            yawning,
            alerts: alerts_for(state.alarm_active, yawning),
            ..Default::default()
        }
    }

    /// Alert state machine
    pub fn detector(&self) -> &DrowsinessDetector {
        &self.detector
    }

    /// Faces skipped because their landmarks were unusable
    pub fn faces_skipped(&self) -> u64 {
        self.faces_skipped
    }

    /// Reset driver state (on driver change)
    pub fn reset_state(&mut self) {
        self.detector.reset();
        self.face_absent_frames = 0;
    }
}

fn alerts_for(alarm_active: bool, yawning: bool) -> Vec<DmsAlert> {
    let mut alerts = Vec::new();
    if alarm_active {
        alerts.push(DmsAlert::Drowsiness);
    }
    if yawning {
        alerts.push(DmsAlert::Yawning);
    }
    alerts
}
