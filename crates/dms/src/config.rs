//! DMS configuration

use crate::DmsError;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Drowsiness / yawn detection thresholds (immutable per session)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// EAR below this counts as a closed-eye frame
    pub ear_threshold: f64,

    /// Consecutive closed-eye frames before the alarm trips
    pub ear_consec_frames: u32,

    /// MAR above this counts as an open-mouth frame
    pub mar_threshold: f64,

    /// Consecutive open-mouth frames before yawning is reported
    pub mar_consec_frames: u32,

    /// Sliding window for repeated drowsiness events (seconds)
    pub alert_window_seconds: u64,

    /// Events within the window that trigger the location notification
    pub alert_repeat_count: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.23,
            ear_consec_frames: 20,
            mar_threshold: 0.7,
            mar_consec_frames: 15,
            alert_window_seconds: 600,
            alert_repeat_count: 3,
        }
    }
}

impl DetectionConfig {
    /// Check that thresholds and counts are positive
    pub fn validate(&self) -> Result<(), DmsError> {
        if !(self.ear_threshold.is_finite() && self.ear_threshold > 0.0) {
            return Err(DmsError::Config(format!(
                "ear_threshold must be positive, got {}",
                self.ear_threshold
            )));
        }
        if !(self.mar_threshold.is_finite() && self.mar_threshold > 0.0) {
            return Err(DmsError::Config(format!(
                "mar_threshold must be positive, got {}",
                self.mar_threshold
            )));
        }
        if self.ear_consec_frames == 0 || self.mar_consec_frames == 0 {
            return Err(DmsError::Config("consecutive frame counts must be positive".into()));
        }
        if self.alert_window_seconds == 0 {
            return Err(DmsError::Config("alert_window_seconds must be positive".into()));
        }
        if self.alert_repeat_count == 0 {
            return Err(DmsError::Config("alert_repeat_count must be at least 1".into()));
        }
        Ok(())
    }
}

/// DMS module configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Alert state machine thresholds
    pub detection: DetectionConfig,

    /// Landmark index layout of the detector output
    pub landmarks: LandmarkScheme,

    /// Equalize grayscale frames before landmark detection
    pub low_light_enhancement: bool,

    /// Consecutive face-less frames before `FaceNotVisible` is raised
    pub face_absent_alert_frames: u32,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            landmarks: LandmarkScheme::default(),
            low_light_enhancement: true,
            face_absent_alert_frames: 30,
        }
    }
}

impl DmsConfig {
    pub fn validate(&self) -> Result<(), DmsError> {
        self.detection.validate()?;
        self.landmarks.validate()
    }
}

/// Index ranges of the eye and mouth contours inside a face landmark set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkScheme {
    pub left_eye: Range<usize>,
    pub right_eye: Range<usize>,
    pub mouth: Range<usize>,
}

impl Default for LandmarkScheme {
    fn default() -> Self {
        Self::ibug_68()
    }
}

impl LandmarkScheme {
    /// iBUG 300-W 68-point layout
    pub fn ibug_68() -> Self {
        Self {
            left_eye: 42..48,
            right_eye: 36..42,
            mouth: 48..68,
        }
    }

    /// Minimum number of points a landmark set must carry
    pub fn required_points(&self) -> usize {
        self.left_eye.end.max(self.right_eye.end).max(self.mouth.end)
    }

    /// Eyes need exactly 6 points, the mouth at least 11
    pub fn validate(&self) -> Result<(), DmsError> {
        for (name, range) in [("left_eye", &self.left_eye), ("right_eye", &self.right_eye)] {
            if range.len() != 6 {
                return Err(DmsError::Config(format!(
                    "{} range {:?} must span 6 points",
                    name, range
                )));
            }
        }
        if self.mouth.len() < 11 {
            return Err(DmsError::Config(format!(
                "mouth range {:?} must span at least 11 points",
                self.mouth
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(DetectionConfig::default().validate().is_ok());
        assert!(LandmarkScheme::default().validate().is_ok());
        assert_eq!(LandmarkScheme::default().required_points(), 68);
    }

    #[test]
    fn test_rejects_non_positive_values() {
        let bad = [
            DetectionConfig { ear_threshold: 0.0, ..Default::default() },
            DetectionConfig { mar_threshold: f64::NAN, ..Default::default() },
            DetectionConfig { ear_consec_frames: 0, ..Default::default() },
            DetectionConfig { alert_window_seconds: 0, ..Default::default() },
            DetectionConfig { alert_repeat_count: 0, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(DmsError::Config(_))), "{:?}", config);
        }
    }

    #[test]
    fn test_scheme_rejects_short_eye() {
        let scheme = LandmarkScheme {
            left_eye: 42..47,
            ..Default::default()
        };
        assert!(scheme.validate().is_err());
    }
}
