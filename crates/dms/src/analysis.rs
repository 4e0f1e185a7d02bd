//! DMS analysis results and alerts

use crate::detector::FaceLandmarks;
use serde::{Deserialize, Serialize};

/// DMS alert types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DmsAlert {
    /// Eyes closed for the configured number of frames
    Drowsiness,

    /// Mouth open for the configured number of frames
    Yawning,

    /// Face not visible (camera blocked?)
    FaceNotVisible,
}

/// Per-frame DMS analysis result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DmsAnalysis {
    /// Whether a face was detected
    pub face_detected: bool,

    /// Landmarks of the monitored face
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<FaceLandmarks>,

    /// Mean eye aspect ratio (absent when the face was skipped)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ear: Option<f64>,

    /// Mouth aspect ratio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mar: Option<f64>,

    /// Eye-closure alarm state after this frame
    pub alarm_active: bool,

    /// Yawn state after this frame
    pub yawning: bool,

    /// Alarm was raised on this frame
    pub rising_edge: bool,

    /// Repeated-drowsiness message emitted on this frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,

    /// Active alerts
    pub alerts: Vec<DmsAlert>,
}

impl DmsAnalysis {
    /// Check if any alerts are active
    pub fn has_alerts(&self) -> bool {
        !self.alerts.is_empty()
    }

    /// Get highest severity alert
    pub fn highest_severity_alert(&self) -> Option<DmsAlert> {
        // Priority: Drowsiness > Yawning > Others
        if self.alerts.contains(&DmsAlert::Drowsiness) {
            Some(DmsAlert::Drowsiness)
        } else if self.alerts.contains(&DmsAlert::Yawning) {
            Some(DmsAlert::Yawning)
        } else {
            self.alerts.first().copied()
        }
    }

    /// Whether the frame produced a sample for the state machine
    pub fn measured(&self) -> bool {
        self.ear.is_some() && self.mar.is_some()
    }
}
