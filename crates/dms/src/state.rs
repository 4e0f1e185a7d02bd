//! Driver state tracking

use crate::DetectionConfig;
use alerting::EventWindow;

/// Per-session detector state, owned and mutated only by
/// [`DrowsinessDetector`](crate::DrowsinessDetector).
#[derive(Debug, Clone)]
pub struct DetectorState {
    /// Consecutive frames with EAR below threshold
    pub ear_counter: u32,

    /// Consecutive frames with MAR above threshold
    pub mar_counter: u32,

    /// Raised when the eye-closure debounce trips, cleared when eyes reopen
    pub alarm_active: bool,

    /// Timestamp of the most recent alarm rising edge
    pub last_alarm_time: Option<f64>,

    /// Drowsiness events inside the alert window
    pub drowsy_events: EventWindow,

    /// Alarm rising edges since the session started
    pub total_alarms: u64,

    /// Location notifications sent since the session started
    pub total_notifications: u64,
}

impl DetectorState {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            ear_counter: 0,
            mar_counter: 0,
            alarm_active: false,
            last_alarm_time: None,
            drowsy_events: EventWindow::new(config.alert_window_seconds),
            total_alarms: 0,
            total_notifications: 0,
        }
    }

    /// Reset state (on driver change)
    pub fn reset(&mut self) {
        self.ear_counter = 0;
        self.mar_counter = 0;
        self.alarm_active = false;
        self.last_alarm_time = None;
        self.drowsy_events.clear();
        self.total_alarms = 0;
        self.total_notifications = 0;
    }
}
