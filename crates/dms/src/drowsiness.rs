//! Drowsiness and yawn alerting
//!
//! Converts per-frame (EAR, MAR, timestamp) samples into debounced alarm
//! and yawn flags. Each alarm rising edge is recorded in a sliding window;
//! once the window holds `alert_repeat_count` events, every further edge
//! triggers the location notification.

use crate::{DetectionConfig, DetectorState, DmsError};
use alerting::Notify;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Outcome of one [`DrowsinessDetector::update`] call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmStatus {
    /// Eye-closure alarm is active
    pub alarm_active: bool,

    /// Mouth has been open for the configured number of frames
    pub yawning: bool,

    /// The alarm went from off to on during this call
    pub rising_edge: bool,

    /// Message emitted by the notifier during this call, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
}

/// Temporal alert state machine for one monitored face
pub struct DrowsinessDetector {
    config: DetectionConfig,
    state: DetectorState,
    notifier: Box<dyn Notify + Send>,
}

impl DrowsinessDetector {
    /// Create a detector; fails if `config` violates its invariants
    pub fn new(config: DetectionConfig, notifier: Box<dyn Notify + Send>) -> Result<Self, DmsError> {
        config.validate()?;
        info!("Creating drowsiness detector with config: {:?}", config);

        Ok(Self {
            state: DetectorState::new(&config),
            config,
            notifier,
        })
    }

    /// Feed one sample taken at `now` (monotonic seconds)
    pub fn update(&mut self, ear: f64, mar: f64, now: f64) -> AlarmStatus {
        // Reopening clears the alarm at once, without debounce
        if ear < self.config.ear_threshold {
            self.state.ear_counter = self.state.ear_counter.saturating_add(1);
        } else {
            self.state.ear_counter = 0;
            if self.state.alarm_active {
                info!("Eyes reopened at {:.2}s, alarm cleared", now);
            }
            self.state.alarm_active = false;
        }

        if mar > self.config.mar_threshold {
            self.state.mar_counter = self.state.mar_counter.saturating_add(1);
        } else {
            self.state.mar_counter = 0;
        }

        let yawning = self.state.mar_counter >= self.config.mar_consec_frames;

        let mut rising_edge = false;
        let mut notification = None;
        if self.state.ear_counter >= self.config.ear_consec_frames && !self.state.alarm_active {
            self.state.alarm_active = true;
            self.state.last_alarm_time = Some(now);
            self.state.total_alarms += 1;
            rising_edge = true;
            info!(
                "Drowsiness alarm raised at {:.2}s after {} closed-eye frames",
                now, self.state.ear_counter
            );
            notification = self.register_drowsiness(now);
        }

        AlarmStatus {
            alarm_active: self.state.alarm_active,
            yawning,
            rising_edge,
            notification,
        }
    }

    /// Record a drowsiness event and notify once the window is saturated
    fn register_drowsiness(&mut self, now: f64) -> Option<String> {
        let count = self.state.drowsy_events.record(now);
        debug!(
            "Drowsiness events in last {}s: {}",
            self.config.alert_window_seconds, count
        );

        if count >= self.config.alert_repeat_count {
            self.state.total_notifications += 1;
            Some(self.notifier.notify(count))
        } else {
            None
        }
    }

    /// Current detector state
    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Reset driver state (on driver change)
    pub fn reset(&mut self) {
        self.state.reset();
    }
}
