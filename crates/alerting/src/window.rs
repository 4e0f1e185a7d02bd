//! Sliding window of drowsiness event timestamps

use std::collections::VecDeque;
use tracing::debug;

/// Time-bounded, front-pruned sequence of event timestamps (seconds).
///
/// Entries are appended in time order and only ever removed from the front,
/// so the sequence stays sorted ascending.
#[derive(Debug, Clone)]
pub struct EventWindow {
    /// Window length in seconds
    window_seconds: f64,
    /// Event timestamps, oldest first
    events: VecDeque<f64>,
}

impl EventWindow {
    /// Create an empty window spanning `window_seconds`
    pub fn new(window_seconds: u64) -> Self {
        Self {
            window_seconds: window_seconds as f64,
            events: VecDeque::new(),
        }
    }

    /// Append an event at `now`, prune stale entries and return the
    /// number of events left in the window.
    pub fn record(&mut self, now: f64) -> usize {
        self.events.push_back(now);
        self.prune(now);
        self.events.len()
    }

    /// Drop entries older than the window relative to `now`
    pub fn prune(&mut self, now: f64) {
        let mut dropped = 0usize;
        while let Some(&front) = self.events.front() {
            if now - front > self.window_seconds {
                self.events.pop_front();
                dropped += 1;
            } else {
                break;
            }
        }
        if dropped > 0 {
            debug!("Pruned {} drowsiness events older than {}s", dropped, self.window_seconds);
        }
    }

    /// Number of events currently held
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Window length in seconds
    pub fn window_seconds(&self) -> f64 {
        self.window_seconds
    }

    /// Iterate timestamps, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.events.iter()
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
