//! Repeated-drowsiness notification

use crate::location::LocationProvider;
use tracing::warn;

/// Receives the event count once the drowsiness window is saturated.
/// Implementations must not fail; they return the emitted message.
pub trait Notify {
    fn notify(&self, event_count: usize) -> String;
}

/// Build the alert message text
pub fn format_alert_message(event_count: usize, location: &str) -> String {
    format!(
        "[ALERT] Drowsiness detected multiple times. Count: {}. GPS: {}",
        event_count, location
    )
}

/// Notifier that attaches an approximate location to the alert
pub struct GpsNotifier<L> {
    provider: L,
    endpoint: String,
}

impl<L: LocationProvider> GpsNotifier<L> {
    pub fn new(provider: L, endpoint: impl Into<String>) -> Self {
        Self {
            provider,
            endpoint: endpoint.into(),
        }
    }

    /// Lookup endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl<L: LocationProvider> Notify for GpsNotifier<L> {
    fn notify(&self, event_count: usize) -> String {
        let location = self.provider.lookup(&self.endpoint);
        let message = format_alert_message(event_count, &location);
        warn!(event_count, "{}", message);
        message
    }
}
