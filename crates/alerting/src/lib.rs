//! Alerting System
//!
//! Aggregates drowsiness events into a time-bounded window and raises the
//! secondary "repeated drowsiness" notification with an approximate location.

mod location;
mod notifier;
mod window;

pub use location::{HttpLocationProvider, IpLocation, LocationProvider, LOCATION_UNAVAILABLE};
pub use notifier::{format_alert_message, GpsNotifier, Notify};
pub use window::EventWindow;

use thiserror::Error;

/// Alerting error types
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}
